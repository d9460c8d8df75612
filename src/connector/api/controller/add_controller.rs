use std::path::Path;

use anyhow::Result;

use crate::{DomainError, IngestSummary};

use super::super::Container;

pub struct AddController<'a> {
    container: &'a Container,
}

impl<'a> AddController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn add(
        &self,
        paths: Vec<String>,
        name: Option<String>,
        extensions: Vec<String>,
    ) -> Result<String> {
        if name.is_some() && paths.len() != 1 {
            return Err(DomainError::invalid_input("--name needs exactly one file").into());
        }

        let client = self.container.client();
        let mut summaries = Vec::new();
        for path in &paths {
            let path = Path::new(path);
            if path.is_dir() {
                if name.is_some() {
                    return Err(DomainError::invalid_input(
                        "--name cannot be used with a directory",
                    )
                    .into());
                }
                summaries.extend(client.add_dir(path, &extensions).await?);
            } else if let Some(name) = name.as_deref() {
                summaries.push(client.add_as(path, name).await?);
            } else {
                summaries.push(client.add(path).await?);
            }
        }

        Ok(self.format_add_success(&summaries))
    }

    fn format_add_success(&self, summaries: &[IngestSummary]) -> String {
        if summaries.is_empty() {
            return "No documents found.".to_string();
        }

        let mut output = String::new();
        for summary in summaries {
            output.push_str(&format!(
                "Added collection: {} ({} sentences)\n",
                summary.collection(),
                summary.sentence_count()
            ));
        }
        output.truncate(output.trim_end().len());
        output
    }
}
