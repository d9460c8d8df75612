use anyhow::Result;

use super::super::Container;

pub struct ListCollectionsController<'a> {
    container: &'a Container,
}

impl<'a> ListCollectionsController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn list(&self) -> Result<String> {
        let collections = self.container.client().list().await?;
        Ok(self.format_collection_list(&collections))
    }

    fn format_collection_list(&self, collections: &[String]) -> String {
        if collections.is_empty() {
            return format!("No collections in corpus '{}'.", self.container.corpus());
        }

        let mut output = format!("Collections in corpus '{}':\n\n", self.container.corpus());
        for name in collections {
            output.push_str(&format!("  {}\n", name));
        }
        output.truncate(output.trim_end().len());
        output
    }
}
