use anyhow::Result;
use futures_util::TryStreamExt;

use crate::{KeywordFilter, SentenceQuery, SentenceRange, SentenceRecord};

use super::super::Container;

pub struct ReadController<'a> {
    container: &'a Container,
}

impl<'a> ReadController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn read(
        &self,
        name: String,
        from: Option<u64>,
        to: Option<u64>,
        grep: Option<String>,
        json: bool,
    ) -> Result<String> {
        let mut query = SentenceQuery::new();
        if from.is_some() || to.is_some() {
            query = query.with_range(SentenceRange::new(
                from.unwrap_or(0),
                to.unwrap_or(u64::MAX),
            )?);
        }
        if let Some(pattern) = grep.as_deref() {
            query = query.with_keyword(KeywordFilter::new(pattern)?);
        }

        let records: Vec<SentenceRecord> = self
            .container
            .client()
            .read_sents(&name, &query)
            .await?
            .try_collect()
            .await?;

        format_records(&records, json)
    }

    pub async fn similar(
        &self,
        name: String,
        text: String,
        top: usize,
        json: bool,
    ) -> Result<String> {
        let records = self
            .container
            .client()
            .read_similar(&name, &text, top)
            .await?;
        format_records(&records, json)
    }

    pub async fn blob(&self, name: String) -> Result<String> {
        Ok(self.container.client().read_blob(&name).await?)
    }

    /// One backend document per line, as compact JSON.
    pub async fn raw(&self, name: String) -> Result<String> {
        let documents = self.container.client().read_native(&name).await?;
        let lines = documents
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines.join("\n"))
    }
}

fn format_records(records: &[SentenceRecord], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(records)?);
    }
    Ok(records
        .iter()
        .map(|record| format!("{}\t{}", record.n(), record.sent()))
        .collect::<Vec<_>>()
        .join("\n"))
}
