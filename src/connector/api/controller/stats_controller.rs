use anyhow::Result;
use futures_util::TryStreamExt;

use crate::SentenceQuery;

use super::super::Container;

pub struct StatsController<'a> {
    container: &'a Container,
}

impl<'a> StatsController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn stats(&self) -> Result<String> {
        let client = self.container.client();
        let mut counts = Vec::new();
        for name in client.list().await? {
            let count = client
                .read_sents(&name, &SentenceQuery::new())
                .await?
                .try_fold(0u64, |count, _| async move { Ok(count + 1) })
                .await?;
            counts.push((name, count));
        }
        Ok(self.format_stats(&counts))
    }

    fn format_stats(&self, counts: &[(String, u64)]) -> String {
        let total_sentences: u64 = counts.iter().map(|(_, count)| count).sum();
        let mut output = format!(
            "Sentbank Statistics\n===================\nBackend:         {}\nConnection:      {}\nCorpus:          {}\nCollections:     {}\nTotal Sentences: {}",
            self.container.backend_kind(),
            self.container.connection(),
            self.container.corpus(),
            counts.len(),
            total_sentences
        );
        if !counts.is_empty() {
            output.push('\n');
            for (name, count) in counts {
                output.push_str(&format!("\n  {}: {} sentences", name, count));
            }
        }
        output
    }
}
