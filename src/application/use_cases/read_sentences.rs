use std::sync::Arc;

use futures_util::stream::StreamExt;
use tracing::debug;

use crate::application::{filter_by_pattern, CorpusBackend, SentenceStream};
use crate::domain::{DomainError, SentenceQuery};

/// Reads a collection through an optional range and/or keyword filter.
pub struct ReadSentencesUseCase {
    backend: Arc<dyn CorpusBackend>,
}

impl ReadSentencesUseCase {
    pub fn new(backend: Arc<dyn CorpusBackend>) -> Self {
        Self { backend }
    }

    /// Dispatches to the narrowest backend query for `query`.
    ///
    /// With both filters set, the range query runs on the backend and the
    /// keyword is applied to that subset on the client.
    pub async fn execute(
        &self,
        collection: &str,
        query: &SentenceQuery,
    ) -> Result<SentenceStream, DomainError> {
        let stream = match (query.range(), query.keyword()) {
            (None, None) => self.backend.query_all(collection).await,
            (Some(range), None) => {
                debug!("Range {} on '{}'", range, collection);
                self.backend.query_by_range(collection, range).await
            }
            (None, Some(keyword)) => {
                debug!("Pattern '{}' on '{}'", keyword.pattern(), collection);
                self.backend.query_by_pattern(collection, keyword).await
            }
            (Some(range), Some(keyword)) => {
                debug!(
                    "Range {} then pattern '{}' on '{}'",
                    range,
                    keyword.pattern(),
                    collection
                );
                self.backend
                    .query_by_range(collection, range)
                    .await
                    .map(|stream| filter_by_pattern(stream, keyword))
            }
        }
        .map_err(|e| e.in_context("read_sents", collection))?;

        let collection = collection.to_string();
        Ok(stream
            .map(move |item| item.map_err(|e| e.in_context("read_sents", &collection)))
            .boxed())
    }
}
