use std::sync::Arc;

use tracing::debug;

use crate::application::CorpusBackend;
use crate::domain::{DomainError, SentenceRecord};

/// Finds the sentences of a collection closest in meaning to a text.
pub struct ReadSimilarUseCase {
    backend: Arc<dyn CorpusBackend>,
}

impl ReadSimilarUseCase {
    pub fn new(backend: Arc<dyn CorpusBackend>) -> Self {
        Self { backend }
    }

    pub async fn execute(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SentenceRecord>, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::invalid_input("similarity text must not be empty")
                .in_context("read_similar", collection));
        }
        if limit == 0 {
            return Err(DomainError::invalid_input("result limit must be at least 1")
                .in_context("read_similar", collection));
        }

        debug!("Top {} sentences like '{}' in '{}'", limit, text, collection);
        self.backend
            .query_similar(collection, text, limit)
            .await
            .map_err(|e| e.in_context("read_similar", collection))
    }
}
