use std::sync::Arc;

use futures_util::stream::TryStreamExt;

use crate::application::CorpusBackend;
use crate::domain::{join_blob, DomainError, SentenceRecord};

/// Reconstructs a document by joining its sentences in `n` order.
pub struct ReadBlobUseCase {
    backend: Arc<dyn CorpusBackend>,
}

impl ReadBlobUseCase {
    pub fn new(backend: Arc<dyn CorpusBackend>) -> Self {
        Self { backend }
    }

    pub async fn execute(&self, collection: &str) -> Result<String, DomainError> {
        let records: Vec<SentenceRecord> = self
            .backend
            .query_all(collection)
            .await
            .map_err(|e| e.in_context("read_blob", collection))?
            .try_collect()
            .await
            .map_err(|e| e.in_context("read_blob", collection))?;

        Ok(join_blob(records.iter().map(SentenceRecord::sent)))
    }
}
