use std::sync::Arc;

use crate::application::CorpusBackend;
use crate::domain::DomainError;

/// Returns a collection's records in the backend's own document shape.
pub struct ReadNativeUseCase {
    backend: Arc<dyn CorpusBackend>,
}

impl ReadNativeUseCase {
    pub fn new(backend: Arc<dyn CorpusBackend>) -> Self {
        Self { backend }
    }

    pub async fn execute(&self, collection: &str) -> Result<Vec<serde_json::Value>, DomainError> {
        self.backend
            .query_native(collection)
            .await
            .map_err(|e| e.in_context("read_native", collection))
    }
}
