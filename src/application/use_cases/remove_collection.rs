use std::sync::Arc;

use tracing::info;

use crate::application::CorpusBackend;
use crate::domain::DomainError;

/// Use case for deleting a collection and all of its sentences.
pub struct RemoveCollectionUseCase {
    backend: Arc<dyn CorpusBackend>,
}

impl RemoveCollectionUseCase {
    pub fn new(backend: Arc<dyn CorpusBackend>) -> Self {
        Self { backend }
    }

    pub async fn execute(&self, collection: &str) -> Result<(), DomainError> {
        self.backend
            .drop_collection(collection)
            .await
            .map_err(|e| e.in_context("remove", collection))?;

        info!("Removed collection '{}'", collection);
        Ok(())
    }
}
