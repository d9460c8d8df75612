use std::sync::Arc;

use crate::application::CorpusBackend;
use crate::domain::DomainError;

pub struct ListCollectionsUseCase {
    backend: Arc<dyn CorpusBackend>,
}

impl ListCollectionsUseCase {
    pub fn new(backend: Arc<dyn CorpusBackend>) -> Self {
        Self { backend }
    }

    /// Collection names in the corpus, sorted.
    pub async fn execute(&self) -> Result<Vec<String>, DomainError> {
        let mut names = self
            .backend
            .list_collections()
            .await
            .map_err(|e| e.in_context("list", "*"))?;
        names.sort();
        names.dedup();
        Ok(names)
    }
}
