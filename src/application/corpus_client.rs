use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::application::{
    AddDocumentUseCase, CorpusBackend, DeadlineBackend, ListCollectionsUseCase, ReadBlobUseCase,
    ReadNativeUseCase, ReadSentencesUseCase, ReadSimilarUseCase, RemoveCollectionUseCase,
    SentenceSplitter, SentenceStream,
};
use crate::domain::{BackendKind, DomainError, IngestSummary, SentenceQuery, SentenceRecord};

/// Uniform read/write interface to a corpus, whatever engine stores it.
///
/// Every backend call is bounded by the client's timeout. A write that times
/// out keeps running until the backend commits or rolls it back. Writes to
/// the same collection name are serialized within one client; two clients
/// (or two processes) adding or removing the same name concurrently are not
/// coordinated here, and the last replace wins.
///
/// Reads only observe committed state and may run concurrently with each
/// other and with writes to other collections.
pub struct CorpusClient {
    backend: Arc<dyn CorpusBackend>,
    splitter: Arc<dyn SentenceSplitter>,
}

impl CorpusClient {
    pub fn new(
        backend: Arc<dyn CorpusBackend>,
        splitter: Arc<dyn SentenceSplitter>,
        timeout: Duration,
    ) -> Self {
        debug!(
            "Corpus client on {} backend, timeout {:?}",
            backend.kind(),
            timeout
        );
        Self {
            backend: Arc::new(DeadlineBackend::new(backend, timeout)),
            splitter,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    fn add_use_case(&self) -> AddDocumentUseCase {
        AddDocumentUseCase::new(self.backend.clone(), self.splitter.clone())
    }

    /// Adds a file as the collection named after its file stem, replacing
    /// any existing collection of that name.
    pub async fn add(&self, path: impl AsRef<Path>) -> Result<IngestSummary, DomainError> {
        self.add_use_case().execute(path.as_ref()).await
    }

    pub async fn add_as(
        &self,
        path: impl AsRef<Path>,
        collection: &str,
    ) -> Result<IngestSummary, DomainError> {
        self.add_use_case()
            .execute_as(path.as_ref(), collection)
            .await
    }

    pub async fn add_text(
        &self,
        collection: &str,
        text: &str,
    ) -> Result<IngestSummary, DomainError> {
        self.add_use_case().execute_text(collection, text).await
    }

    pub async fn add_dir(
        &self,
        dir: impl AsRef<Path>,
        extensions: &[String],
    ) -> Result<Vec<IngestSummary>, DomainError> {
        self.add_use_case()
            .execute_dir(dir.as_ref(), extensions)
            .await
    }

    pub async fn list(&self) -> Result<Vec<String>, DomainError> {
        ListCollectionsUseCase::new(self.backend.clone())
            .execute()
            .await
    }

    pub async fn remove(&self, collection: &str) -> Result<(), DomainError> {
        RemoveCollectionUseCase::new(self.backend.clone())
            .execute(collection)
            .await
    }

    pub async fn read_sents(
        &self,
        collection: &str,
        query: &SentenceQuery,
    ) -> Result<SentenceStream, DomainError> {
        ReadSentencesUseCase::new(self.backend.clone())
            .execute(collection, query)
            .await
    }

    /// Up to `limit` sentences closest in meaning to `text`, most similar first.
    pub async fn read_similar(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SentenceRecord>, DomainError> {
        ReadSimilarUseCase::new(self.backend.clone())
            .execute(collection, text, limit)
            .await
    }

    pub async fn read_blob(&self, collection: &str) -> Result<String, DomainError> {
        ReadBlobUseCase::new(self.backend.clone())
            .execute(collection)
            .await
    }

    pub async fn read_native(
        &self,
        collection: &str,
    ) -> Result<Vec<serde_json::Value>, DomainError> {
        ReadNativeUseCase::new(self.backend.clone())
            .execute(collection)
            .await
    }

    /// Releases the backend connection.
    pub async fn close(self) -> Result<(), DomainError> {
        debug!("Closing {} backend", self.backend.kind());
        self.backend.close().await
    }
}
