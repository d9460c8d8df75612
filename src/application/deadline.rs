use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::StreamExt;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::application::{CollectionLocks, CorpusBackend, SentenceStream};
use crate::domain::{BackendKind, DomainError, KeywordFilter, SentenceRange, SentenceRecord};

pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounds every backend call, and every item pulled from a returned
/// stream, with a timeout. Expiry surfaces as `DomainError::Timeout`.
///
/// Writes run as detached tasks holding the collection's write lock. When a
/// write outlives the timeout the caller gets `Timeout`, but the task keeps
/// going until the backend has committed or rolled back, so a slow replace
/// is never abandoned halfway through.
pub struct DeadlineBackend {
    inner: Arc<dyn CorpusBackend>,
    timeout: Duration,
    locks: Arc<CollectionLocks>,
}

impl DeadlineBackend {
    pub fn new(inner: Arc<dyn CorpusBackend>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            locks: Arc::new(CollectionLocks::new()),
        }
    }

    fn expired(&self, operation: &str) -> DomainError {
        warn!(
            "{} backend: {} exceeded {:?}",
            self.inner.kind(),
            operation,
            self.timeout
        );
        DomainError::timeout(format!(
            "{} did not complete within {:?}",
            operation, self.timeout
        ))
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(self.expired(operation)),
        }
    }

    /// Waits for a detached write. Timing out only stops the wait.
    async fn bounded_write<T>(
        &self,
        operation: &str,
        collection: &str,
        write: JoinHandle<Result<T, DomainError>>,
    ) -> Result<T, DomainError> {
        match tokio::time::timeout(self.timeout, write).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(DomainError::backend(format!(
                "{} task failed: {}",
                operation, join_error
            ))),
            Err(_) => {
                warn!(
                    "{} of '{}' is still running and will finish in the background",
                    operation, collection
                );
                Err(self.expired(operation))
            }
        }
    }

    fn bounded_stream(&self, stream: SentenceStream) -> SentenceStream {
        let timeout = self.timeout;
        futures_util::stream::unfold(Some(stream), move |state| async move {
            let mut stream = state?;
            match tokio::time::timeout(timeout, stream.next()).await {
                Ok(Some(item)) => Some((item, Some(stream))),
                Ok(None) => None,
                Err(_) => Some((
                    Err(DomainError::timeout(format!(
                        "next record did not arrive within {:?}",
                        timeout
                    ))),
                    None,
                )),
            }
        })
        .boxed()
    }
}

#[async_trait]
impl CorpusBackend for DeadlineBackend {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        self.bounded("list_collections", self.inner.list_collections())
            .await
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, DomainError> {
        self.bounded("collection_exists", self.inner.collection_exists(collection))
            .await
    }

    async fn create_or_replace(
        &self,
        collection: &str,
        sentences: &[String],
    ) -> Result<u64, DomainError> {
        let inner = self.inner.clone();
        let locks = self.locks.clone();
        let name = collection.to_string();
        let sentences = sentences.to_vec();
        let write = tokio::spawn(async move {
            let _guard = locks.acquire(&name).await;
            inner.create_or_replace(&name, &sentences).await
        });
        self.bounded_write("create_or_replace", collection, write)
            .await
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), DomainError> {
        let inner = self.inner.clone();
        let locks = self.locks.clone();
        let name = collection.to_string();
        let write = tokio::spawn(async move {
            let _guard = locks.acquire(&name).await;
            inner.drop_collection(&name).await
        });
        self.bounded_write("drop_collection", collection, write)
            .await
    }

    async fn query_by_range(
        &self,
        collection: &str,
        range: SentenceRange,
    ) -> Result<SentenceStream, DomainError> {
        let stream = self
            .bounded("query_by_range", self.inner.query_by_range(collection, range))
            .await?;
        Ok(self.bounded_stream(stream))
    }

    async fn query_by_pattern(
        &self,
        collection: &str,
        keyword: &KeywordFilter,
    ) -> Result<SentenceStream, DomainError> {
        let stream = self
            .bounded(
                "query_by_pattern",
                self.inner.query_by_pattern(collection, keyword),
            )
            .await?;
        Ok(self.bounded_stream(stream))
    }

    async fn query_all(&self, collection: &str) -> Result<SentenceStream, DomainError> {
        let stream = self
            .bounded("query_all", self.inner.query_all(collection))
            .await?;
        Ok(self.bounded_stream(stream))
    }

    async fn query_similar(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SentenceRecord>, DomainError> {
        self.bounded(
            "query_similar",
            self.inner.query_similar(collection, text, limit),
        )
        .await
    }

    async fn query_native(
        &self,
        collection: &str,
    ) -> Result<Vec<serde_json::Value>, DomainError> {
        self.bounded("query_native", self.inner.query_native(collection))
            .await
    }

    async fn close(&self) -> Result<(), DomainError> {
        self.bounded("close", self.inner.close()).await
    }
}
