use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};

use crate::domain::{BackendKind, DomainError, KeywordFilter, SentenceRange, SentenceRecord};

/// Lazily produced sentence records, in increasing `n` order.
pub type SentenceStream = BoxStream<'static, Result<SentenceRecord, DomainError>>;

/// Storage engine adapter for a corpus.
///
/// Every query method fails with `NotFound` when the collection does not
/// exist and yields an empty result when it exists but nothing matches.
/// Streams always produce records in increasing `n` order.
#[async_trait]
pub trait CorpusBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn list_collections(&self) -> Result<Vec<String>, DomainError>;

    async fn collection_exists(&self, collection: &str) -> Result<bool, DomainError> {
        Ok(self
            .list_collections()
            .await?
            .iter()
            .any(|name| name == collection))
    }

    /// Replaces the collection with `sentences`, numbered from `n = 0`.
    ///
    /// Must be all-or-nothing: on error the previous contents (or the
    /// absence of the collection) are left as they were.
    async fn create_or_replace(
        &self,
        collection: &str,
        sentences: &[String],
    ) -> Result<u64, DomainError>;

    async fn drop_collection(&self, collection: &str) -> Result<(), DomainError>;

    async fn query_by_range(
        &self,
        collection: &str,
        range: SentenceRange,
    ) -> Result<SentenceStream, DomainError>;

    async fn query_by_pattern(
        &self,
        collection: &str,
        keyword: &KeywordFilter,
    ) -> Result<SentenceStream, DomainError>;

    async fn query_all(&self, collection: &str) -> Result<SentenceStream, DomainError>;

    /// Up to `limit` sentences closest in meaning to `text`, most similar
    /// first. Only engines that store embeddings support this.
    async fn query_similar(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SentenceRecord>, DomainError> {
        let _ = (collection, text, limit);
        Err(DomainError::unsupported(format!(
            "the {} backend has no similarity search",
            self.kind()
        )))
    }

    /// Records in the engine's own document shape, in `n` order.
    async fn query_native(&self, collection: &str)
        -> Result<Vec<serde_json::Value>, DomainError>;

    /// Releases the engine connection. Later calls fail with `ConnectionError`.
    async fn close(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Client-side pattern filter for engines without native pattern search.
pub fn filter_by_pattern(stream: SentenceStream, keyword: &KeywordFilter) -> SentenceStream {
    let keyword = keyword.clone();
    stream
        .filter(move |item| {
            let keep = match item {
                Ok(record) => keyword.is_match(record.sent()),
                Err(_) => true,
            };
            futures_util::future::ready(keep)
        })
        .boxed()
}

/// Builds a stream from records that are already materialized.
pub fn stream_records(records: Vec<SentenceRecord>) -> SentenceStream {
    futures_util::stream::iter(records.into_iter().map(Ok)).boxed()
}
