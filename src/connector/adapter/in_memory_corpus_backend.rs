use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;

use crate::application::{
    filter_by_pattern, stream_records, CorpusBackend, EmbeddingService, SentenceStream,
};
use crate::connector::adapter::{cosine_similarity, HashingEmbedding};
use crate::domain::{BackendKind, DomainError, KeywordFilter, SentenceRange, SentenceRecord};

/// A stored sentence tagged with the collection it belongs to.
#[derive(Debug, Clone)]
struct TaggedSentence {
    collection: String,
    n: u64,
    sent: String,
}

#[derive(Default)]
struct MemoryState {
    /// Names of existing collections, including empty ones.
    collections: BTreeSet<String>,
    /// Flat record list; grouped by collection, `n` ascending within a group.
    records: Vec<TaggedSentence>,
}

/// Process-local corpus storage.
///
/// Has no collection concept of its own: every record carries a
/// `collection` tag and each query filters on it. Pattern queries use the
/// client-side fallback. Similarity queries embed the collection on the fly.
/// Native documents are `{collection, n, sent}`.
pub struct InMemoryCorpusBackend {
    state: Arc<RwLock<MemoryState>>,
    embedder: Arc<dyn EmbeddingService>,
}

impl InMemoryCorpusBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            embedder: Arc::new(HashingEmbedding::new()),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingService>) -> Self {
        self.embedder = embedder;
        self
    }

    async fn snapshot(&self, collection: &str) -> Result<Vec<SentenceRecord>, DomainError> {
        let state = self.state.read().await;
        if !state.collections.contains(collection) {
            return Err(DomainError::collection_not_found(collection));
        }
        Ok(state
            .records
            .iter()
            .filter(|record| record.collection == collection)
            .map(|record| SentenceRecord::new(record.n, record.sent.clone()))
            .collect())
    }
}

impl Default for InMemoryCorpusBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CorpusBackend for InMemoryCorpusBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::InMemory
    }

    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let state = self.state.read().await;
        Ok(state.collections.iter().cloned().collect())
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, DomainError> {
        let state = self.state.read().await;
        Ok(state.collections.contains(collection))
    }

    async fn create_or_replace(
        &self,
        collection: &str,
        sentences: &[String],
    ) -> Result<u64, DomainError> {
        let mut staged = Vec::with_capacity(sentences.len());
        for (i, sent) in sentences.iter().enumerate() {
            if sent.is_empty() {
                return Err(DomainError::backend(format!("sentence {} is empty", i)));
            }
            staged.push(TaggedSentence {
                collection: collection.to_string(),
                n: i as u64,
                sent: sent.clone(),
            });
        }

        let mut state = self.state.write().await;
        state.records.retain(|record| record.collection != collection);
        state.records.extend(staged);
        state.collections.insert(collection.to_string());

        debug!(
            "Stored {} sentences in memory collection '{}'",
            sentences.len(),
            collection
        );
        Ok(sentences.len() as u64)
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if !state.collections.remove(collection) {
            return Err(DomainError::collection_not_found(collection));
        }
        state.records.retain(|record| record.collection != collection);
        Ok(())
    }

    async fn query_by_range(
        &self,
        collection: &str,
        range: SentenceRange,
    ) -> Result<SentenceStream, DomainError> {
        let mut records = self.snapshot(collection).await?;
        records.retain(|record| range.contains(record.n()));
        Ok(stream_records(records))
    }

    async fn query_by_pattern(
        &self,
        collection: &str,
        keyword: &KeywordFilter,
    ) -> Result<SentenceStream, DomainError> {
        let all = self.query_all(collection).await?;
        Ok(filter_by_pattern(all, keyword))
    }

    async fn query_all(&self, collection: &str) -> Result<SentenceStream, DomainError> {
        Ok(stream_records(self.snapshot(collection).await?))
    }

    async fn query_similar(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SentenceRecord>, DomainError> {
        let records = self.snapshot(collection).await?;
        let sents: Vec<String> = records.iter().map(|r| r.sent().to_string()).collect();
        let vectors = self.embedder.embed(&sents).await?;
        let query = self.embedder.embed_query(text).await?;

        let mut scored: Vec<(f32, SentenceRecord)> = vectors
            .iter()
            .map(|vector| cosine_similarity(&query, vector))
            .zip(records)
            .collect();
        scored.sort_by(|(a, ra), (b, rb)| b.total_cmp(a).then(ra.n().cmp(&rb.n())));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, record)| record)
            .collect())
    }

    async fn query_native(
        &self,
        collection: &str,
    ) -> Result<Vec<serde_json::Value>, DomainError> {
        Ok(self
            .snapshot(collection)
            .await?
            .into_iter()
            .map(|record| json!({"collection": collection, "n": record.n(), "sent": record.sent()}))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;

    use super::*;

    fn sents(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn collect(stream: SentenceStream) -> Vec<SentenceRecord> {
        stream.try_collect().await.expect("stream should succeed")
    }

    #[tokio::test]
    async fn collections_are_isolated_by_tag() {
        let backend = InMemoryCorpusBackend::new();
        backend
            .create_or_replace("a", &sents(&["A0.", "A1."]))
            .await
            .unwrap();
        backend
            .create_or_replace("b", &sents(&["B0."]))
            .await
            .unwrap();

        let a = collect(backend.query_all("a").await.unwrap()).await;
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|r| r.sent().starts_with('A')));

        assert_eq!(backend.list_collections().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn replace_swaps_contents() {
        let backend = InMemoryCorpusBackend::new();
        backend
            .create_or_replace("doc", &sents(&["Old one.", "Old two.", "Old three."]))
            .await
            .unwrap();
        backend
            .create_or_replace("doc", &sents(&["New."]))
            .await
            .unwrap();

        let records = collect(backend.query_all("doc").await.unwrap()).await;
        assert_eq!(records, vec![SentenceRecord::new(0, "New.")]);
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_contents() {
        let backend = InMemoryCorpusBackend::new();
        backend
            .create_or_replace("doc", &sents(&["Keep me."]))
            .await
            .unwrap();

        let err = backend
            .create_or_replace("doc", &sents(&["Fine.", "", "Never stored."]))
            .await
            .unwrap_err();
        assert!(err.is_backend_error());

        let records = collect(backend.query_all("doc").await.unwrap()).await;
        assert_eq!(records, vec![SentenceRecord::new(0, "Keep me.")]);
    }

    #[tokio::test]
    async fn empty_collection_exists_and_reads_empty() {
        let backend = InMemoryCorpusBackend::new();
        backend.create_or_replace("empty", &[]).await.unwrap();

        assert!(backend.collection_exists("empty").await.unwrap());
        let range = SentenceRange::new(0, 10).unwrap();
        assert!(collect(backend.query_by_range("empty", range).await.unwrap())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn missing_collection_is_not_found() {
        let backend = InMemoryCorpusBackend::new();
        assert!(backend.query_all("nope").await.err().unwrap().is_not_found());
        assert!(backend.drop_collection("nope").await.unwrap_err().is_not_found());
        assert!(backend.query_native("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn similar_sentences_rank_by_shared_words() {
        let backend = InMemoryCorpusBackend::new();
        backend
            .create_or_replace(
                "mayon",
                &sents(&["Sun is hot.", "It is bright.", "Mayon is a volcano."]),
            )
            .await
            .unwrap();

        let top = backend.query_similar("mayon", "volcano", 2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], SentenceRecord::new(2, "Mayon is a volcano."));

        let all = backend.query_similar("mayon", "volcano", 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(backend
            .query_similar("ghost", "volcano", 1)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn native_documents_carry_collection_tag() {
        let backend = InMemoryCorpusBackend::new();
        backend
            .create_or_replace("doc", &sents(&["Hello."]))
            .await
            .unwrap();
        let native = backend.query_native("doc").await.unwrap();
        assert_eq!(
            native,
            vec![json!({"collection": "doc", "n": 0, "sent": "Hello."})]
        );
    }
}
