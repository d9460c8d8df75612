use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chromadb::client::{ChromaAuthMethod, ChromaClient, ChromaClientOptions};
use chromadb::collection::{CollectionEntries, GetOptions, QueryOptions};
use chromadb::ChromaCollection;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::{
    filter_by_pattern, stream_records, CorpusBackend, EmbeddingService, SentenceStream,
};
use crate::connector::adapter::HashingEmbedding;
use crate::domain::{BackendKind, DomainError, KeywordFilter, SentenceRange, SentenceRecord};

pub const DEFAULT_CHROMA_URL: &str = "http://localhost:8000";
pub const DEFAULT_CHROMA_DATABASE: &str = "default_database";
const ADD_BATCH_SIZE: usize = 1000;
const STAGING_MARKER: &str = ".staging-";
const RETIRED_MARKER: &str = ".retired-";

#[derive(Clone)]
pub struct ChromaOptions {
    pub database: String,
    pub page_size: usize,
    pub embedder: Arc<dyn EmbeddingService>,
}

impl Default for ChromaOptions {
    fn default() -> Self {
        Self {
            database: DEFAULT_CHROMA_DATABASE.to_string(),
            page_size: 1000,
            embedder: Arc::new(HashingEmbedding::new()),
        }
    }
}

/// One record as Chroma stores it.
#[derive(Debug, Clone, PartialEq)]
struct ChromaDocument {
    id: String,
    document: String,
    metadata: Map<String, Value>,
}

/// Cleanup step for a staging or retired collection left behind by a
/// replace that never finished.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SweepAction {
    Delete(String),
    Restore { from: String, to: String },
}

/// Corpus storage in a Chroma server.
///
/// Collections of corpus `c` are Chroma collections named `c.<collection>`
/// in the configured database. A record is a Chroma document with id `n`,
/// metadata `{"n": n}` and an embedding of the sentence, so similarity
/// queries run natively. Range queries use a metadata `where` clause;
/// pattern queries use the client-side fallback since Chroma has no regex
/// document filter.
///
/// Replacing a collection writes a hidden staging collection, renames the
/// live one to a hidden retired name, then renames staging into place.
/// Between the two renames, reads resolve to the retired collection, so
/// readers see the old contents until the new ones are in place. Leftovers
/// from an interrupted replace are restored or deleted on connect.
pub struct ChromaCorpusBackend {
    client: ChromaClient,
    prefix: String,
    page_size: usize,
    embedder: Arc<dyn EmbeddingService>,
}

impl ChromaCorpusBackend {
    pub async fn connect(
        url: &str,
        corpus: &str,
        options: ChromaOptions,
    ) -> Result<Self, DomainError> {
        if corpus.trim().is_empty() {
            return Err(DomainError::invalid_input("corpus name must not be empty"));
        }

        let client = ChromaClient::new(ChromaClientOptions {
            url: Some(url.to_string()),
            database: options.database.clone(),
            auth: ChromaAuthMethod::None,
        })
        .await
        .map_err(|e| DomainError::connection(format!("Failed to connect to Chroma: {}", e)))?;

        client.heartbeat().await.map_err(|e| {
            DomainError::connection(format!("Chroma not reachable at {}: {}", url, e))
        })?;

        debug!("Connected to Chroma at {} (database {})", url, options.database);

        let backend = Self {
            client,
            prefix: format!("{}.", corpus),
            page_size: options.page_size.max(1),
            embedder: options.embedder,
        };
        backend.sweep_orphans().await?;
        Ok(backend)
    }

    fn full_name(&self, collection: &str) -> String {
        format!("{}{}", self.prefix, collection)
    }

    async fn corpus_collections(&self) -> Result<Vec<ChromaCollection>, DomainError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| map_chroma_error(e, "list collections"))?;
        Ok(collections
            .into_iter()
            .filter(|c| c.name().starts_with(&self.prefix))
            .collect())
    }

    /// The live collection, or its retired copy while a replace is swapping.
    async fn resolve(&self, collection: &str) -> Result<Option<ChromaCollection>, DomainError> {
        let full = self.full_name(collection);
        let mut retired = None;
        for candidate in self.corpus_collections().await? {
            if candidate.name() == full {
                return Ok(Some(candidate));
            }
            let is_retired_copy =
                internal_base(candidate.name(), RETIRED_MARKER) == Some(full.as_str());
            if retired.is_none() && is_retired_copy {
                retired = Some(candidate);
            }
        }
        Ok(retired)
    }

    async fn require(&self, collection: &str) -> Result<ChromaCollection, DomainError> {
        self.resolve(collection)
            .await?
            .ok_or_else(|| DomainError::collection_not_found(collection))
    }

    async fn sweep_orphans(&self) -> Result<(), DomainError> {
        let names: Vec<String> = self
            .corpus_collections()
            .await?
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        for action in plan_sweep(&names) {
            match &action {
                SweepAction::Delete(name) => {
                    info!("Deleting leftover Chroma collection {}", name);
                    self.client
                        .delete_collection(name)
                        .await
                        .map_err(|e| map_chroma_error(e, "delete leftover collection"))?;
                }
                SweepAction::Restore { from, to } => {
                    info!("Restoring Chroma collection {} from {}", to, from);
                    self.rename(from, to).await?;
                }
            }
        }
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), DomainError> {
        let collection = self
            .client
            .get_collection(from)
            .await
            .map_err(|e| map_chroma_error(e, "get collection"))?;
        collection
            .modify(Some(to), None)
            .await
            .map_err(|e| map_chroma_error(e, "rename collection"))
    }

    async fn add_sentences(
        &self,
        staging: &ChromaCollection,
        sentences: &[String],
    ) -> Result<(), DomainError> {
        for (batch_index, batch) in sentences.chunks(ADD_BATCH_SIZE).enumerate() {
            let first = batch_index * ADD_BATCH_SIZE;
            let ids: Vec<String> = (first..first + batch.len()).map(|n| n.to_string()).collect();
            let metadatas: Vec<Map<String, Value>> =
                (first..first + batch.len()).map(create_metadata).collect();
            let embeddings = self.embedder.embed(batch).await?;

            let entries = CollectionEntries {
                ids: ids.iter().map(String::as_str).collect(),
                embeddings: Some(embeddings),
                metadatas: Some(metadatas),
                documents: Some(batch.iter().map(String::as_str).collect()),
            };
            staging
                .add(entries, None)
                .await
                .map_err(|e| map_chroma_error(e, "add sentences"))?;
        }
        Ok(())
    }

    /// Fetches every document matching `where_metadata`, sorted by `n`.
    async fn fetch_documents(
        &self,
        collection: &ChromaCollection,
        where_metadata: Option<Value>,
    ) -> Result<Vec<ChromaDocument>, DomainError> {
        let mut documents = Vec::new();
        let mut offset = 0;
        loop {
            let page = collection
                .get(GetOptions {
                    ids: vec![],
                    where_metadata: where_metadata.clone(),
                    limit: Some(self.page_size),
                    offset: Some(offset),
                    where_document: None,
                    include: Some(vec!["documents".into(), "metadatas".into()]),
                })
                .await
                .map_err(|e| map_chroma_error(e, "get documents"))?;

            let fetched = page.ids.len();
            documents.extend(documents_from_page(page.ids, page.documents, page.metadatas)?);
            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }

        documents.sort_by_key(|doc| n_of(doc).unwrap_or(u64::MAX));
        Ok(documents)
    }

    async fn fetch_records(
        &self,
        collection: &str,
        where_metadata: Option<Value>,
    ) -> Result<Vec<SentenceRecord>, DomainError> {
        let resolved = self.require(collection).await?;
        let documents = match self.fetch_documents(&resolved, where_metadata.clone()).await {
            Ok(documents) => documents,
            // A retired copy can vanish once its replacement is in place.
            Err(_) if resolved.name() != self.full_name(collection) => {
                let live = self.require(collection).await?;
                self.fetch_documents(&live, where_metadata).await?
            }
            Err(e) => return Err(e),
        };
        documents.into_iter().map(record_from_document).collect()
    }

    /// Swaps `staging` in under `collection`, keeping the old collection
    /// recoverable until the swap has succeeded.
    async fn swap_in(&self, collection: &str, staging: &str) -> Result<(), DomainError> {
        let full = self.full_name(collection);
        let live_exists = self
            .corpus_collections()
            .await?
            .iter()
            .any(|c| c.name() == full);

        let retired = if live_exists {
            let retired_name = internal_name(&full, RETIRED_MARKER);
            self.rename(&full, &retired_name).await?;
            Some(retired_name)
        } else {
            None
        };

        if let Err(e) = self.rename(staging, &full).await {
            if let Some(retired_name) = &retired {
                if let Err(restore) = self.rename(retired_name, &full).await {
                    warn!(
                        "Could not restore Chroma collection {} after failed swap: {}",
                        full, restore
                    );
                }
            }
            return Err(e);
        }

        if let Some(retired_name) = retired {
            if let Err(e) = self.client.delete_collection(&retired_name).await {
                warn!(
                    "Replaced Chroma collection {} but could not delete {}: {}",
                    full, retired_name, e
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CorpusBackend for ChromaCorpusBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Chroma
    }

    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let names: Vec<String> = self
            .corpus_collections()
            .await?
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        Ok(visible_collections(&names, &self.prefix))
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, DomainError> {
        Ok(self.resolve(collection).await?.is_some())
    }

    async fn create_or_replace(
        &self,
        collection: &str,
        sentences: &[String],
    ) -> Result<u64, DomainError> {
        if let Some(i) = sentences.iter().position(|s| s.is_empty()) {
            return Err(DomainError::backend(format!("sentence {} is empty", i)));
        }

        let staging_name = internal_name(&self.full_name(collection), STAGING_MARKER);
        let mut metadata = Map::new();
        metadata.insert("hnsw:space".to_string(), Value::String("cosine".to_string()));
        metadata.insert(
            "model".to_string(),
            Value::String(self.embedder.model().to_string()),
        );
        let staging = self
            .client
            .create_collection(&staging_name, Some(metadata), false)
            .await
            .map_err(|e| map_chroma_error(e, "create staging collection"))?;
        debug!("Writing {} sentences to {}", sentences.len(), staging_name);

        let written = match self.add_sentences(&staging, sentences).await {
            Ok(()) => self.swap_in(collection, &staging_name).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            // Fails harmlessly when staging was already renamed into place.
            if let Err(cleanup) = self.client.delete_collection(&staging_name).await {
                debug!(
                    "Chroma staging collection {} not deleted: {}",
                    staging_name, cleanup
                );
            }
            return Err(e);
        }

        debug!(
            "Saved {} sentences to Chroma collection {}",
            sentences.len(),
            collection
        );
        Ok(sentences.len() as u64)
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), DomainError> {
        let resolved = self.require(collection).await?;
        self.client
            .delete_collection(resolved.name())
            .await
            .map_err(|e| map_chroma_error(e, "delete collection"))
    }

    async fn query_by_range(
        &self,
        collection: &str,
        range: SentenceRange,
    ) -> Result<SentenceStream, DomainError> {
        if range.is_empty() {
            self.require(collection).await?;
            return Ok(stream_records(Vec::new()));
        }
        let records = self
            .fetch_records(collection, Some(range_where(range)))
            .await?;
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
        let records = self.fetch_records(collection, None).await?;
        Ok(stream_records(records))
    }

    async fn query_similar(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SentenceRecord>, DomainError> {
        let resolved = self.require(collection).await?;
        let query_embedding = self.embedder.embed_query(text).await?;

        let result = resolved
            .query(
                QueryOptions {
                    query_texts: None,
                    query_embeddings: Some(vec![query_embedding]),
                    where_metadata: None,
                    where_document: None,
                    n_results: Some(limit),
                    include: Some(vec!["documents", "metadatas", "distances"]),
                },
                None,
            )
            .await
            .map_err(|e| map_chroma_error(e, "query similar sentences"))?;

        let ids = result.ids.into_iter().next().unwrap_or_default();
        let documents = result
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let metadatas = result
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default();

        ids.into_iter()
            .zip(documents)
            .zip(metadatas)
            .map(|((id, document), metadata)| {
                record_from_document(ChromaDocument {
                    id,
                    document,
                    metadata: metadata.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn query_native(
        &self,
        collection: &str,
    ) -> Result<Vec<serde_json::Value>, DomainError> {
        let resolved = self.require(collection).await?;
        Ok(self
            .fetch_documents(&resolved, None)
            .await?
            .into_iter()
            .map(|doc| json!({ "id": doc.id, "document": doc.document, "metadata": doc.metadata }))
            .collect())
    }
}

fn create_metadata(n: usize) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("n".to_string(), Value::Number((n as u64).into()));
    map
}

/// Metadata filter for a non-empty range. Chroma compares integers as
/// int64, so an end past `i64::MAX` leaves the range open instead.
fn range_where(range: SentenceRange) -> Value {
    let start = i64::try_from(range.start()).unwrap_or(i64::MAX);
    match i64::try_from(range.end()) {
        Ok(end) => json!({
            "$and": [
                { "n": { "$gte": start } },
                { "n": { "$lt": end } }
            ]
        }),
        Err(_) => json!({ "n": { "$gte": start } }),
    }
}

fn internal_name(full_name: &str, marker: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}{}", full_name, marker, &suffix[..8])
}

/// The live name an internal `marker` collection belongs to.
fn internal_base<'a>(name: &'a str, marker: &str) -> Option<&'a str> {
    name.rsplit_once(marker).and_then(|(base, suffix)| {
        let generated = suffix.len() == 8 && suffix.chars().all(|c| c.is_ascii_hexdigit());
        generated.then_some(base)
    })
}

fn is_internal_name(name: &str) -> bool {
    internal_base(name, STAGING_MARKER).is_some() || internal_base(name, RETIRED_MARKER).is_some()
}

/// Collection names a reader should see, given the raw Chroma names of one
/// corpus. A retired copy stands in for its live name mid-swap.
fn visible_collections(names: &[String], prefix: &str) -> Vec<String> {
    let live: BTreeSet<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| !is_internal_name(name))
        .collect();
    let mut visible: BTreeSet<&str> = live.clone();
    for name in names {
        if let Some(base) = internal_base(name, RETIRED_MARKER) {
            if !live.contains(base) {
                visible.insert(base);
            }
        }
    }
    visible
        .into_iter()
        .filter_map(|name| name.strip_prefix(prefix))
        .map(str::to_string)
        .collect()
}

fn plan_sweep(names: &[String]) -> Vec<SweepAction> {
    let mut live: BTreeSet<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| !is_internal_name(name))
        .collect();

    let mut sorted: Vec<&String> = names.iter().collect();
    sorted.sort();

    let mut actions = Vec::new();
    for name in sorted {
        if internal_base(name, STAGING_MARKER).is_some() {
            actions.push(SweepAction::Delete(name.clone()));
        } else if let Some(base) = internal_base(name, RETIRED_MARKER) {
            if live.insert(base) {
                actions.push(SweepAction::Restore {
                    from: name.clone(),
                    to: base.to_string(),
                });
            } else {
                actions.push(SweepAction::Delete(name.clone()));
            }
        }
    }
    actions
}

fn documents_from_page(
    ids: Vec<String>,
    documents: Option<Vec<Option<String>>>,
    metadatas: Option<Vec<Option<Map<String, Value>>>>,
) -> Result<Vec<ChromaDocument>, DomainError> {
    let count = ids.len();
    let documents = documents.unwrap_or_else(|| vec![None; count]);
    let metadatas = metadatas.unwrap_or_else(|| vec![None; count]);
    if documents.len() != count || metadatas.len() != count {
        return Err(DomainError::backend(
            "Chroma returned mismatched ids, documents and metadatas",
        ));
    }

    ids.into_iter()
        .zip(documents)
        .zip(metadatas)
        .map(|((id, document), metadata)| {
            let document = document.ok_or_else(|| {
                DomainError::backend(format!("Chroma record {} has no document", id))
            })?;
            Ok(ChromaDocument {
                id,
                document,
                metadata: metadata.unwrap_or_default(),
            })
        })
        .collect()
}

fn n_of(doc: &ChromaDocument) -> Option<u64> {
    doc.metadata
        .get("n")
        .and_then(Value::as_u64)
        .or_else(|| doc.id.parse().ok())
}

fn record_from_document(doc: ChromaDocument) -> Result<SentenceRecord, DomainError> {
    let n = n_of(&doc).ok_or_else(|| {
        DomainError::backend(format!("Chroma record {} has no sentence number", doc.id))
    })?;
    Ok(SentenceRecord::new(n, doc.document))
}

fn map_chroma_error(e: impl Into<anyhow::Error>, what: &str) -> DomainError {
    let e: anyhow::Error = e.into();
    let msg = format!("Failed to {}: {}", what, e);
    match e.downcast_ref::<reqwest::Error>() {
        Some(http) if http.is_timeout() => DomainError::timeout(msg),
        Some(http) if http.is_connect() => DomainError::connection(msg),
        _ => DomainError::backend(msg),
    }
}
