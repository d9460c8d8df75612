use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{StreamExt, TryStreamExt};
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection, Database};
use tracing::debug;
use uuid::Uuid;

use crate::application::{filter_by_pattern, CorpusBackend, SentenceStream};
use crate::domain::{BackendKind, DomainError, KeywordFilter, SentenceRange, SentenceRecord};

pub const DEFAULT_MONGO_URL: &str = "mongodb://localhost:27017";
const STAGING_MARKER: &str = ".staging-";
const NAMESPACE_NOT_FOUND: i32 = 26;

#[derive(Debug, Clone)]
pub struct MongoOptions {
    pub page_size: usize,
    pub timeout: Duration,
}

impl Default for MongoOptions {
    fn default() -> Self {
        Self {
            page_size: 1000,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Corpus storage in a MongoDB server.
///
/// The corpus is a database and each collection a MongoDB collection of
/// `{n, sent}` documents. Reads are cursors sorted by `n`, pulled in
/// batches of `page_size`. Range queries filter on `n` natively; patterns
/// use the client-side fallback so they mean the same as on every other
/// backend. Replace fills a staging collection and moves it into place with
/// one `renameCollection` (`dropTarget: true`).
pub struct MongoCorpusBackend {
    client: Client,
    db: Database,
    page_size: usize,
}

impl MongoCorpusBackend {
    pub async fn connect(
        url: &str,
        corpus: &str,
        options: MongoOptions,
    ) -> Result<Self, DomainError> {
        if corpus.trim().is_empty() {
            return Err(DomainError::invalid_input("corpus name must not be empty"));
        }

        let mut client_options = ClientOptions::parse(url).await.map_err(|e| {
            DomainError::connection(format!("Invalid MongoDB URL {}: {}", url, e))
        })?;
        client_options.app_name = Some("sentbank".to_string());
        client_options.connect_timeout = Some(options.timeout);
        client_options.server_selection_timeout = Some(options.timeout);

        let client = Client::with_options(client_options).map_err(|e| {
            DomainError::connection(format!("Failed to build MongoDB client: {}", e))
        })?;
        let db = client.database(corpus);
        db.run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                DomainError::connection(format!("MongoDB not reachable at {}: {}", url, e))
            })?;

        debug!("Connected to MongoDB at {} (database {})", url, corpus);
        Ok(Self {
            client,
            db,
            page_size: options.page_size.max(1),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }

    async fn ensure_exists(&self, collection: &str) -> Result<(), DomainError> {
        if self.collection_exists(collection).await? {
            Ok(())
        } else {
            Err(DomainError::collection_not_found(collection))
        }
    }

    async fn find_records(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<SentenceStream, DomainError> {
        self.ensure_exists(collection).await?;
        let options = FindOptions::builder()
            .sort(doc! { "n": 1 })
            .projection(doc! { "_id": 0 })
            .batch_size(u32::try_from(self.page_size).unwrap_or(u32::MAX))
            .build();
        let cursor = self
            .collection(collection)
            .find(filter, options)
            .await
            .map_err(|e| map_mongo_error(e, "find sentences"))?;

        Ok(cursor
            .map_err(|e| map_mongo_error(e, "read sentence"))
            .and_then(|document| async move { record_from_document(&document) })
            .boxed())
    }

    async fn rename_into_place(&self, from: &str, to: &str) -> Result<(), DomainError> {
        let db_name = self.db.name();
        self.client
            .database("admin")
            .run_command(
                doc! {
                    "renameCollection": format!("{}.{}", db_name, from),
                    "to": format!("{}.{}", db_name, to),
                    "dropTarget": true,
                },
                None,
            )
            .await
            .map_err(|e| map_mongo_error(e, "rename collection"))?;
        Ok(())
    }

    async fn fill_staging(&self, staging: &str, sentences: &[String]) -> Result<(), DomainError> {
        self.db
            .create_collection(staging, None)
            .await
            .map_err(|e| map_mongo_error(e, "create staging collection"))?;
        if sentences.is_empty() {
            return Ok(());
        }

        let documents: Vec<Document> = sentences
            .iter()
            .enumerate()
            .map(|(n, sent)| doc! { "n": n as i64, "sent": sent.as_str() })
            .collect();
        self.collection(staging)
            .insert_many(documents, None)
            .await
            .map_err(|e| map_mongo_error(e, "insert sentences"))?;
        Ok(())
    }
}

#[async_trait]
impl CorpusBackend for MongoCorpusBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Mongo
    }

    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let mut names: Vec<String> = self
            .db
            .list_collection_names(None)
            .await
            .map_err(|e| map_mongo_error(e, "list collections"))?
            .into_iter()
            .filter(|name| !is_staging_name(name))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, DomainError> {
        let names = self
            .db
            .list_collection_names(doc! { "name": collection })
            .await
            .map_err(|e| map_mongo_error(e, "look up collection"))?;
        Ok(!names.is_empty())
    }

    async fn create_or_replace(
        &self,
        collection: &str,
        sentences: &[String],
    ) -> Result<u64, DomainError> {
        if let Some(i) = sentences.iter().position(|s| s.is_empty()) {
            return Err(DomainError::backend(format!("sentence {} is empty", i)));
        }

        let staging = staging_name(collection);
        let written = match self.fill_staging(&staging, sentences).await {
            Ok(()) => self.rename_into_place(&staging, collection).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(cleanup) = self.collection(&staging).drop(None).await {
                debug!("MongoDB staging collection {} not dropped: {}", staging, cleanup);
            }
            return Err(e);
        }

        debug!(
            "Saved {} sentences to MongoDB collection {}",
            sentences.len(),
            collection
        );
        Ok(sentences.len() as u64)
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), DomainError> {
        self.ensure_exists(collection).await?;
        self.collection(collection)
            .drop(None)
            .await
            .map_err(|e| map_mongo_error(e, "drop collection"))
    }

    async fn query_by_range(
        &self,
        collection: &str,
        range: SentenceRange,
    ) -> Result<SentenceStream, DomainError> {
        self.find_records(collection, range_filter(range)).await
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
        self.find_records(collection, Document::new()).await
    }

    async fn query_native(
        &self,
        collection: &str,
    ) -> Result<Vec<serde_json::Value>, DomainError> {
        self.ensure_exists(collection).await?;
        let options = FindOptions::builder().sort(doc! { "n": 1 }).build();
        let documents: Vec<Document> = self
            .collection(collection)
            .find(None, options)
            .await
            .map_err(|e| map_mongo_error(e, "find documents"))?
            .try_collect()
            .await
            .map_err(|e| map_mongo_error(e, "read document"))?;
        Ok(documents
            .into_iter()
            .map(|document| Bson::Document(document).into_relaxed_extjson())
            .collect())
    }
}

fn staging_name(collection: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}{}", collection, STAGING_MARKER, &suffix[..8])
}

fn is_staging_name(name: &str) -> bool {
    name.rsplit_once(STAGING_MARKER).is_some_and(|(_, suffix)| {
        suffix.len() == 8 && suffix.chars().all(|c| c.is_ascii_hexdigit())
    })
}

/// `n` filter for a range; an end past `i64::MAX` leaves it open.
fn range_filter(range: SentenceRange) -> Document {
    let start = i64::try_from(range.start()).unwrap_or(i64::MAX);
    match i64::try_from(range.end()) {
        Ok(end) => doc! { "n": { "$gte": start, "$lt": end } },
        Err(_) => doc! { "n": { "$gte": start } },
    }
}

fn record_from_document(document: &Document) -> Result<SentenceRecord, DomainError> {
    let n = match document.get("n") {
        Some(Bson::Int64(n)) => u64::try_from(*n).ok(),
        Some(Bson::Int32(n)) => u64::try_from(*n).ok(),
        _ => None,
    }
    .ok_or_else(|| DomainError::backend("MongoDB document has no valid sentence number"))?;
    let sent = document.get_str("sent").map_err(|e| {
        DomainError::backend(format!("MongoDB document {} has no sentence: {}", n, e))
    })?;
    Ok(SentenceRecord::new(n, sent))
}

fn map_mongo_error(e: mongodb::error::Error, what: &str) -> DomainError {
    let msg = format!("Failed to {}: {}", what, e);
    match e.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => DomainError::connection(msg),
        ErrorKind::Command(command) if command.code == NAMESPACE_NOT_FOUND => {
            DomainError::not_found(msg)
        }
        _ => DomainError::backend(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_names_are_hidden() {
        let staging = staging_name("mayon");
        assert!(staging.starts_with("mayon.staging-"));
        assert!(is_staging_name(&staging));
        assert!(!is_staging_name("mayon"));
        assert!(!is_staging_name("release.staging-notes"));
    }

    #[test]
    fn range_filter_is_half_open_and_clamps_open_end() {
        let bounded = range_filter(SentenceRange::new(1, 3).unwrap());
        assert_eq!(bounded, doc! { "n": { "$gte": 1i64, "$lt": 3i64 } });

        let open = range_filter(SentenceRange::new(4, u64::MAX).unwrap());
        assert_eq!(open, doc! { "n": { "$gte": 4i64 } });
    }

    #[test]
    fn documents_map_to_records() {
        let record = record_from_document(&doc! { "n": 2i64, "sent": "Mayon is a volcano." })
            .unwrap();
        assert_eq!(record, SentenceRecord::new(2, "Mayon is a volcano."));

        let small = record_from_document(&doc! { "n": 0i32, "sent": "Sun is hot." }).unwrap();
        assert_eq!(small.n(), 0);
    }

    #[test]
    fn malformed_documents_are_backend_errors() {
        assert!(record_from_document(&doc! { "sent": "No number." })
            .unwrap_err()
            .is_backend_error());
        assert!(record_from_document(&doc! { "n": -1i64, "sent": "Negative." })
            .unwrap_err()
            .is_backend_error());
        assert!(record_from_document(&doc! { "n": 0i64 })
            .unwrap_err()
            .is_backend_error());
    }

    #[test]
    fn native_documents_are_plain_json() {
        let json = Bson::Document(doc! { "n": 0i64, "sent": "Sun is hot." }).into_relaxed_extjson();
        assert_eq!(json, serde_json::json!({"n": 0, "sent": "Sun is hot."}));
    }
}
