use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use duckdb::{params, AccessMode, Config, Connection};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::{filter_by_pattern, CorpusBackend, SentenceStream};
use crate::domain::{BackendKind, DomainError, KeywordFilter, SentenceRange, SentenceRecord};

pub const DEFAULT_PAGE_SIZE: usize = 256;

/// Which rows a paged read selects, on top of the `n` cursor.
#[derive(Debug, Clone)]
enum PageFilter {
    All,
    Range(SentenceRange),
}

/// Corpus storage in a DuckDB database file.
///
/// The corpus is a schema and each collection is a table
/// `(n BIGINT PRIMARY KEY, sent TEXT NOT NULL)` inside it. Range queries run
/// natively and every read is pulled lazily in pages ordered by `n`.
/// Patterns are matched on the client with the `regex` crate; DuckDB's RE2
/// treats `\w` and `\b` as ASCII-only.
/// DuckDB identifiers are case-insensitive, so collection names differing
/// only in case refer to the same table.
pub struct DuckDbCorpusBackend {
    conn: Arc<Mutex<Option<Connection>>>,
    schema: String,
    page_size: usize,
}

impl DuckDbCorpusBackend {
    pub fn open(path: &Path, corpus: &str) -> Result<Self, DomainError> {
        let conn = Connection::open(path).map_err(|e| {
            DomainError::connection(format!(
                "Failed to open DuckDB database {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::initialize(&conn, corpus)?;
        Ok(Self::from_connection(conn, corpus))
    }

    /// Opens without taking DuckDB's write lock; writes will fail.
    pub fn open_read_only(path: &Path, corpus: &str) -> Result<Self, DomainError> {
        let config = Config::default()
            .access_mode(AccessMode::ReadOnly)
            .map_err(|e| DomainError::connection(format!("Invalid DuckDB config: {}", e)))?;
        let conn = Connection::open_with_flags(path, config).map_err(|e| {
            DomainError::connection(format!(
                "Failed to open DuckDB database {} read-only: {}",
                path.display(),
                e
            ))
        })?;
        validate_corpus_name(corpus)?;
        Ok(Self::from_connection(conn, corpus))
    }

    pub fn in_memory(corpus: &str) -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DomainError::connection(format!("Failed to open DuckDB in-memory DB: {}", e))
        })?;
        Self::initialize(&conn, corpus)?;
        Ok(Self::from_connection(conn, corpus))
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn from_connection(conn: Connection, corpus: &str) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            schema: corpus.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    fn initialize(conn: &Connection, corpus: &str) -> Result<(), DomainError> {
        validate_corpus_name(corpus)?;
        conn.execute_batch(&format!(
            "CREATE SCHEMA IF NOT EXISTS {};",
            quote_ident(corpus)
        ))
        .map_err(|e| {
            DomainError::connection(format!(
                "Failed to create DuckDB schema {}: {}",
                corpus, e
            ))
        })?;
        debug!("DuckDB corpus schema {} ready", corpus);
        Ok(())
    }

    fn table(&self, collection: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(collection))
    }

    fn paged_stream(&self, collection: &str, filter: PageFilter) -> SentenceStream {
        let conn = Arc::clone(&self.conn);
        let table = self.table(collection);
        let page_size = self.page_size;

        stream::try_unfold(Some(-1i64), move |cursor| {
            next_page(
                Arc::clone(&conn),
                table.clone(),
                filter.clone(),
                cursor,
                page_size,
            )
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, DomainError>)))
        .try_flatten()
        .boxed()
    }

    async fn ensure_exists(&self, collection: &str) -> Result<(), DomainError> {
        if self.collection_exists(collection).await? {
            Ok(())
        } else {
            Err(DomainError::collection_not_found(collection))
        }
    }
}

#[async_trait]
impl CorpusBackend for DuckDbCorpusBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DuckDb
    }

    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(closed_error)?;
        let mut stmt = conn
            .prepare(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = ? AND table_type = 'BASE TABLE' \
                 ORDER BY table_name",
            )
            .map_err(|e| DomainError::backend(format!("Failed to prepare list: {}", e)))?;
        let names = stmt
            .query_map(params![self.schema], |row| row.get::<_, String>(0))
            .map_err(|e| DomainError::backend(format!("Failed to list tables: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DomainError::backend(format!("Failed to read table name: {}", e)))?;
        Ok(names)
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, DomainError> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(closed_error)?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = ? AND lower(table_name) = lower(?)",
                params![self.schema, collection],
                |row| row.get(0),
            )
            .map_err(|e| DomainError::backend(format!("Failed to look up table: {}", e)))?;
        Ok(count > 0)
    }

    async fn create_or_replace(
        &self,
        collection: &str,
        sentences: &[String],
    ) -> Result<u64, DomainError> {
        let table = self.table(collection);
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed_error)?;

        // Dropping `tx` without commit rolls back, leaving the old table.
        let tx = conn
            .transaction()
            .map_err(|e| DomainError::backend(format!("Failed to begin transaction: {}", e)))?;

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (
                 n BIGINT PRIMARY KEY,
                 sent TEXT NOT NULL CHECK (length(sent) > 0)
             );",
            table = table
        ))
        .map_err(|e| DomainError::backend(format!("Failed to create table: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(&format!("INSERT INTO {} (n, sent) VALUES (?, ?)", table))
                .map_err(|e| {
                    DomainError::backend(format!("Failed to prepare sentence insert: {}", e))
                })?;
            for (i, sent) in sentences.iter().enumerate() {
                stmt.execute(params![i as i64, sent]).map_err(|e| {
                    DomainError::backend(format!("Failed to insert sentence {}: {}", i, e))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| DomainError::backend(format!("Failed to commit: {}", e)))?;

        debug!(
            "Saved {} sentences to DuckDB table {}",
            sentences.len(),
            table
        );
        Ok(sentences.len() as u64)
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), DomainError> {
        self.ensure_exists(collection).await?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(closed_error)?;
        conn.execute_batch(&format!("DROP TABLE {};", self.table(collection)))
            .map_err(|e| DomainError::backend(format!("Failed to drop table: {}", e)))?;
        Ok(())
    }

    async fn query_by_range(
        &self,
        collection: &str,
        range: SentenceRange,
    ) -> Result<SentenceStream, DomainError> {
        self.ensure_exists(collection).await?;
        Ok(self.paged_stream(collection, PageFilter::Range(range)))
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
        self.ensure_exists(collection).await?;
        Ok(self.paged_stream(collection, PageFilter::All))
    }

    async fn query_native(
        &self,
        collection: &str,
    ) -> Result<Vec<serde_json::Value>, DomainError> {
        self.ensure_exists(collection).await?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(closed_error)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT n, sent FROM {} ORDER BY n",
                self.table(collection)
            ))
            .map_err(|e| DomainError::backend(format!("Failed to prepare read: {}", e)))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(json!({
                    "n": row.get::<_, i64>(0)?,
                    "sent": row.get::<_, String>(1)?,
                }))
            })
            .map_err(|e| DomainError::backend(format!("Failed to read rows: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DomainError::backend(format!("Failed to read row: {}", e)))?;
        Ok(rows)
    }

    async fn close(&self) -> Result<(), DomainError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| {
                DomainError::backend(format!("Failed to close DuckDB connection: {}", e))
            })?;
            debug!("DuckDB connection for corpus {} closed", self.schema);
        }
        Ok(())
    }
}

/// Fetches the page after `cursor`; the returned cursor is `None` once the
/// last page has been read.
async fn next_page(
    conn: Arc<Mutex<Option<Connection>>>,
    table: String,
    filter: PageFilter,
    cursor: Option<i64>,
    page_size: usize,
) -> Result<Option<(Vec<SentenceRecord>, Option<i64>)>, DomainError> {
    let Some(after) = cursor else {
        return Ok(None);
    };
    let page = {
        let guard = conn.lock().await;
        let conn = guard.as_ref().ok_or_else(closed_error)?;
        fetch_page(conn, &table, &filter, after, page_size)?
    };

    if page.is_empty() {
        return Ok(None);
    }
    let next = if page.len() < page_size {
        None
    } else {
        page.last().map(|record| to_sql_int(record.n()))
    };
    Ok(Some((page, next)))
}

fn fetch_page(
    conn: &Connection,
    table: &str,
    filter: &PageFilter,
    after: i64,
    limit: usize,
) -> Result<Vec<SentenceRecord>, DomainError> {
    let predicate = match filter {
        PageFilter::All => "",
        PageFilter::Range(_) => " AND n >= ? AND n < ?",
    };
    let sql = format!(
        "SELECT n, sent FROM {} WHERE n > ?{} ORDER BY n LIMIT ?",
        table, predicate
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| DomainError::backend(format!("Failed to prepare page query: {}", e)))?;
    let limit = limit as i64;
    let rows = match filter {
        PageFilter::All => stmt.query_map(params![after, limit], row_to_record),
        PageFilter::Range(range) => stmt.query_map(
            params![
                after,
                to_sql_int(range.start()),
                to_sql_int(range.end()),
                limit
            ],
            row_to_record,
        ),
    }
    .map_err(|e| DomainError::backend(format!("Failed to run page query: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| DomainError::backend(format!("Failed to read row: {}", e)))
}

fn row_to_record(row: &duckdb::Row<'_>) -> duckdb::Result<SentenceRecord> {
    let n: i64 = row.get(0)?;
    let sent: String = row.get(1)?;
    Ok(SentenceRecord::new(n as u64, sent))
}

fn to_sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn validate_corpus_name(corpus: &str) -> Result<(), DomainError> {
    if corpus.trim().is_empty() {
        return Err(DomainError::invalid_input("corpus name must not be empty"));
    }
    Ok(())
}

fn closed_error() -> DomainError {
    DomainError::connection("DuckDB connection is closed")
}
