use std::sync::Arc;
use std::time::Duration;

use futures_util::TryStreamExt;
use tempfile::tempdir;

use sentbank::{
    BackendKind, BackendOptions, Container, ContainerConfig, CorpusBackend, CorpusClient,
    DuckDbCorpusBackend, KeywordFilter, UnicodeSentenceSplitter, SentenceRecord,
};

const MAYON: &str = "Sun is hot. It is bright. Mayon is a volcano.";

fn client(backend: DuckDbCorpusBackend) -> CorpusClient {
    CorpusClient::new(
        Arc::new(backend),
        Arc::new(UnicodeSentenceSplitter::new()),
        Duration::from_secs(10),
    )
}

#[tokio::test]
async fn duckdb_collections_survive_reopen() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("corpus.duckdb");

    let first = client(DuckDbCorpusBackend::open(&db_path, "news").expect("duckdb init"));
    first.add_text("mayon", MAYON).await.expect("add");
    first.close().await.expect("close");

    let reopened = client(DuckDbCorpusBackend::open(&db_path, "news").expect("reopen"));
    assert_eq!(reopened.list().await.unwrap(), vec!["mayon"]);
    assert_eq!(reopened.read_blob("mayon").await.unwrap(), MAYON);
}

#[tokio::test]
async fn duckdb_corpora_are_separate_schemas() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("corpus.duckdb");

    let backend = DuckDbCorpusBackend::open(&db_path, "news").unwrap();
    backend
        .create_or_replace("mayon", &["Sun is hot.".to_string()])
        .await
        .unwrap();
    backend.close().await.unwrap();

    let other = DuckDbCorpusBackend::open(&db_path, "fiction").unwrap();
    assert!(other.list_collections().await.unwrap().is_empty());
    assert!(other.query_all("mayon").await.err().unwrap().is_not_found());
}

#[tokio::test]
async fn duckdb_read_only_reads_but_rejects_writes() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("corpus.duckdb");

    let writer = DuckDbCorpusBackend::open(&db_path, "corpus").unwrap();
    writer
        .create_or_replace("mayon", &["Sun is hot.".to_string()])
        .await
        .unwrap();
    writer.close().await.unwrap();

    let reader = DuckDbCorpusBackend::open_read_only(&db_path, "corpus").unwrap();
    let records: Vec<SentenceRecord> = reader
        .query_all("mayon")
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(records, vec![SentenceRecord::new(0, "Sun is hot.")]);

    let err = reader
        .create_or_replace("other", &["Nope.".to_string()])
        .await
        .unwrap_err();
    assert!(err.is_backend_error(), "{err}");
}

#[tokio::test]
async fn duckdb_pattern_word_classes_are_unicode() {
    let backend = DuckDbCorpusBackend::in_memory("corpus").unwrap();
    let sentences: Vec<String> = ["Über alles ist gut.", "Plain text here.", "Sunsets are red."]
        .iter()
        .map(|s| s.to_string())
        .collect();
    backend.create_or_replace("sky", &sentences).await.unwrap();

    let pattern_ns = |pattern: &'static str| {
        let backend = &backend;
        async move {
            let keyword = KeywordFilter::new(pattern).unwrap();
            backend
                .query_by_pattern("sky", &keyword)
                .await
                .unwrap()
                .map_ok(|record| record.n())
                .try_collect::<Vec<u64>>()
                .await
                .unwrap()
        }
    };
    assert_eq!(pattern_ns(r"^\w+ alles").await, vec![0]);
    assert_eq!(pattern_ns(r"\bber\b").await, Vec::<u64>::new());
    assert_eq!(pattern_ns(r"^Sun\w*\s").await, vec![2]);
}

#[tokio::test]
async fn duckdb_closed_backend_reports_connection_error() {
    let backend = DuckDbCorpusBackend::in_memory("corpus").unwrap();
    backend.close().await.unwrap();

    assert!(backend.list_collections().await.unwrap_err().is_connection_error());
    assert!(backend
        .create_or_replace("doc", &[])
        .await
        .unwrap_err()
        .is_connection_error());
}

#[tokio::test]
async fn duckdb_container_opens_file_target() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("sentbank.duckdb");

    let container = Container::new(ContainerConfig {
        backend: BackendKind::DuckDb,
        connection: Some(db_path.to_string_lossy().to_string()),
        corpus: "corpus".to_string(),
        timeout: Duration::from_secs(10),
        options: BackendOptions::default(),
    })
    .await
    .expect("container");

    container.client().add_text("mayon", MAYON).await.unwrap();
    container.close().await.unwrap();
    assert!(db_path.exists());

    let read_only = Container::new(ContainerConfig {
        backend: BackendKind::DuckDb,
        connection: Some(db_path.to_string_lossy().to_string()),
        corpus: "corpus".to_string(),
        timeout: Duration::from_secs(10),
        options: BackendOptions {
            read_only: true,
            ..BackendOptions::default()
        },
    })
    .await
    .expect("read-only container");
    assert_eq!(read_only.client().list().await.unwrap(), vec!["mayon"]);
}
