//! End-to-end tests for the corpus client over the local backends.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tempfile::tempdir;

use sentbank::{
    BackendKind, CorpusBackend, CorpusClient, DomainError, DuckDbCorpusBackend,
    InMemoryCorpusBackend, KeywordFilter, SentenceQuery, SentenceRange, SentenceRecord,
    SentenceSplitter, SentenceStream, UnicodeSentenceSplitter,
};

const MAYON: &str = "Sun is hot. It is bright. Mayon is a volcano.";

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn client_for(backend: Arc<dyn CorpusBackend>) -> CorpusClient {
    CorpusClient::new(
        backend,
        Arc::new(UnicodeSentenceSplitter::new()),
        Duration::from_secs(10),
    )
}

fn local_clients() -> Vec<CorpusClient> {
    vec![
        client_for(Arc::new(InMemoryCorpusBackend::new())),
        client_for(Arc::new(
            DuckDbCorpusBackend::in_memory("corpus")
                .expect("duckdb init")
                .with_page_size(2),
        )),
    ]
}

async fn read(
    client: &CorpusClient,
    name: &str,
    query: SentenceQuery,
) -> Result<Vec<SentenceRecord>, DomainError> {
    client.read_sents(name, &query).await?.try_collect().await
}

fn range(start: u64, end: u64) -> SentenceQuery {
    SentenceQuery::new().with_range(SentenceRange::new(start, end).unwrap())
}

fn keyword(pattern: &str) -> SentenceQuery {
    SentenceQuery::new().with_keyword(KeywordFilter::new(pattern).unwrap())
}

#[tokio::test]
async fn test_mayon_scenario_on_every_local_backend() {
    for client in local_clients() {
        let kind = client.backend_kind();
        let summary = client.add(fixture("mayon.txt")).await.expect("add");
        assert_eq!(summary.collection(), "mayon");
        assert_eq!(summary.sentence_count(), 3);

        assert!(client.list().await.unwrap().contains(&"mayon".to_string()));

        let ranged = read(&client, "mayon", range(1, 3)).await.unwrap();
        assert_eq!(
            ranged,
            vec![
                SentenceRecord::new(1, "It is bright."),
                SentenceRecord::new(2, "Mayon is a volcano."),
            ],
            "{kind}"
        );

        let matched = read(&client, "mayon", keyword("Sun.+")).await.unwrap();
        assert_eq!(matched, vec![SentenceRecord::new(0, "Sun is hot.")], "{kind}");

        assert_eq!(client.read_blob("mayon").await.unwrap(), MAYON);

        client.remove("mayon").await.expect("remove");
        assert!(!client.list().await.unwrap().contains(&"mayon".to_string()));

        client.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_removed_collection_is_not_found_everywhere() {
    for client in local_clients() {
        client.add_text("gone", MAYON).await.unwrap();
        client.remove("gone").await.unwrap();

        let sents = client.read_sents("gone", &SentenceQuery::new()).await;
        assert!(sents.err().unwrap().is_not_found());
        assert!(client.read_blob("gone").await.unwrap_err().is_not_found());
        assert!(client.remove("gone").await.unwrap_err().is_not_found());
        assert!(client.read_native("gone").await.unwrap_err().is_not_found());
    }
}

#[tokio::test]
async fn test_combined_filters_are_the_intersection() {
    let text = "The sun rose. Birds sang. The sun climbed. Clouds came. \
                The sun hid. Rain fell. The sun returned.";
    for client in local_clients() {
        client.add_text("day", text).await.unwrap();

        let by_range: Vec<u64> = read(&client, "day", range(2, 6))
            .await
            .unwrap()
            .iter()
            .map(SentenceRecord::n)
            .collect();
        let by_keyword: Vec<u64> = read(&client, "day", keyword("sun"))
            .await
            .unwrap()
            .iter()
            .map(SentenceRecord::n)
            .collect();
        let both: Vec<u64> = read(
            &client,
            "day",
            range(2, 6).with_keyword(KeywordFilter::new("sun").unwrap()),
        )
        .await
        .unwrap()
        .iter()
        .map(SentenceRecord::n)
        .collect();

        let expected: Vec<u64> = by_range
            .iter()
            .copied()
            .filter(|n| by_keyword.contains(n))
            .collect();
        assert_eq!(both, expected);
        assert_eq!(both, vec![2, 4]);
    }
}

#[tokio::test]
async fn test_word_classes_match_non_ascii_letters_on_every_backend() {
    for client in local_clients() {
        client
            .add_text("uber", "Über alles ist gut. Plain text here.")
            .await
            .unwrap();

        let word_start = KeywordFilter::new(r"^\w+ alles").unwrap();
        let inner_word = KeywordFilter::new(r"\bber\b").unwrap();
        for query in [
            SentenceQuery::new().with_keyword(word_start.clone()),
            range(0, 2).with_keyword(word_start),
        ] {
            let found = read(&client, "uber", query).await.unwrap();
            assert_eq!(found, vec![SentenceRecord::new(0, "Über alles ist gut.")]);
        }
        for query in [
            SentenceQuery::new().with_keyword(inner_word.clone()),
            range(0, 2).with_keyword(inner_word),
        ] {
            assert!(read(&client, "uber", query).await.unwrap().is_empty());
        }
    }
}

#[tokio::test]
async fn test_similar_sentences_where_supported() {
    let memory = client_for(Arc::new(InMemoryCorpusBackend::new()));
    memory.add_text("mayon", MAYON).await.unwrap();
    let top = memory.read_similar("mayon", "volcano", 1).await.unwrap();
    assert_eq!(top, vec![SentenceRecord::new(2, "Mayon is a volcano.")]);

    let missing = memory.read_similar("ghost", "volcano", 1).await.unwrap_err();
    assert!(missing.is_not_found(), "{missing}");
    let empty = memory.read_similar("mayon", " ", 1).await.unwrap_err();
    assert!(empty.is_invalid_input(), "{empty}");

    let duckdb = client_for(Arc::new(DuckDbCorpusBackend::in_memory("corpus").unwrap()));
    duckdb.add_text("mayon", MAYON).await.unwrap();
    let err = duckdb.read_similar("mayon", "volcano", 1).await.unwrap_err();
    assert!(err.is_unsupported(), "{err}");
}

#[tokio::test]
async fn test_reads_are_idempotent() {
    for client in local_clients() {
        client.add_text("mayon", MAYON).await.unwrap();
        let first = read(&client, "mayon", range(0, 2)).await.unwrap();
        let second = read(&client, "mayon", range(0, 2)).await.unwrap();
        assert_eq!(first, second);
    }
}

#[tokio::test]
async fn test_empty_results_are_not_errors() {
    for client in local_clients() {
        client.add_text("mayon", MAYON).await.unwrap();
        assert!(read(&client, "mayon", range(10, 20)).await.unwrap().is_empty());
        assert!(read(&client, "mayon", range(1, 1)).await.unwrap().is_empty());
        assert!(read(&client, "mayon", keyword("glacier"))
            .await
            .unwrap()
            .is_empty());

        client.add_text("blank", "   \n\n ").await.unwrap();
        assert!(client.list().await.unwrap().contains(&"blank".to_string()));
        assert_eq!(client.read_blob("blank").await.unwrap(), "");
    }
}

#[tokio::test]
async fn test_repeated_add_replaces_collection() {
    for client in local_clients() {
        client.add_text("doc", MAYON).await.unwrap();
        let summary = client.add_text("doc", "Only one now.").await.unwrap();
        assert_eq!(summary.sentence_count(), 1);

        let records = read(&client, "doc", SentenceQuery::new()).await.unwrap();
        assert_eq!(records, vec![SentenceRecord::new(0, "Only one now.")]);
    }
}

/// Emits a fixed sentence list, including an empty sentence that storage
/// rejects part-way through an insert.
struct FixedSplitter(Vec<&'static str>);

impl SentenceSplitter for FixedSplitter {
    fn split(&self, _text: &str) -> Vec<String> {
        self.0.iter().map(|s| s.to_string()).collect()
    }
}

#[tokio::test]
async fn test_failed_add_leaves_previous_state() {
    let backends: Vec<Arc<dyn CorpusBackend>> = vec![
        Arc::new(InMemoryCorpusBackend::new()),
        Arc::new(DuckDbCorpusBackend::in_memory("corpus").unwrap()),
    ];
    for backend in backends {
        let good = client_for(backend.clone());
        good.add_text("doc", MAYON).await.unwrap();

        let faulty = CorpusClient::new(
            backend,
            Arc::new(FixedSplitter(vec!["First.", "Second.", "", "Fourth."])),
            Duration::from_secs(10),
        );

        let err = faulty.add_text("doc", "ignored").await.unwrap_err();
        assert!(err.is_backend_error(), "{err}");
        assert!(err.to_string().contains("add('doc')"), "{err}");

        let err = faulty.add_text("fresh", "ignored").await.unwrap_err();
        assert!(err.is_backend_error());

        assert_eq!(good.read_blob("doc").await.unwrap(), MAYON);
        assert!(!good.list().await.unwrap().contains(&"fresh".to_string()));
    }
}

#[tokio::test]
async fn test_add_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    for client in local_clients() {
        let err = client
            .add(dir.path().join("absent.txt"))
            .await
            .unwrap_err();
        assert!(err.is_io(), "{err}");
        assert!(client.list().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_add_strips_bom_and_splits_paragraphs() {
    let client = client_for(Arc::new(InMemoryCorpusBackend::new()));
    client.add(fixture("flood.txt")).await.unwrap();

    let records = read(&client, "flood", SentenceQuery::new()).await.unwrap();
    let sents: Vec<&str> = records.iter().map(SentenceRecord::sent).collect();
    assert_eq!(
        sents,
        vec![
            "The river rose.",
            "Mayor Cruz warned the town!",
            "Evacuation began at dawn."
        ]
    );
}

#[tokio::test]
async fn test_add_as_and_add_dir() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("one.txt"), "First doc.").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("nested").join("two.TXT"), "Second. Doc.").unwrap();
    std::fs::write(dir.path().join("skip.md"), "Not me.").unwrap();

    let client = client_for(Arc::new(InMemoryCorpusBackend::new()));
    let summaries = client
        .add_dir(dir.path(), &["txt".to_string()])
        .await
        .unwrap();
    let names: Vec<&str> = summaries.iter().map(|s| s.collection()).collect();
    // Walk order is by path: "nested/two.TXT" sorts before "one.txt".
    assert_eq!(names, vec!["two", "one"]);

    client
        .add_as(dir.path().join("skip.md"), "markdown")
        .await
        .unwrap();
    assert_eq!(
        client.list().await.unwrap(),
        vec!["markdown", "one", "two"]
    );
}

#[tokio::test]
async fn test_invalid_filters_are_rejected() {
    assert!(SentenceRange::new(5, 2).unwrap_err().is_invalid_input());
    assert!(KeywordFilter::new("(unclosed").unwrap_err().is_invalid_input());
    assert!(KeywordFilter::new("").unwrap_err().is_invalid_input());
}

#[tokio::test]
async fn test_native_format_per_backend() {
    for client in local_clients() {
        client.add_text("mayon", MAYON).await.unwrap();
        let native = client.read_native("mayon").await.unwrap();
        assert_eq!(native.len(), 3);
        assert_eq!(native[2]["n"], 2);
        assert_eq!(native[2]["sent"], "Mayon is a volcano.");
        match client.backend_kind() {
            BackendKind::InMemory => assert_eq!(native[0]["collection"], "mayon"),
            _ => assert!(native[0].get("collection").is_none()),
        }
    }
}

/// Backend whose calls never finish in time.
struct SlowBackend {
    delay: Duration,
}

#[async_trait]
impl CorpusBackend for SlowBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::InMemory
    }

    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec!["late".to_string()])
    }

    async fn create_or_replace(
        &self,
        _collection: &str,
        sentences: &[String],
    ) -> Result<u64, DomainError> {
        tokio::time::sleep(self.delay).await;
        Ok(sentences.len() as u64)
    }

    async fn drop_collection(&self, _collection: &str) -> Result<(), DomainError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn query_by_range(
        &self,
        collection: &str,
        _range: SentenceRange,
    ) -> Result<SentenceStream, DomainError> {
        self.query_all(collection).await
    }

    async fn query_by_pattern(
        &self,
        collection: &str,
        _keyword: &KeywordFilter,
    ) -> Result<SentenceStream, DomainError> {
        self.query_all(collection).await
    }

    async fn query_all(&self, _collection: &str) -> Result<SentenceStream, DomainError> {
        tokio::time::sleep(self.delay).await;
        Ok(sentbank::application::stream_records(Vec::new()))
    }

    async fn query_native(
        &self,
        _collection: &str,
    ) -> Result<Vec<serde_json::Value>, DomainError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_slow_backend_surfaces_timeout() {
    let client = CorpusClient::new(
        Arc::new(SlowBackend {
            delay: Duration::from_secs(5),
        }),
        Arc::new(UnicodeSentenceSplitter::new()),
        Duration::from_millis(50),
    );

    assert!(client.list().await.unwrap_err().is_timeout());
    assert!(client.read_blob("late").await.unwrap_err().is_timeout());

    let err = client.add_text("late", MAYON).await.unwrap_err();
    assert!(err.is_timeout(), "{err}");
    assert!(!err.is_backend_error());
}

#[tokio::test]
async fn test_concurrent_reads_during_unrelated_write() {
    let client = Arc::new(client_for(Arc::new(
        DuckDbCorpusBackend::in_memory("corpus").unwrap(),
    )));
    client.add_text("stable", MAYON).await.unwrap();

    let reader = {
        let client = client.clone();
        tokio::spawn(async move {
            for _ in 0..10 {
                assert_eq!(client.read_blob("stable").await.unwrap(), MAYON);
            }
        })
    };
    let writer = {
        let client = client.clone();
        tokio::spawn(async move {
            for i in 0..10 {
                client
                    .add_text("churn", &format!("Round {}. Still going.", i))
                    .await
                    .unwrap();
            }
        })
    };

    reader.await.unwrap();
    writer.await.unwrap();
    assert_eq!(
        read(&client, "churn", SentenceQuery::new()).await.unwrap().len(),
        2
    );
}
