use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::application::{CorpusBackend, CorpusClient, DEFAULT_BACKEND_TIMEOUT};
use crate::connector::adapter::{
    ChromaCorpusBackend, ChromaOptions, DuckDbCorpusBackend, InMemoryCorpusBackend,
    MongoCorpusBackend, MongoOptions, UnicodeSentenceSplitter, DEFAULT_CHROMA_DATABASE,
    DEFAULT_CHROMA_URL, DEFAULT_MONGO_URL, DEFAULT_PAGE_SIZE,
};
use crate::domain::{BackendKind, DomainError};

/// Connection target that opens a private, non-persistent DuckDB database.
pub const DUCKDB_IN_MEMORY: &str = ":memory:";

/// Backend-specific knobs. Options a backend does not understand are ignored.
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub page_size: usize,
    /// Chroma database the corpus collections live in.
    pub database: String,
    /// Open the database in read-only mode.
    ///
    /// For DuckDB this uses `AccessMode::ReadOnly`, which does not take the
    /// exclusive write lock, so several readers can share one file.
    pub read_only: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            database: DEFAULT_CHROMA_DATABASE.to_string(),
            read_only: false,
        }
    }
}

pub struct ContainerConfig {
    pub backend: BackendKind,
    /// Database file for DuckDB, URL for Chroma and MongoDB; unused in memory.
    pub connection: Option<String>,
    pub corpus: String,
    pub timeout: Duration,
    pub options: BackendOptions,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            connection: None,
            corpus: "corpus".to_string(),
            timeout: DEFAULT_BACKEND_TIMEOUT,
            options: BackendOptions::default(),
        }
    }
}

pub struct Container {
    client: CorpusClient,
    config: ContainerConfig,
}

impl Container {
    /// Opens the configured backend. There is no fallback: if the chosen
    /// backend cannot be reached the error is returned as is.
    pub async fn new(config: ContainerConfig) -> Result<Self, DomainError> {
        let backend = open_backend(&config).await?;
        let client = CorpusClient::new(
            backend,
            Arc::new(UnicodeSentenceSplitter::new()),
            config.timeout,
        );
        Ok(Self { client, config })
    }

    pub fn client(&self) -> &CorpusClient {
        &self.client
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.config.backend
    }

    pub fn corpus(&self) -> &str {
        &self.config.corpus
    }

    pub fn connection(&self) -> &str {
        match (self.config.backend, self.config.connection.as_deref()) {
            (BackendKind::InMemory, _) => "(process memory)",
            (_, Some(target)) => target,
            (BackendKind::DuckDb, None) => DUCKDB_IN_MEMORY,
            (BackendKind::Chroma, None) => DEFAULT_CHROMA_URL,
            (BackendKind::Mongo, None) => DEFAULT_MONGO_URL,
        }
    }

    pub async fn close(self) -> Result<(), DomainError> {
        self.client.close().await
    }
}

async fn open_backend(config: &ContainerConfig) -> Result<Arc<dyn CorpusBackend>, DomainError> {
    let options = &config.options;
    match config.backend {
        BackendKind::InMemory => {
            debug!("Using in-memory corpus storage");
            Ok(Arc::new(InMemoryCorpusBackend::new()))
        }
        BackendKind::DuckDb => {
            let target = config.connection.as_deref().unwrap_or(DUCKDB_IN_MEMORY);
            let backend = if target == DUCKDB_IN_MEMORY {
                DuckDbCorpusBackend::in_memory(&config.corpus)?
            } else if options.read_only {
                DuckDbCorpusBackend::open_read_only(Path::new(target), &config.corpus)?
            } else {
                DuckDbCorpusBackend::open(Path::new(target), &config.corpus)?
            };
            debug!(
                "Using DuckDB corpus storage at {} corpus {}",
                target, config.corpus
            );
            Ok(Arc::new(backend.with_page_size(options.page_size)))
        }
        BackendKind::Chroma => {
            let url = config.connection.as_deref().unwrap_or(DEFAULT_CHROMA_URL);
            let chroma_options = ChromaOptions {
                database: options.database.clone(),
                page_size: options.page_size,
                ..ChromaOptions::default()
            };
            let backend = ChromaCorpusBackend::connect(url, &config.corpus, chroma_options).await?;
            debug!("Connected to Chroma at {} corpus {}", url, config.corpus);
            Ok(Arc::new(backend))
        }
        BackendKind::Mongo => {
            let url = config.connection.as_deref().unwrap_or(DEFAULT_MONGO_URL);
            let mongo_options = MongoOptions {
                page_size: options.page_size,
                timeout: config.timeout,
            };
            let backend = MongoCorpusBackend::connect(url, &config.corpus, mongo_options).await?;
            Ok(Arc::new(backend))
        }
    }
}
