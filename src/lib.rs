pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use cli::Commands;

pub use application::{
    CorpusBackend, CorpusClient, EmbeddingService, SentenceSplitter, SentenceStream,
    DEFAULT_BACKEND_TIMEOUT,
};

pub use connector::{
    BackendOptions, ChromaCorpusBackend, ChromaOptions, Container, ContainerConfig,
    DuckDbCorpusBackend, HashingEmbedding, InMemoryCorpusBackend, MongoCorpusBackend,
    MongoOptions, Router, UnicodeSentenceSplitter,
};

pub use domain::{
    BackendKind, DomainError, IngestSummary, KeywordFilter, SentenceQuery, SentenceRange,
    SentenceRecord,
};
