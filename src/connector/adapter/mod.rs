mod chroma_corpus_backend;
mod duckdb_corpus_backend;
mod hashing_embedding;
mod in_memory_corpus_backend;
mod mongo_corpus_backend;
mod unicode_sentence_splitter;

pub use chroma_corpus_backend::*;
pub use duckdb_corpus_backend::*;
pub use hashing_embedding::*;
pub use in_memory_corpus_backend::*;
pub use mongo_corpus_backend::*;
pub use unicode_sentence_splitter::*;
