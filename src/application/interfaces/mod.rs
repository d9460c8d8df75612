mod corpus_backend;
mod embedding_service;
mod sentence_splitter;

pub use corpus_backend::*;
pub use embedding_service::*;
pub use sentence_splitter::*;
