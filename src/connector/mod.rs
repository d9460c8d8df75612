//! # Connector Layer
//!
//! External integrations implementing the application ports:
//! - Corpus backends (DuckDB, Chroma, MongoDB, in-memory)
//! - Sentence splitting and embeddings
//! - CLI composition root and controllers

pub mod adapter;
pub mod api;

pub use adapter::*;
pub use api::*;
