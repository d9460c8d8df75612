//! # Domain Layer
//!
//! Sentence records, query filters and the error taxonomy.
//! This layer is independent of any storage engine.

mod error;
pub mod models;

pub use error::*;
pub use models::*;
