//! # Application Layer
//!
//! Ports implemented by the connector layer, the use cases that drive them,
//! and the `CorpusClient` façade.

mod collection_locks;
mod corpus_client;
mod deadline;
pub mod interfaces;
pub mod use_cases;

pub use collection_locks::*;
pub use corpus_client::*;
pub use deadline::*;
pub use interfaces::*;
pub use use_cases::*;
