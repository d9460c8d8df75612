mod add_document;
mod list_collections;
mod read_blob;
mod read_native;
mod read_sentences;
mod read_similar;
mod remove_collection;

pub use add_document::*;
pub use list_collections::*;
pub use read_blob::*;
pub use read_native::*;
pub use read_sentences::*;
pub use read_similar::*;
pub use remove_collection::*;
