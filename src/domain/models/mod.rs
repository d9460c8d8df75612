mod backend_kind;
mod collection;
mod sentence_query;
mod sentence_record;

pub use backend_kind::*;
pub use collection::*;
pub use sentence_query::*;
pub use sentence_record::*;
