use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Derives a collection name from a source file: the file name without
/// directory and without its final extension.
pub fn collection_name_from_path(path: &Path) -> Result<String, DomainError> {
    let stem = path
        .file_stem()
        .ok_or_else(|| {
            DomainError::invalid_input(format!("no file name in path {}", path.display()))
        })?
        .to_str()
        .ok_or_else(|| {
            DomainError::invalid_input(format!("file name is not UTF-8: {}", path.display()))
        })?;

    validate_collection_name(stem)?;
    Ok(stem.to_string())
}

pub fn validate_collection_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::invalid_input("collection name must not be empty"));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(DomainError::invalid_input(format!(
            "collection name contains control characters: {:?}",
            name
        )));
    }
    Ok(())
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    collection: String,
    sentence_count: u64,
}

impl IngestSummary {
    pub fn new(collection: impl Into<String>, sentence_count: u64) -> Self {
        Self {
            collection: collection.into(),
            sentence_count,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn sentence_count(&self) -> u64 {
        self.sentence_count
    }
}
