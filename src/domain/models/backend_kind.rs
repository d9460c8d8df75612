use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Which storage engine a corpus lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    DuckDb,
    Chroma,
    Mongo,
    InMemory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::DuckDb => "duckdb",
            BackendKind::Chroma => "chroma",
            BackendKind::Mongo => "mongodb",
            BackendKind::InMemory => "memory",
        }
    }
}

impl FromStr for BackendKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "duckdb" => Ok(BackendKind::DuckDb),
            "chroma" | "chromadb" => Ok(BackendKind::Chroma),
            "mongodb" | "mongo" => Ok(BackendKind::Mongo),
            "memory" | "inmemory" | "in_memory" => Ok(BackendKind::InMemory),
            unknown => Err(DomainError::invalid_input(format!(
                "unknown backend '{}', expected one of: duckdb, chroma, mongodb, memory",
                unknown
            ))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
