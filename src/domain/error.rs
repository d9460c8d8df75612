use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Backend timed out: {0}")]
    Timeout(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DomainError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::BackendError(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn collection_not_found(collection: &str) -> Self {
        Self::NotFound(format!("collection '{}' does not exist", collection))
    }

    /// Prefixes the message with the failing operation and collection.
    ///
    /// The error kind is preserved so callers can keep matching on it.
    /// I/O errors already carry their path and are returned untouched.
    pub fn in_context(self, operation: &str, collection: &str) -> Self {
        let prefix = |msg: String| format!("{}('{}'): {}", operation, collection, msg);
        match self {
            Self::ConnectionError(msg) => Self::ConnectionError(prefix(msg)),
            Self::NotFound(msg) => Self::NotFound(prefix(msg)),
            Self::BackendError(msg) => Self::BackendError(prefix(msg)),
            Self::Timeout(msg) => Self::Timeout(prefix(msg)),
            Self::Unsupported(msg) => Self::Unsupported(prefix(msg)),
            Self::InvalidInput(msg) => Self::InvalidInput(prefix(msg)),
            io @ Self::Io { .. } => io,
        }
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_backend_error(&self) -> bool {
        matches!(self, Self::BackendError(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_context_keeps_kind_and_adds_operation() {
        let err = DomainError::backend("constraint failed").in_context("add", "mayon");
        assert!(err.is_backend_error());
        assert_eq!(
            err.to_string(),
            "Backend error: add('mayon'): constraint failed"
        );

        let err = DomainError::collection_not_found("mayon").in_context("read_blob", "mayon");
        assert!(err.is_not_found());
    }

    #[test]
    fn in_context_leaves_io_errors_alone() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = DomainError::io("/tmp/missing.txt", io).in_context("add", "missing");
        assert!(err.is_io());
        assert!(err.to_string().contains("/tmp/missing.txt"));
    }
}
