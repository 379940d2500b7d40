//! Error types for store operations.
//!
//! Four kinds of failure reach the caller:
//! - validation: the arguments are unusable (empty key, NaN operand, ...)
//! - type mismatch: the stored value has the wrong JSON type for the operation
//! - io: the backing file could not be created, read, written or copied
//! - parse: the backing or backup file is not a JSON object

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid argument: empty key or name, NaN operand, unknown operator.
    #[error("validation error: {0}")]
    Validation(String),

    /// The stored value's JSON type conflicts with the operation.
    #[error("type mismatch for key {key}: expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// I/O error on the backing or backup file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing or backup file contents are not a valid JSON object.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Returns true if retrying the same call might succeed.
    ///
    /// The store never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Validation("key cannot be empty".to_string());
        assert!(err.to_string().contains("validation error"));
        assert!(err.to_string().contains("key cannot be empty"));
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = StoreError::TypeMismatch {
            key: "count".to_string(),
            expected: "number",
            found: "string",
        };
        assert!(err.to_string().contains("count"));
        assert!(err.to_string().contains("expected number"));
        assert!(err.to_string().contains("found string"));
    }

    #[test]
    fn test_retryable_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(StoreError::Io(io).is_retryable());
        assert!(!StoreError::Validation("test".to_string()).is_retryable());
        assert!(!StoreError::Parse("test".to_string()).is_retryable());
    }

    #[test]
    fn test_serde_error_is_parse() {
        let err: StoreError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::Parse(_)));
    }
}
