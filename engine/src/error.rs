//! Error types for the Stockroom engine.

use crate::{CollectionName, DocumentKey};
use thiserror::Error;

/// All possible errors from the Stockroom engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid document {collection}/{key}: {reason}")]
    InvalidDocument {
        collection: CollectionName,
        key: DocumentKey,
        reason: String,
    },

    // Store errors
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("store rejected write to {collection}/{key}: {reason}")]
    StoreWriteRejected {
        collection: CollectionName,
        key: DocumentKey,
        reason: String,
    },
}

impl Error {
    /// Shorthand for a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// True for failures that come from the backing store rather than the caller.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Error::StoreUnavailable(_) | Error::StoreWriteRejected { .. }
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::validation("item name must not be empty");
        assert_eq!(
            err.to_string(),
            "validation failed: item name must not be empty"
        );

        let err = Error::StoreWriteRejected {
            collection: "inventory".into(),
            key: "apple".into(),
            reason: "fields must be an object".into(),
        };
        assert_eq!(
            err.to_string(),
            "store rejected write to inventory/apple: fields must be an object"
        );

        let err = Error::InvalidDocument {
            collection: "inventory".into(),
            key: "pear".into(),
            reason: "missing quantity".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid document inventory/pear: missing quantity"
        );
    }

    #[test]
    fn store_failure_classification() {
        assert!(Error::StoreUnavailable("timeout".into()).is_store_failure());
        assert!(!Error::validation("bad").is_store_failure());
    }
}
