//! Storage error type shared by both engines and the gateway.

use thiserror::Error;

/// Storage errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Failed to open storage: {0}")]
    ConnectionFailed(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Rejected before any I/O.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
