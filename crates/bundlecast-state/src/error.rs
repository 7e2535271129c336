//! Error types for bundlecast-state

use thiserror::Error;

/// Errors raised by manifest and blob storage backends.
///
/// Every variant is a transient upstream failure from the caller's point of
/// view; backends never retry internally.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Object not present at the requested location
    #[error("object not found: {location}")]
    NotFound { location: String },

    /// Backend (database, object store, HTTP) failure
    #[error("storage backend failed: {0}")]
    Backend(String),

    /// Database connection error
    #[error("database connection failed: {0}")]
    Connection(String),

    /// (De)serialization of a stored document failed
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Path or URL outside what the backend can address
    #[error("invalid object path: {path}")]
    InvalidPath { path: String },

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
