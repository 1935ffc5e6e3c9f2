//! Error types for the store adapters.

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by a [`DocumentStore`](crate::DocumentStore) adapter
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transform or condition error from the core crate
    #[error(transparent)]
    Core(#[from] docload_core::Error),

    /// No document under the requested key
    #[error("no document with doc_id={doc_id} in collection={collection}")]
    NotFound {
        /// Collection that was searched
        collection: String,
        /// Requested document id
        doc_id: String,
    },

    /// No document id could be resolved for an upload
    #[error(
        "document id is required: provide --doc-id or an `_id` field in {doc_source}"
    )]
    MissingDocId {
        /// The document source being loaded
        doc_source: String,
    },

    /// No collection could be resolved for an upload
    #[error(
        "collection name is required: provide --collection or a `_collection` field in {doc_source}"
    )]
    MissingCollection {
        /// The document source being loaded
        doc_source: String,
    },

    /// The loaded payload is not a JSON object at the top level
    #[error("{doc_source} does not contain a JSON object document")]
    NotAnObject {
        /// The document source being loaded
        doc_source: String,
    },

    /// An operator the backend cannot evaluate with the given operand
    #[error("operator '{op}' requires a list value (condition on field '{field}')")]
    InvalidOperand {
        /// Operator token
        op: &'static str,
        /// Field the condition applies to
        field: String,
    },

    /// Could not establish the backing-store connection
    #[error("connection to {backend} failed: {message}")]
    Connection {
        /// Backend name
        backend: &'static str,
        /// Client-reported reason
        message: String,
    },

    /// Error reported by the backing store during an operation
    #[error("{backend} error: {message}")]
    Backend {
        /// Backend name
        backend: &'static str,
        /// Client-reported reason
        message: String,
    },
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Backend {
            backend: "mongodb",
            message: e.to_string(),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend {
            backend: "redis",
            message: e.to_string(),
        }
    }
}
