//! Error types for the store boundary.

use thiserror::Error;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend rejected or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored document could not be decoded.
    #[error("malformed document in {collection}: {message}")]
    Malformed {
        collection: &'static str,
        message: String,
    },
}
