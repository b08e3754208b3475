use thiserror::Error;
use wave_shared::DecodeError;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The remote service could not be reached or refused the operation.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// A point operation targeted a document that does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A create-only write targeted a path that is already taken.
    #[error("Already exists: {0}")]
    Conflict(String),

    /// Malformed document, collection or blob path.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A stored document did not match its schema.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Generic I/O error (filesystem blob store).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob too large: {size} bytes (max {max})")]
    BlobTooLarge { size: usize, max: usize },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
