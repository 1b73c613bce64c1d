//! Error types for storage operations.

/// Errors that can occur during storage operations.
///
/// A missing key is not an error at this layer: lookups return `None`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A file name in the store directory is not a valid key encoding.
    #[error("invalid key encoding: {0:?}")]
    InvalidKeyEncoding(String),
}
