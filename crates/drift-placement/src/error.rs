//! Error types for placement.

/// Errors that can occur while placing a key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// The member set was empty.
    #[error("invalid membership: cannot place a key on an empty member set")]
    InvalidMembership,

    /// The key id is not in the form the strategy requires.
    #[error("malformed key id {0:?}: expected hexadecimal")]
    MalformedKeyId(String),
}
