//! Error types for group operations.

use drift_types::NodeId;

/// Errors returned by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The destination could not be reached.
    #[error("node {0} is unreachable")]
    Unreachable(NodeId),

    /// The destination received the object but refused to store it.
    #[error("destination rejected object: {0}")]
    Rejected(String),
}

/// Errors that can occur during group store operations.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// The requested key is not held by this node.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Placement failed (empty membership or malformed key id).
    #[error("placement error: {0}")]
    Placement(#[from] drift_placement::PlacementError),

    /// The local backend failed.
    #[error("store error: {0}")]
    Store(#[from] drift_store::StoreError),

    /// A remote store was not acknowledged in time.
    #[error("transfer of {key} to {node} failed: {reason}")]
    TransferFailed {
        /// The key being moved.
        key: String,
        /// The intended new owner.
        node: NodeId,
        /// What went wrong.
        reason: String,
    },

    /// A reconfiguration finished with keys left in place.
    #[error("reconfiguration left {not_migrated} keys unmigrated")]
    PartialReconfiguration {
        /// How many keys still await migration.
        not_migrated: usize,
    },
}

impl GroupError {
    /// Whether this is [`GroupError::KeyNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }
}
