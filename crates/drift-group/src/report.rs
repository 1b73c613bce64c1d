//! Outcome of a reconfiguration pass.

use drift_types::NodeId;
use serde::Serialize;

use crate::error::GroupError;

/// A key that stayed on this node when it should have moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotMigrated {
    pub key: String,
    /// The owner under the new view.
    pub destination: NodeId,
    pub reason: String,
}

/// Summary of one [`GroupStore::reconfigure`](crate::GroupStore::reconfigure).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Keys now held by their new owner and removed locally.
    pub migrated: Vec<String>,
    /// Keys left in place, with the reason.
    pub not_migrated: Vec<NotMigrated>,
    /// Keys that needed no move, or vanished before their turn.
    pub skipped: usize,
    /// Whether the pass was stopped before every key was attempted.
    pub cancelled: bool,
}

impl MigrationReport {
    /// True when every misplaced key reached its new owner.
    pub fn is_complete(&self) -> bool {
        self.not_migrated.is_empty() && !self.cancelled
    }

    pub fn not_migrated_keys(&self) -> impl Iterator<Item = &str> {
        self.not_migrated.iter().map(|n| n.key.as_str())
    }

    /// Turn an incomplete report into [`GroupError::PartialReconfiguration`].
    pub fn into_result(self) -> Result<Self, GroupError> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(GroupError::PartialReconfiguration {
                not_migrated: self.not_migrated.len(),
            })
        }
    }
}
