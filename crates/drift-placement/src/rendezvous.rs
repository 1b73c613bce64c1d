//! Rendezvous (highest random weight) placement.

use drift_types::{NodeId, canonical_json};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{Placement, PlacementError};

/// Score of `member` for `key_id`.
///
/// The content id of the string `key_id ++ member_hex`, truncated to its
/// first 16 hex characters and read as a u64.
pub fn rendezvous_score(key_id: &str, member: &NodeId) -> u64 {
    let combined = Value::String(format!("{key_id}{member}"));
    let digest = Sha256::digest(canonical_json(&combined));
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// The member with the highest [`rendezvous_score`] owns the key.
///
/// Equal scores go to the smaller member id. Any string is a valid key id.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rendezvous;

impl Placement for Rendezvous {
    fn place(&self, key_id: &str, members: &[NodeId]) -> Result<NodeId, PlacementError> {
        members
            .iter()
            .map(|member| (rendezvous_score(key_id, member), *member))
            .max_by(|(score_a, id_a), (score_b, id_b)| {
                score_a.cmp(score_b).then_with(|| id_b.cmp(id_a))
            })
            .map(|(_, member)| member)
            .ok_or(PlacementError::InvalidMembership)
    }
}
