//! Consistent hashing ring.

use std::collections::BTreeMap;

use drift_types::NodeId;
use tracing::trace;

use crate::{Placement, PlacementError};

/// Number of leading hex characters that form a ring position.
const POSITION_HEX_CHARS: usize = 16;

/// Ring position of a key id: its first 16 hex characters as a u64.
///
/// Shorter ids are read whole; ids with a non-hex prefix are rejected.
pub fn key_position(key_id: &str) -> Result<u64, PlacementError> {
    let prefix_len = key_id.len().min(POSITION_HEX_CHARS);
    let prefix = &key_id.as_bytes()[..prefix_len];
    if prefix.is_empty() || !prefix.iter().all(u8::is_ascii_hexdigit) {
        return Err(PlacementError::MalformedKeyId(key_id.to_string()));
    }
    // All-ASCII prefix, so slicing the str here is on a char boundary.
    u64::from_str_radix(&key_id[..prefix_len], 16)
        .map_err(|_| PlacementError::MalformedKeyId(key_id.to_string()))
}

/// A u64 ring holding one point per member.
///
/// A member's point is the first 16 hex characters of its id. When two
/// members share a point the smaller id keeps it.
#[derive(Debug, Clone, Default)]
pub struct HashRing {
    points: BTreeMap<u64, NodeId>,
}

impl HashRing {
    /// Build a ring from a member set.
    pub fn new(members: &[NodeId]) -> Self {
        let mut points = BTreeMap::new();
        for member in members {
            points
                .entry(member.prefix_u64())
                .and_modify(|held: &mut NodeId| {
                    if member < held {
                        *held = *member;
                    }
                })
                .or_insert(*member);
        }
        trace!(points = points.len(), "built hash ring");
        Self { points }
    }

    /// Owner of `key_id`: the first member strictly clockwise of the key,
    /// wrapping past `u64::MAX` to the lowest point.
    pub fn owner(&self, key_id: &str) -> Result<NodeId, PlacementError> {
        let (_, first) = self
            .points
            .first_key_value()
            .ok_or(PlacementError::InvalidMembership)?;
        let pos = key_position(key_id)?;

        let next = pos
            .checked_add(1)
            .and_then(|from| self.points.range(from..).next())
            .map(|(_, node)| *node);
        Ok(next.unwrap_or(*first))
    }

    /// Number of distinct points on the ring.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Consistent hashing over a [`HashRing`] built from the member set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistentRing;

impl Placement for ConsistentRing {
    fn place(&self, key_id: &str, members: &[NodeId]) -> Result<NodeId, PlacementError> {
        if members.is_empty() {
            return Err(PlacementError::InvalidMembership);
        }
        HashRing::new(members).owner(key_id)
    }
}
