//! Modulo placement over the sorted member list.

use drift_types::NodeId;

use crate::{Placement, PlacementError};

/// `sorted(members)[key_id mod N]`, with `key_id` read as one hex integer.
///
/// Kept as a compatibility baseline. Growing from N to N+1 members relocates
/// close to `N/(N+1)` of all keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveModulo;

impl Placement for NaiveModulo {
    fn place(&self, key_id: &str, members: &[NodeId]) -> Result<NodeId, PlacementError> {
        if members.is_empty() {
            return Err(PlacementError::InvalidMembership);
        }
        let index = hex_mod(key_id, members.len())?;
        let mut sorted = members.to_vec();
        sorted.sort();
        Ok(sorted[index])
    }
}

/// Reduce an arbitrary-length hex integer modulo `n` without overflow.
fn hex_mod(key_id: &str, n: usize) -> Result<usize, PlacementError> {
    if key_id.is_empty() {
        return Err(PlacementError::MalformedKeyId(key_id.to_string()));
    }
    let n = n as u128;
    let mut rem: u128 = 0;
    for c in key_id.chars() {
        let digit = c
            .to_digit(16)
            .ok_or_else(|| PlacementError::MalformedKeyId(key_id.to_string()))?;
        rem = (rem * 16 + u128::from(digit)) % n;
    }
    Ok(rem as usize)
}
