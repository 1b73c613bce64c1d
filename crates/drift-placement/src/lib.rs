//! Deterministic placement of keys onto cluster members.
//!
//! Every strategy implements [`Placement`]: given a hex key id and a non-empty
//! set of member [`NodeId`]s, it returns the owning member. All strategies are
//! pure: the same `(key_id, members)` always yields the same owner, whatever
//! the order of `members`.
//!
//! - [`NaiveModulo`]: `sorted(members)[key mod N]`. Baseline; changing the
//!   member count relocates most keys.
//! - [`ConsistentRing`]: first member clockwise of the key on a u64 ring.
//!   Adding the (N+1)-th member moves about `1/(N+1)` of the keys.
//! - [`Rendezvous`]: highest `hash(key ++ member)` wins. Removing a member
//!   moves only the keys it owned.
//!
//! [`PlacementStrategy`] (from `drift-types`) is the configuration-level
//! choice and dispatches to the matching implementation.

mod error;
mod naive;
mod rendezvous;
mod ring;

use drift_types::{NodeId, PlacementStrategy};

pub use error::PlacementError;
pub use naive::NaiveModulo;
pub use rendezvous::{Rendezvous, rendezvous_score};
pub use ring::{ConsistentRing, HashRing, key_position};

/// A deterministic key-to-member mapping.
pub trait Placement: Send + Sync {
    /// Return the member of `members` that owns `key_id`.
    fn place(&self, key_id: &str, members: &[NodeId]) -> Result<NodeId, PlacementError>;
}

impl Placement for PlacementStrategy {
    fn place(&self, key_id: &str, members: &[NodeId]) -> Result<NodeId, PlacementError> {
        match self {
            PlacementStrategy::Naive => NaiveModulo.place(key_id, members),
            PlacementStrategy::Consistent => ConsistentRing.place(key_id, members),
            PlacementStrategy::Rendezvous => Rendezvous.place(key_id, members),
        }
    }
}

/// A key whose owner changes between two member sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    /// The key that must move.
    pub key_id: String,
    /// Owner under the old member set.
    pub from: NodeId,
    /// Owner under the new member set.
    pub to: NodeId,
}

/// Compute which keys change owner between `old` and `new`.
pub fn diff<P: Placement + ?Sized>(
    placement: &P,
    old: &[NodeId],
    new: &[NodeId],
    key_ids: &[String],
) -> Result<Vec<Move>, PlacementError> {
    let mut moves = Vec::new();
    for key_id in key_ids {
        let from = placement.place(key_id, old)?;
        let to = placement.place(key_id, new)?;
        if from != to {
            moves.push(Move {
                key_id: key_id.clone(),
                from,
                to,
            });
        }
    }
    Ok(moves)
}
