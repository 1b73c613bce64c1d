//! Group store: CRUD over a local backend plus membership-driven rebalancing.
//!
//! A [`GroupStore`] owns one [`StorageBackend`](drift_store::StorageBackend)
//! and the current [`MembershipView`](drift_types::MembershipView) of its
//! group. When the view changes, [`GroupStore::reconfigure`] finds every
//! locally held key this node owned under the old view but not under the new
//! one, and moves it to its new owner:
//!
//! 1. **Fetch** the value from the local backend.
//! 2. **Transfer** it to the new owner through a [`Transport`], bounded by a
//!    timeout, and wait for the acknowledgement.
//! 3. **Delete** the local copy, only after the acknowledgement.
//!
//! Each key's steps run under that key's lock ([`KeyLocks`]), so a client
//! write cannot slip between the fetch and the delete. Different keys migrate
//! in parallel up to `max_concurrent_transfers`. A failed transfer leaves the
//! key in place and is listed in the [`MigrationReport`].

mod error;
mod locks;
mod reconfigure;
mod report;
mod store;
mod transport;

pub use error::{GroupError, TransportError};
pub use locks::{KeyGuard, KeyLocks};
pub use report::{MigrationReport, NotMigrated};
pub use store::{GetResult, GroupStore};
pub use transport::{LocalTransport, Transport};
