//! Delivery of migrating objects to their new owners.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use drift_types::{NodeDescriptor, NodeId};
use serde_json::Value;
use tracing::debug;

use crate::error::TransportError;
use crate::store::GroupStore;

/// Abstracts object transfer so the network layer can be swapped or mocked.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Store `(key, value)` on `node`.
    ///
    /// `Ok(())` means the destination acknowledged a completed store.
    /// Callers bound this with their own timeout.
    async fn send_to(
        &self,
        node: &NodeDescriptor,
        key: &str,
        value: Value,
    ) -> Result<(), TransportError>;
}

/// In-process transport that delivers to other [`GroupStore`]s directly.
///
/// Used to run several nodes inside one process. Nodes can be marked down
/// or slowed down to exercise failure handling.
#[derive(Default)]
pub struct LocalTransport {
    peers: RwLock<HashMap<NodeId, Weak<GroupStore>>>,
    down: RwLock<HashSet<NodeId>>,
    delays: RwLock<HashMap<NodeId, Duration>>,
}

impl LocalTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `store` reachable under its node id.
    pub fn register(&self, store: &Arc<GroupStore>) {
        let mut peers = self.peers.write().expect("lock poisoned");
        peers.insert(store.local_id(), Arc::downgrade(store));
    }

    /// Forget a node; later deliveries to it fail as unreachable.
    pub fn unregister(&self, node: &NodeId) {
        self.peers.write().expect("lock poisoned").remove(node);
    }

    /// Mark a node as down (or back up).
    pub fn set_down(&self, node: NodeId, down: bool) {
        let mut set = self.down.write().expect("lock poisoned");
        if down {
            set.insert(node);
        } else {
            set.remove(&node);
        }
    }

    /// Delay every delivery to `node` by `delay`. Zero clears the delay.
    pub fn set_delay(&self, node: NodeId, delay: Duration) {
        let mut delays = self.delays.write().expect("lock poisoned");
        if delay.is_zero() {
            delays.remove(&node);
        } else {
            delays.insert(node, delay);
        }
    }

    fn peer(&self, node: &NodeId) -> Option<Arc<GroupStore>> {
        let peers = self.peers.read().expect("lock poisoned");
        peers.get(node).and_then(Weak::upgrade)
    }
}

#[async_trait::async_trait]
impl Transport for LocalTransport {
    async fn send_to(
        &self,
        node: &NodeDescriptor,
        key: &str,
        value: Value,
    ) -> Result<(), TransportError> {
        let node_id = node.node_id();
        if self.down.read().expect("lock poisoned").contains(&node_id) {
            return Err(TransportError::Unreachable(node_id));
        }

        let delay = self
            .delays
            .read()
            .expect("lock poisoned")
            .get(&node_id)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let peer = self
            .peer(&node_id)
            .ok_or(TransportError::Unreachable(node_id))?;
        peer.put(value, Some(key))
            .await
            .map_err(|e| TransportError::Rejected(e.to_string()))?;

        debug!(%key, to = %node, "delivered object");
        Ok(())
    }
}
