//! Shared test utilities for drift-group tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use drift_store::MemoryStore;
use drift_types::{GroupConfig, MembershipView, NodeDescriptor, NodeId, PlacementStrategy};
use serde_json::{Value, json};

use crate::{GroupStore, LocalTransport, MigrationReport};

pub fn node(port: u16) -> NodeDescriptor {
    NodeDescriptor::new("127.0.0.1", port)
}

pub fn config(placement: PlacementStrategy) -> GroupConfig {
    GroupConfig {
        placement,
        transfer_timeout_ms: 2_000,
        ..GroupConfig::default()
    }
}

/// A single store with a memory backend, alone in its view.
pub fn single_store() -> Arc<GroupStore> {
    let local = node(8001);
    GroupStore::new(
        local.clone(),
        MembershipView::new(vec![local]),
        config(PlacementStrategy::Consistent),
        Arc::new(MemoryStore::new()),
        LocalTransport::new(),
    )
}

/// Several in-process stores wired together through one [`LocalTransport`].
pub struct TestCluster {
    pub transport: Arc<LocalTransport>,
    pub stores: Vec<Arc<GroupStore>>,
    config: GroupConfig,
}

impl TestCluster {
    pub fn new(ports: &[u16], config: GroupConfig) -> Self {
        let mut cluster = Self {
            transport: LocalTransport::new(),
            stores: Vec::new(),
            config,
        };
        let view: MembershipView = ports.iter().map(|p| node(*p)).collect();
        for port in ports {
            cluster.spawn_store(node(*port), view.clone());
        }
        cluster
    }

    fn spawn_store(&mut self, local: NodeDescriptor, view: MembershipView) -> Arc<GroupStore> {
        let store = GroupStore::new(
            local,
            view,
            self.config.clone(),
            Arc::new(MemoryStore::new()),
            self.transport.clone(),
        );
        self.transport.register(&store);
        self.stores.push(Arc::clone(&store));
        store
    }

    pub fn view(&self) -> MembershipView {
        self.stores.iter().map(|s| s.local().clone()).collect()
    }

    pub fn store(&self, id: &NodeId) -> &Arc<GroupStore> {
        self.stores
            .iter()
            .find(|s| s.local_id() == *id)
            .expect("no store with that id")
    }

    /// Write `count` keys, each to its owner under the current view.
    pub async fn seed(&self, count: usize) -> BTreeMap<String, Value> {
        let mut written = BTreeMap::new();
        for i in 0..count {
            let key = format!("key-{i}");
            let value = json!({"i": i, "payload": format!("value-{i}")});
            let owner = self.stores[0].owner_of(&key).unwrap();
            self.store(&owner)
                .put(value.clone(), Some(&key))
                .await
                .unwrap();
            written.insert(key, value);
        }
        written
    }

    /// Start a new member. Returns the views before and after it joined.
    pub fn add_node(&mut self, port: u16) -> (MembershipView, MembershipView) {
        let old = self.view();
        let new = old.with_node(node(port));
        self.spawn_store(node(port), new.clone());
        (old, new)
    }

    /// Run `reconfigure` on every member of `old`.
    pub async fn reconfigure_all(
        &self,
        old: &MembershipView,
        new: &MembershipView,
    ) -> Vec<MigrationReport> {
        let mut reports = Vec::new();
        for store in &self.stores {
            if old.contains(store.local()) {
                reports.push(store.reconfigure(old, new).await.unwrap());
            }
        }
        reports
    }

    /// Ids of the stores currently holding `key`.
    pub async fn holders(&self, key: &str) -> Vec<NodeId> {
        let mut holders = Vec::new();
        for store in &self.stores {
            if store.get_value(key).await.is_ok() {
                holders.push(store.local_id());
            }
        }
        holders
    }

    pub async fn total_keys(&self) -> usize {
        let mut total = 0;
        for store in &self.stores {
            total += store.keys().await.unwrap().len();
        }
        total
    }
}
