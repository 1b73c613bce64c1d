//! Shared test harness for Drift integration tests.
//!
//! Provides [`IntegrationCluster`]: N group stores in one process, wired
//! through a [`LocalTransport`], with client-side routing and failure
//! injection. Membership changes are driven explicitly with
//! [`IntegrationCluster::add_node`], [`IntegrationCluster::remove_node`] and
//! [`IntegrationCluster::rebalance`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use drift_group::{GroupError, GroupStore, LocalTransport, MigrationReport};
use drift_placement::Placement;
use drift_store::open_backend;
use drift_types::{
    GroupConfig, MembershipView, NodeDescriptor, NodeId, PlacementStrategy, StoreBackendKind,
    StoreConfig,
};
use serde_json::{Value, json};
use tokio::task::JoinSet;

/// First port handed out to cluster nodes.
const BASE_PORT: u16 = 7000;

/// Deterministic JSON object for seed `i`.
pub fn test_object(i: usize) -> Value {
    json!({
        "id": i,
        "name": format!("object-{i}"),
        "tags": [i % 3, i % 5, i % 7],
        "nested": {"even": i % 2 == 0},
    })
}

/// In-process multi-node group.
pub struct IntegrationCluster {
    transport: Arc<LocalTransport>,
    stores: Vec<Arc<GroupStore>>,
    /// Current membership; nodes outside it may still hold data until
    /// they are rebalanced.
    view: MembershipView,
    config: GroupConfig,
    file_root: Option<PathBuf>,
    next_port: u16,
}

impl IntegrationCluster {
    /// `n` nodes with memory backends.
    pub fn new(n: usize, placement: PlacementStrategy) -> Self {
        Self::build(n, Self::group_config(placement), None)
    }

    /// `n` nodes with file backends under `root/<port>`.
    pub fn with_files(n: usize, placement: PlacementStrategy, root: &Path) -> Self {
        Self::build(n, Self::group_config(placement), Some(root.to_path_buf()))
    }

    /// `n` nodes with memory backends and custom tuning.
    pub fn with_config(n: usize, config: GroupConfig) -> Self {
        Self::build(n, config, None)
    }

    fn group_config(placement: PlacementStrategy) -> GroupConfig {
        GroupConfig {
            placement,
            transfer_timeout_ms: 2_000,
            ..GroupConfig::default()
        }
    }

    fn build(n: usize, config: GroupConfig, file_root: Option<PathBuf>) -> Self {
        let mut cluster = Self {
            transport: LocalTransport::new(),
            stores: Vec::new(),
            view: MembershipView::default(),
            config,
            file_root,
            next_port: BASE_PORT,
        };
        let nodes: Vec<NodeDescriptor> = (0..n).map(|_| cluster.allocate_node()).collect();
        cluster.view = MembershipView::new(nodes.clone());
        for node in nodes {
            cluster.start_store(node);
        }
        cluster
    }

    fn allocate_node(&mut self) -> NodeDescriptor {
        let node = NodeDescriptor::new("127.0.0.1", self.next_port);
        self.next_port += 1;
        node
    }

    fn start_store(&mut self, node: NodeDescriptor) -> usize {
        let store_config = match &self.file_root {
            Some(root) => StoreConfig {
                backend: StoreBackendKind::File,
                root: root.join(node.port.to_string()),
            },
            None => StoreConfig::default(),
        };
        let backend = open_backend(&store_config, &self.config.gid).unwrap();
        let store = GroupStore::new(
            node,
            self.view.clone(),
            self.config.clone(),
            backend,
            self.transport.clone(),
        );
        self.transport.register(&store);
        self.stores.push(store);
        self.stores.len() - 1
    }

    /// Store by index, in start order. Removed nodes keep their index.
    pub fn node(&self, index: usize) -> &Arc<GroupStore> {
        &self.stores[index]
    }

    pub fn node_count(&self) -> usize {
        self.stores.len()
    }

    pub fn view(&self) -> &MembershipView {
        &self.view
    }

    pub fn transport(&self) -> &Arc<LocalTransport> {
        &self.transport
    }

    fn store_by_id(&self, id: &NodeId) -> &Arc<GroupStore> {
        self.stores
            .iter()
            .find(|s| s.local_id() == *id)
            .expect("owner is not a cluster node")
    }

    /// The store owning `key` under the current view.
    pub fn owner(&self, key: &str) -> &Arc<GroupStore> {
        let id = self
            .config
            .placement
            .place(&drift_types::placement_key(key), &self.view.node_ids())
            .unwrap();
        self.store_by_id(&id)
    }

    /// Write through the owner of `key`.
    pub async fn put(&self, key: &str, value: Value) -> Result<Value, GroupError> {
        self.owner(key).put(value, Some(key)).await
    }

    /// Write under the content id of `value`, through its owner.
    pub async fn put_content(&self, value: Value) -> Result<String, GroupError> {
        let key = drift_types::compute_content_id(&value);
        self.owner(&key).put(value, None).await?;
        Ok(key)
    }

    /// Read through the owner of `key`.
    pub async fn get(&self, key: &str) -> Result<Value, GroupError> {
        self.owner(key).get_value(key).await
    }

    /// Delete through the owner of `key`.
    pub async fn del(&self, key: &str) -> Result<Value, GroupError> {
        self.owner(key).del(key).await
    }

    /// Start a node and add it to the view. Returns its index.
    ///
    /// No data moves until [`Self::rebalance`] runs.
    pub fn add_node(&mut self) -> usize {
        let node = self.allocate_node();
        self.view = self.view.with_node(node.clone());
        self.start_store(node)
    }

    /// Drop node `index` from the view. Its store stays up so it can hand
    /// its keys off during the next rebalance.
    pub fn remove_node(&mut self, index: usize) {
        let node = self.stores[index].local().clone();
        self.view = self.view.without_node(&node);
    }

    /// Reconfigure every member of `old` concurrently, from `old` to the
    /// current view. Reports come back in node index order.
    pub async fn rebalance(&self, old: &MembershipView) -> Vec<MigrationReport> {
        let mut tasks = JoinSet::new();
        for (index, store) in self.stores.iter().enumerate() {
            if !old.contains(store.local()) {
                continue;
            }
            let store = Arc::clone(store);
            let (old, new) = (old.clone(), self.view.clone());
            tasks.spawn(async move { (index, store.reconfigure(&old, &new).await) });
        }

        let mut reports = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, report) = joined.unwrap();
            reports.push((index, report.unwrap()));
        }
        reports.sort_by_key(|(index, _)| *index);
        reports.into_iter().map(|(_, r)| r).collect()
    }

    /// Mark node `index` unreachable (or reachable again).
    pub fn set_down(&self, index: usize, down: bool) {
        self.transport.set_down(self.stores[index].local_id(), down);
    }

    /// Indices of the nodes holding `key`.
    pub async fn holders(&self, key: &str) -> Vec<usize> {
        let mut holders = Vec::new();
        for (index, store) in self.stores.iter().enumerate() {
            match store.get_value(key).await {
                Ok(_) => holders.push(index),
                Err(e) if e.is_not_found() => {}
                Err(e) => panic!("reading {key} from node {index}: {e}"),
            }
        }
        holders
    }

    /// Index of a node.
    pub fn index_of(&self, store: &Arc<GroupStore>) -> usize {
        self.stores
            .iter()
            .position(|s| Arc::ptr_eq(s, store))
            .expect("store is not part of this cluster")
    }

    /// Sum of local key counts across every node.
    pub async fn total_objects(&self) -> usize {
        let mut total = 0;
        for store in &self.stores {
            total += store.keys().await.unwrap().len();
        }
        total
    }

    /// Assert every key lives exactly on its current owner with `value`.
    pub async fn assert_placed(&self, objects: &[(String, Value)]) {
        for (key, value) in objects {
            let owner = self.index_of(self.owner(key));
            assert_eq!(
                self.holders(key).await,
                vec![owner],
                "{key} must live only on node {owner}"
            );
            assert_eq!(&self.get(key).await.unwrap(), value, "{key} changed");
        }
    }
}
