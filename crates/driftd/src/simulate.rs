//! In-process rebalancing simulation.
//!
//! Starts a group of [`GroupStore`]s wired through a [`LocalTransport`],
//! writes content-addressed objects to their owners, grows the group and
//! reconfigures every original member. The summary says how many objects
//! moved and whether any ended up lost, duplicated or misplaced.
//!
//! File-backed runs use a fresh scratch directory under
//! `{data_dir}/simulations`, removed when the run ends, so objects from an
//! earlier run never leak into the next one.

use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use drift_group::{GroupStore, LocalTransport, MigrationReport};
use drift_store::open_backend;
use drift_types::{
    GroupConfig, MembershipView, NodeDescriptor, NodeId, StoreBackendKind, StoreConfig,
    compute_content_id,
};
use tempfile::TempDir;
use serde_json::json;
use tokio::task::JoinSet;
use tracing::info;

use crate::config::CliConfig;

/// Shape of one simulation run.
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Members before the change.
    pub nodes: usize,
    /// Objects written before the change.
    pub objects: usize,
    /// Members joining.
    pub add: usize,
}

#[derive(Debug)]
pub struct SimulationSummary {
    pub objects: usize,
    /// One report per original member.
    pub reports: Vec<(NodeDescriptor, MigrationReport)>,
    pub lost: Vec<String>,
    pub duplicated: Vec<String>,
    pub misplaced: Vec<String>,
}

impl SimulationSummary {
    pub fn migrated(&self) -> usize {
        self.reports.iter().map(|(_, r)| r.migrated.len()).sum()
    }

    pub fn not_migrated(&self) -> usize {
        self.reports.iter().map(|(_, r)| r.not_migrated.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.lost.is_empty() && self.duplicated.is_empty() && self.misplaced.is_empty()
    }

    /// Human-readable list of what went wrong, e.g. `"3 lost, 1 duplicated"`.
    pub fn problems(&self) -> String {
        [
            ("lost", self.lost.len()),
            ("duplicated", self.duplicated.len()),
            ("misplaced", self.misplaced.len()),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(what, n)| format!("{n} {what}"))
        .collect::<Vec<_>>()
        .join(", ")
    }
}

struct Simulation {
    address: String,
    base_port: u16,
    group: GroupConfig,
    store: StoreConfig,
    transport: Arc<LocalTransport>,
    stores: Vec<Arc<GroupStore>>,
    /// Holds file-backed objects for the lifetime of the run.
    _scratch: Option<TempDir>,
}

impl Simulation {
    fn new(config: &CliConfig) -> Result<Self> {
        let mut store = config.store_config();
        let scratch = match store.backend {
            StoreBackendKind::Memory => None,
            StoreBackendKind::File => {
                let parent = config.node.data_dir.join("simulations");
                std::fs::create_dir_all(&parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
                let dir = tempfile::Builder::new()
                    .prefix("run-")
                    .tempdir_in(&parent)
                    .context("failed to create simulation directory")?;
                store.root = dir.path().to_path_buf();
                Some(dir)
            }
        };
        Ok(Self {
            address: config.node.address.clone(),
            base_port: config.node.port,
            group: config.group_config(),
            store,
            transport: LocalTransport::new(),
            stores: Vec::new(),
            _scratch: scratch,
        })
    }

    fn descriptor(&self, index: usize) -> Result<NodeDescriptor> {
        let port = u16::try_from(usize::from(self.base_port) + index)
            .context("simulated node port out of range")?;
        Ok(NodeDescriptor::new(self.address.clone(), port))
    }

    fn view(&self) -> MembershipView {
        self.stores.iter().map(|s| s.local().clone()).collect()
    }

    /// Start one more member with `view` as its initial view.
    fn start_node(&mut self, view: MembershipView) -> Result<Arc<GroupStore>> {
        let local = self.descriptor(self.stores.len())?;
        let store_config = StoreConfig {
            backend: self.store.backend,
            root: self.store.root.join(local.port.to_string()),
        };
        let backend = open_backend(&store_config, &self.group.gid)
            .with_context(|| format!("failed to open backend for {local}"))?;
        let store = GroupStore::new(
            local,
            view,
            self.group.clone(),
            backend,
            self.transport.clone(),
        );
        self.transport.register(&store);
        self.stores.push(Arc::clone(&store));
        Ok(store)
    }

    fn store_for(&self, id: &NodeId) -> Result<&Arc<GroupStore>> {
        self.stores
            .iter()
            .find(|s| s.local_id() == *id)
            .with_context(|| format!("no simulated node with id {}", id.short()))
    }
}

/// Run a full simulation described by `options`.
pub async fn run(config: &CliConfig, options: &SimulationOptions) -> Result<SimulationSummary> {
    ensure!(options.nodes > 0, "a simulation needs at least one node");

    let mut sim = Simulation::new(config)?;
    let initial: MembershipView = (0..options.nodes)
        .map(|i| sim.descriptor(i))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .collect();
    for _ in 0..options.nodes {
        sim.start_node(initial.clone())?;
    }

    let mut keys = Vec::with_capacity(options.objects);
    for n in 0..options.objects {
        let value = json!({"n": n, "label": format!("object-{n}")});
        let key = compute_content_id(&value);
        let owner = sim.stores[0].owner_of(&key)?;
        sim.store_for(&owner)?.put(value, None).await?;
        keys.push(key);
    }
    info!(nodes = options.nodes, objects = keys.len(), "group seeded");

    let old = sim.view();
    let mut new = old.clone();
    for i in 0..options.add {
        new = new.with_node(sim.descriptor(options.nodes + i)?);
    }
    for _ in 0..options.add {
        sim.start_node(new.clone())?;
    }

    let mut tasks = JoinSet::new();
    for store in &sim.stores[..options.nodes] {
        let store = Arc::clone(store);
        let (old, new) = (old.clone(), new.clone());
        tasks.spawn(async move {
            let report = store.reconfigure(&old, &new).await;
            (store.local().clone(), report)
        });
    }
    let mut reports = Vec::with_capacity(options.nodes);
    while let Some(joined) = tasks.join_next().await {
        let (node, report) = joined.context("reconfigure task panicked")?;
        reports.push((node, report?));
    }
    reports.sort_by(|a, b| a.0.cmp(&b.0));

    let mut summary = SimulationSummary {
        objects: keys.len(),
        reports,
        lost: Vec::new(),
        duplicated: Vec::new(),
        misplaced: Vec::new(),
    };
    for key in keys {
        let owner = sim.stores[0].owner_of(&key)?;
        let mut holders = Vec::new();
        for store in &sim.stores {
            match store.get_value(&key).await {
                Ok(_) => holders.push(store.local_id()),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }
        match holders.as_slice() {
            [] => summary.lost.push(key),
            [only] if *only == owner => {}
            [_] => summary.misplaced.push(key),
            _ => summary.duplicated.push(key),
        }
    }
    Ok(summary)
}
