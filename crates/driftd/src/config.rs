//! TOML configuration for the Drift daemon.
//!
//! Every section is optional; [`CliConfig::load`] with no path yields the
//! defaults below.

use std::path::{Path, PathBuf};

use anyhow::Context;
use drift_types::{
    GroupConfig, MembershipView, NodeDescriptor, PlacementStrategy, StoreBackendKind, StoreConfig,
};
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Local node identity and data location.
    pub node: NodeSection,
    /// Group membership and placement.
    pub group: GroupSection,
    /// Object storage backend.
    pub storage: StorageSection,
    /// Rebalancing tuning.
    pub reconfigure: ReconfigureSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[node]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Address other nodes use to reach this one.
    pub address: String,
    pub port: u16,
    /// Directory for persistent data (file-backed stores).
    pub data_dir: PathBuf,
}

impl Default for NodeSection {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".drift"))
            .unwrap_or_else(|| PathBuf::from(".drift"));
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
            data_dir,
        }
    }
}

/// `[group]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GroupSection {
    /// Group identifier.
    pub gid: String,
    /// Members as `"host:port"`. The local node is used alone when empty.
    pub members: Vec<String>,
    /// `"naive"`, `"consistent"` or `"rendezvous"`.
    pub placement: PlacementStrategy,
}

impl Default for GroupSection {
    fn default() -> Self {
        Self {
            gid: GroupConfig::default().gid,
            members: Vec::new(),
            placement: PlacementStrategy::default(),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// `"memory"` (default) or `"file"`.
    pub backend: StoreBackendKind,
}

/// `[reconfigure]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReconfigureSection {
    /// Number of keys migrated in parallel.
    pub concurrent_transfers: Option<u16>,
    /// Per-transfer acknowledgement deadline in milliseconds.
    pub transfer_timeout_ms: Option<u64>,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read {}", p.display()))?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// This node's descriptor.
    pub fn local_node(&self) -> NodeDescriptor {
        NodeDescriptor::new(self.node.address.clone(), self.node.port)
    }

    /// The configured membership view.
    pub fn membership(&self) -> anyhow::Result<MembershipView> {
        if self.group.members.is_empty() {
            return Ok(MembershipView::new(vec![self.local_node()]));
        }
        self.group
            .members
            .iter()
            .map(|m| {
                m.parse::<NodeDescriptor>()
                    .with_context(|| format!("invalid group member {m:?}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .map(MembershipView::new)
    }

    /// Effective group tuning, defaults filled in.
    pub fn group_config(&self) -> GroupConfig {
        let defaults = GroupConfig::default();
        GroupConfig {
            gid: self.group.gid.clone(),
            placement: self.group.placement,
            max_concurrent_transfers: self
                .reconfigure
                .concurrent_transfers
                .unwrap_or(defaults.max_concurrent_transfers),
            transfer_timeout_ms: self
                .reconfigure
                .transfer_timeout_ms
                .unwrap_or(defaults.transfer_timeout_ms),
        }
    }

    /// Backend settings; file stores live under `{data_dir}/store`.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            backend: self.storage.backend,
            root: self.node.data_dir.join("store"),
        }
    }
}
