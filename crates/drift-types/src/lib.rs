//! Shared types and identifiers for Drift.
//!
//! This crate defines the core types used across the Drift workspace:
//! node identity ([`NodeDescriptor`], [`NodeId`], [`ShortId`]),
//! membership snapshots ([`MembershipView`]), content addressing
//! ([`content`]), and configuration ([`GroupConfig`], [`StoreConfig`],
//! [`PlacementStrategy`]).

pub mod content;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use content::{
    canonical_json, compute_content_id, compute_content_id_of, compute_node_id, compute_short_id,
    placement_key,
};

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Errors produced when parsing identifiers or configuration values from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A node address was not of the form `host:port`.
    #[error("invalid node address {0:?}: expected host:port")]
    NodeAddress(String),

    /// A node id was not 64 hex characters.
    #[error("invalid node id {0:?}: expected 64 hex characters")]
    NodeId(String),

    /// Unknown placement strategy name.
    #[error("unknown placement strategy {0:?}: expected naive, consistent or rendezvous")]
    Placement(String),

    /// Unknown storage backend name.
    #[error("unknown storage backend {0:?}: expected memory or file")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Node identity
// ---------------------------------------------------------------------------

/// Network identity of a cluster node.
///
/// Two descriptors name the same node iff address and port match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Host name or IP address.
    pub address: String,
    /// Listening port.
    pub port: u16,
}

impl NodeDescriptor {
    /// Create a descriptor from an address and a port.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// Content-derived identifier of this node.
    pub fn node_id(&self) -> NodeId {
        compute_node_id(self)
    }

    /// Display-only prefix of [`Self::node_id`].
    pub fn short_id(&self) -> ShortId {
        compute_short_id(self)
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

impl FromStr for NodeDescriptor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ParseError::NodeAddress(s.to_string()))?;
        if address.is_empty() {
            return Err(ParseError::NodeAddress(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| ParseError::NodeAddress(s.to_string()))?;
        Ok(Self::new(address, port))
    }
}

/// Identifier for a cluster node: SHA-256 of its canonical `{address, port}`.
///
/// Ordering is byte-wise, which matches lexicographic ordering of the hex form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId([u8; 32]);

impl NodeId {
    /// Return the raw 32-byte representation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form (64 characters).
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// The first 16 hex characters interpreted as an unsigned integer.
    pub fn prefix_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.0[..8]);
        u64::from_be_bytes(bytes)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, ParseError> {
        let raw = hex.as_bytes();
        if raw.len() != 64 {
            return Err(ParseError::NodeId(hex.to_string()));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let hi = hex_nibble(raw[i * 2]).ok_or_else(|| ParseError::NodeId(hex.to_string()))?;
            let lo =
                hex_nibble(raw[i * 2 + 1]).ok_or_else(|| ParseError::NodeId(hex.to_string()))?;
            *byte = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl From<[u8; 32]> for NodeId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.short())
    }
}

impl NodeId {
    /// First 5 hex characters. Not collision-free; for logs only.
    pub fn short(&self) -> ShortId {
        let hex = self.to_string();
        ShortId(hex[..5].to_string())
    }
}

impl FromStr for NodeId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Display-only prefix of a [`NodeId`]. Never used for correctness decisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortId(String);

impl ShortId {
    /// The five hex characters.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// Immutable, ordered snapshot of the nodes belonging to a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipView {
    nodes: Vec<NodeDescriptor>,
}

impl MembershipView {
    /// Capture a view from an ordered list of descriptors.
    pub fn new(nodes: Vec<NodeDescriptor>) -> Self {
        Self { nodes }
    }

    /// The descriptors, in the order the view was captured.
    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    /// Node ids in view order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(compute_node_id).collect()
    }

    /// Look up the descriptor whose id is `id`.
    pub fn descriptor(&self, id: &NodeId) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|d| compute_node_id(d) == *id)
    }

    /// Whether `node` is part of this view.
    pub fn contains(&self, node: &NodeDescriptor) -> bool {
        self.nodes.contains(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// A new view with `node` appended (unchanged if already present).
    pub fn with_node(&self, node: NodeDescriptor) -> Self {
        let mut nodes = self.nodes.clone();
        if !nodes.contains(&node) {
            nodes.push(node);
        }
        Self { nodes }
    }

    /// A new view without `node`.
    pub fn without_node(&self, node: &NodeDescriptor) -> Self {
        Self {
            nodes: self.nodes.iter().filter(|n| *n != node).cloned().collect(),
        }
    }
}

impl FromIterator<NodeDescriptor> for MembershipView {
    fn from_iter<I: IntoIterator<Item = NodeDescriptor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which placement function maps keys to owners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementStrategy {
    /// `sorted_members[key mod N]`. Baseline only: poor locality.
    #[serde(alias = "modulo")]
    Naive,
    /// First member clockwise of the key on a u64 ring.
    #[default]
    #[serde(alias = "ring")]
    Consistent,
    /// Highest random weight over `(key, member)` scores.
    #[serde(alias = "hrw")]
    Rendezvous,
}

impl PlacementStrategy {
    /// Stable lowercase name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Consistent => "consistent",
            Self::Rendezvous => "rendezvous",
        }
    }
}

impl fmt::Display for PlacementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlacementStrategy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naive" | "modulo" => Ok(Self::Naive),
            "consistent" | "ring" => Ok(Self::Consistent),
            "rendezvous" | "hrw" => Ok(Self::Rendezvous),
            _ => Err(ParseError::Placement(s.to_string())),
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    /// In-memory storage (volatile, for testing or caching).
    #[default]
    Memory,
    /// File-based storage with one file per key.
    File,
}

impl FromStr for StoreBackendKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            _ => Err(ParseError::Backend(s.to_string())),
        }
    }
}

/// Where a group's objects live on this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Which backend to open.
    pub backend: StoreBackendKind,
    /// Root directory for file-backed stores. Each group gets `{root}/{gid}`.
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::Memory,
            root: PathBuf::from("store"),
        }
    }
}

/// Per-group tuning for placement and migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Group identifier; namespaces persistent storage.
    pub gid: String,
    /// Placement function used by reconfiguration and routing.
    pub placement: PlacementStrategy,
    /// Upper bound on in-flight migrations during one reconfiguration.
    pub max_concurrent_transfers: u16,
    /// How long a single remote transfer may take before it counts as failed.
    pub transfer_timeout_ms: u64,
}

impl GroupConfig {
    /// [`Self::transfer_timeout_ms`] as a [`Duration`].
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            gid: "all".to_string(),
            placement: PlacementStrategy::default(),
            max_concurrent_transfers: 8,
            transfer_timeout_ms: 5_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
