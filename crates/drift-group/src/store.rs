//! Group-scoped CRUD.

use std::sync::{Arc, RwLock};

use drift_placement::Placement;
use drift_store::StorageBackend;
use drift_types::{
    GroupConfig, MembershipView, NodeDescriptor, NodeId, compute_content_id, placement_key,
};
use serde_json::Value;
use tracing::debug;

use crate::error::GroupError;
use crate::locks::KeyLocks;
use crate::transport::Transport;

/// Result of [`GroupStore::get`].
#[derive(Debug, Clone, PartialEq)]
pub enum GetResult {
    /// The value stored under the requested key.
    Value(Value),
    /// Every key held locally, when no key was given.
    Keys(Vec<String>),
}

/// One node's share of a group: a local backend plus the group's current view.
pub struct GroupStore {
    local: NodeDescriptor,
    local_id: NodeId,
    config: GroupConfig,
    pub(crate) backend: Arc<dyn StorageBackend>,
    pub(crate) transport: Arc<dyn Transport>,
    view: RwLock<MembershipView>,
    pub(crate) locks: KeyLocks,
}

impl GroupStore {
    pub fn new(
        local: NodeDescriptor,
        view: MembershipView,
        config: GroupConfig,
        backend: Arc<dyn StorageBackend>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        let local_id = local.node_id();
        debug!(node = %local, id = %local_id.short(), gid = %config.gid, "group store created");
        Arc::new(Self {
            local,
            local_id,
            config,
            backend,
            transport,
            view: RwLock::new(view),
            locks: KeyLocks::new(),
        })
    }

    /// Store `value` under `key`, or under its content id when `key` is `None`.
    ///
    /// Returns the value unchanged.
    pub async fn put(&self, value: Value, key: Option<&str>) -> Result<Value, GroupError> {
        let (_, value) = self.put_with_key(value, key).await?;
        Ok(value)
    }

    /// Like [`Self::put`], but also returns the key actually used.
    pub async fn put_with_key(
        &self,
        value: Value,
        key: Option<&str>,
    ) -> Result<(String, Value), GroupError> {
        let key = match key {
            Some(k) => k.to_string(),
            None => compute_content_id(&value),
        };
        let _guard = self.locks.lock(&key).await;
        self.backend.put(&key, value.clone()).await?;
        debug!(%key, node = %self.local, "put");
        Ok((key, value))
    }

    /// Fetch one value, or list every local key when `key` is `None`.
    pub async fn get(&self, key: Option<&str>) -> Result<GetResult, GroupError> {
        match key {
            Some(key) => self.get_value(key).await.map(GetResult::Value),
            None => self.keys().await.map(GetResult::Keys),
        }
    }

    pub async fn get_value(&self, key: &str) -> Result<Value, GroupError> {
        let _guard = self.locks.lock(key).await;
        self.backend
            .get(key)
            .await?
            .ok_or_else(|| GroupError::KeyNotFound(key.to_string()))
    }

    /// Every key held locally, in no particular order.
    pub async fn keys(&self) -> Result<Vec<String>, GroupError> {
        Ok(self.backend.list().await?)
    }

    /// Remove `key` and return the value it held.
    pub async fn del(&self, key: &str) -> Result<Value, GroupError> {
        let _guard = self.locks.lock(key).await;
        let previous = self
            .backend
            .delete(key)
            .await?
            .ok_or_else(|| GroupError::KeyNotFound(key.to_string()))?;
        debug!(%key, node = %self.local, "deleted");
        Ok(previous)
    }

    /// The node that owns `key` under the current view.
    pub fn owner_of(&self, key: &str) -> Result<NodeId, GroupError> {
        let members = self.view().node_ids();
        Ok(self.config.placement.place(&placement_key(key), &members)?)
    }

    /// Snapshot of the current membership view.
    pub fn view(&self) -> MembershipView {
        self.view.read().expect("lock poisoned").clone()
    }

    pub fn set_view(&self, view: MembershipView) {
        *self.view.write().expect("lock poisoned") = view;
    }

    pub fn local(&self) -> &NodeDescriptor {
        &self.local
    }

    pub fn local_id(&self) -> NodeId {
        self.local_id
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    pub fn locks(&self) -> &KeyLocks {
        &self.locks
    }
}
