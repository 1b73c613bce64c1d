//! Membership-driven rebalancing.
//!
//! A pass lists the local keys once, plans which of them this node must hand
//! off, then migrates each planned key on its own task. At most
//! `max_concurrent_transfers` migrations are in flight at any time.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use drift_placement::{PlacementError, diff};
use drift_store::StorageBackend;
use drift_types::{MembershipView, NodeDescriptor, NodeId, placement_key};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::GroupError;
use crate::report::{MigrationReport, NotMigrated};
use crate::store::GroupStore;
use crate::transport::Transport;

/// Keys this node must hand off, with their new owners.
struct Plan {
    moves: Vec<(String, NodeDescriptor)>,
    skipped: usize,
}

impl GroupStore {
    /// Move every local key this node no longer owns to its owner under `new`.
    ///
    /// `new` becomes the store's view before any key moves. Keys whose
    /// transfer fails stay here and are listed in the report; the call itself
    /// only fails on an empty view, a malformed key id, or a backend error
    /// while listing.
    pub async fn reconfigure(
        self: &Arc<Self>,
        old: &MembershipView,
        new: &MembershipView,
    ) -> Result<MigrationReport, GroupError> {
        self.reconfigure_until(old, new, std::future::pending::<()>())
            .await
    }

    /// [`Self::reconfigure`], stopped early when `cancel` resolves.
    ///
    /// In-flight migrations are aborted. Keys that completed stay migrated;
    /// the rest are reported as not migrated and the report is marked
    /// cancelled.
    #[tracing::instrument(
        skip_all,
        fields(node = %self.local(), old = old.len(), new = new.len())
    )]
    pub async fn reconfigure_until<F>(
        self: &Arc<Self>,
        old: &MembershipView,
        new: &MembershipView,
        cancel: F,
    ) -> Result<MigrationReport, GroupError>
    where
        F: Future<Output = ()> + Send,
    {
        if old.is_empty() || new.is_empty() {
            return Err(PlacementError::InvalidMembership.into());
        }
        let plan = self.plan(old, new).await?;
        self.set_view(new.clone());
        let mut report = MigrationReport {
            skipped: plan.skipped,
            ..Default::default()
        };
        if plan.moves.is_empty() {
            info!(skipped = report.skipped, "nothing to migrate");
            return Ok(report);
        }
        info!(
            planned = plan.moves.len(),
            skipped = report.skipped,
            "migration started"
        );

        let permits = Arc::new(Semaphore::new(
            usize::from(self.config().max_concurrent_transfers).max(1),
        ));
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<String, NodeId> = HashMap::with_capacity(plan.moves.len());

        for (key, destination) in plan.moves {
            pending.insert(key.clone(), destination.node_id());
            let store = Arc::clone(self);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => store.migrate_key(&key, &destination).await,
                    Err(_) => Err(GroupError::TransferFailed {
                        key: key.clone(),
                        node: destination.node_id(),
                        reason: "migration aborted".to_string(),
                    }),
                };
                (key, outcome)
            });
        }

        tokio::pin!(cancel);
        let mut cancelled = false;
        loop {
            tokio::select! {
                biased;
                () = &mut cancel, if !cancelled => {
                    warn!(outstanding = pending.len(), "reconfiguration cancelled");
                    cancelled = true;
                    tasks.abort_all();
                }
                joined = tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    let (key, outcome) = match joined {
                        Ok(done) => done,
                        Err(e) => {
                            if !e.is_cancelled() {
                                warn!(error = %e, "migration task failed");
                            }
                            continue;
                        }
                    };
                    let Some(destination) = pending.remove(&key) else { continue };
                    match outcome {
                        Ok(true) => report.migrated.push(key),
                        Ok(false) => report.skipped += 1,
                        Err(e) => {
                            warn!(%key, to = %destination.short(), error = %e, "key left in place");
                            let reason = match e {
                                GroupError::TransferFailed { reason, .. } => reason,
                                other => other.to_string(),
                            };
                            report.not_migrated.push(NotMigrated { key, destination, reason });
                        }
                    }
                }
            }
        }

        let leftover_reason = if cancelled {
            "reconfiguration cancelled"
        } else {
            "migration task failed"
        };
        report
            .not_migrated
            .extend(pending.into_iter().map(|(key, destination)| NotMigrated {
                key,
                destination,
                reason: leftover_reason.to_string(),
            }));
        report.cancelled = cancelled;
        report.migrated.sort();
        report.not_migrated.sort_by(|a, b| a.key.cmp(&b.key));

        info!(
            migrated = report.migrated.len(),
            not_migrated = report.not_migrated.len(),
            skipped = report.skipped,
            cancelled,
            "migration finished"
        );
        Ok(report)
    }

    /// Snapshot the local keys and pick the ones that leave this node.
    async fn plan(&self, old: &MembershipView, new: &MembershipView) -> Result<Plan, GroupError> {
        let keys = self.backend.list().await?;
        let mut by_key_id: HashMap<String, String> = keys
            .iter()
            .map(|key| (placement_key(key), key.clone()))
            .collect();
        let key_ids: Vec<String> = by_key_id.keys().cloned().collect();

        let moves = diff(
            &self.config().placement,
            &old.node_ids(),
            &new.node_ids(),
            &key_ids,
        )?;

        let local_id = self.local_id();
        let mut planned = Vec::new();
        for m in moves {
            if m.from != local_id {
                continue;
            }
            let (Some(key), Some(destination)) = (by_key_id.remove(&m.key_id), new.descriptor(&m.to))
            else {
                continue;
            };
            planned.push((key, destination.clone()));
        }

        debug!(listed = keys.len(), planned = planned.len(), "migration planned");
        Ok(Plan {
            skipped: keys.len() - planned.len(),
            moves: planned,
        })
    }

    /// Fetch, transfer and delete one key under its lock.
    ///
    /// Returns `Ok(false)` when the key disappeared before its turn.
    async fn migrate_key(&self, key: &str, destination: &NodeDescriptor) -> Result<bool, GroupError> {
        let _guard = self.locks.lock(key).await;

        let Some(value) = self.backend.get(key).await? else {
            debug!(%key, "key vanished before migration");
            return Ok(false);
        };

        let failed = |reason: String| GroupError::TransferFailed {
            key: key.to_string(),
            node: destination.node_id(),
            reason,
        };
        match tokio::time::timeout(
            self.config().transfer_timeout(),
            self.transport.send_to(destination, key, value),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(failed(e.to_string())),
            Err(_) => {
                return Err(failed(format!(
                    "no acknowledgement within {:?}",
                    self.config().transfer_timeout()
                )));
            }
        }

        self.backend.delete(key).await?;
        debug!(%key, to = %destination, "migrated");
        Ok(true)
    }
}
