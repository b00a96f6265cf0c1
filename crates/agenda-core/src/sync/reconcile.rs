//! Download and reconcile: full-state pulls merged into the local store

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthToken;
use crate::config::TombstonePolicy;
use crate::db::{DanglingLink, DeleteOutcome, LocalStore, MergeOutcome, TombstoneLedger};
use crate::models::{Entity, EntityId, EntityKind};
use crate::remote::{RemoteApi, RemoteError};
use crate::util::now_millis;

/// Why one kind failed to sync
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Not signed in")]
    Unauthenticated,
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("Local store error: {0}")]
    Local(String),
}

impl From<crate::Error> for SyncError {
    fn from(error: crate::Error) -> Self {
        Self::Local(error.to_string())
    }
}

/// Counters for one successfully merged kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub kind: EntityKind,
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub skipped_stale: usize,
    pub conflicts: usize,
    pub pruned_tombstones: usize,
}

impl KindSummary {
    const fn empty(kind: EntityKind) -> Self {
        Self {
            kind,
            fetched: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            removed: 0,
            skipped_stale: 0,
            conflicts: 0,
            pruned_tombstones: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindFailure {
    pub kind: EntityKind,
    #[serde(serialize_with = "serialize_error")]
    pub error: SyncError,
}

fn serialize_error<S: serde::Serializer>(
    error: &SyncError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingLinkReport {
    pub child: String,
    pub parent: String,
}

/// Outcome of one `sync_all` run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub started_at: i64,
    pub finished_at: i64,
    pub succeeded: Vec<KindSummary>,
    pub failed: Vec<KindFailure>,
    #[serde(skip)]
    pub dangling_links: Vec<DanglingLink>,
    /// Rows removed because the server no longer has them, with their
    /// cascade. Detached children still need uploading.
    #[serde(skip)]
    pub server_removals: Vec<DeleteOutcome>,
}

impl SyncReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn succeeded_kinds(&self) -> Vec<EntityKind> {
        self.succeeded.iter().map(|summary| summary.kind).collect()
    }

    pub fn failed_kinds(&self) -> Vec<EntityKind> {
        self.failed.iter().map(|failure| failure.kind).collect()
    }

    pub fn summary(&self, kind: EntityKind) -> Option<&KindSummary> {
        self.succeeded.iter().find(|summary| summary.kind == kind)
    }

    /// True when nothing could reach the server (signed out or offline)
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.succeeded.is_empty()
            && !self.failed.is_empty()
            && self.failed.iter().all(|failure| {
                matches!(
                    failure.error,
                    SyncError::Unauthenticated | SyncError::Remote(RemoteError::Unavailable(_))
                )
            })
    }

    pub fn dangling_link_reports(&self) -> Vec<DanglingLinkReport> {
        self.dangling_links
            .iter()
            .map(|link| DanglingLinkReport {
                child: link.child.to_string(),
                parent: link.parent.to_string(),
            })
            .collect()
    }
}

/// Pulls every kind from the remote and merges it under last-writer-wins,
/// filtered by the tombstone ledger.
pub struct Reconciler {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteApi>,
    ledger: Arc<dyn TombstoneLedger>,
    policy: TombstonePolicy,
    write_gate: Arc<Mutex<()>>,
    sync_gate: tokio::sync::Mutex<()>,
}

impl Reconciler {
    /// `write_gate` must be the same gate the delete path holds while it
    /// records a tombstone and removes the row.
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteApi>,
        ledger: Arc<dyn TombstoneLedger>,
        policy: TombstonePolicy,
        write_gate: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            store,
            remote,
            ledger,
            policy,
            write_gate,
            sync_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Pull and merge every kind, parents first. Overlapping calls run one
    /// after another. Never fails as a whole; see [`SyncReport::failed`].
    pub async fn sync_all(&self, token: Option<&AuthToken>) -> SyncReport {
        let _running = self.sync_gate.lock().await;
        let mut report = SyncReport {
            started_at: now_millis(),
            ..SyncReport::default()
        };

        let Some(token) = token else {
            tracing::warn!("Sync skipped: not signed in");
            report.failed = EntityKind::SYNC_ORDER
                .into_iter()
                .map(|kind| KindFailure {
                    kind,
                    error: SyncError::Unauthenticated,
                })
                .collect();
            report.finished_at = now_millis();
            return report;
        };

        for kind in EntityKind::SYNC_ORDER {
            match self.sync_kind(kind, token, &mut report.server_removals).await {
                Ok(summary) => {
                    tracing::debug!(
                        "Merged {} {kind} records: {} inserted, {} updated, {} removed, {} stale, {} conflicts",
                        summary.fetched,
                        summary.inserted,
                        summary.updated,
                        summary.removed,
                        summary.skipped_stale,
                        summary.conflicts
                    );
                    report.succeeded.push(summary);
                }
                Err(error) => {
                    tracing::warn!("Sync of {kind} failed: {error}");
                    report.failed.push(KindFailure { kind, error });
                }
            }
        }

        report.dangling_links = match self.store.dangling_links() {
            Ok(links) => links,
            Err(error) => {
                tracing::warn!("Could not resolve relationship links: {error}");
                Vec::new()
            }
        };
        for link in &report.dangling_links {
            tracing::warn!("Dangling link: {} -> {}", link.child, link.parent);
        }

        report.finished_at = now_millis();
        tracing::info!(
            "Sync finished: {} kinds succeeded, {} failed, {} dangling links",
            report.succeeded.len(),
            report.failed.len(),
            report.dangling_links.len()
        );
        report
    }

    async fn sync_kind(
        &self,
        kind: EntityKind,
        token: &AuthToken,
        removals: &mut Vec<DeleteOutcome>,
    ) -> Result<KindSummary, SyncError> {
        // Taken before the request: an upload confirmed while the fetch is in
        // flight may be missing from the snapshot without being deleted.
        let confirmed_before = self.store.confirmed_ids(kind)?;
        let records = self.remote.fetch_all(kind, token).await?;
        self.merge_kind(kind, &records, &confirmed_before, token, removals)
    }

    fn merge_kind(
        &self,
        kind: EntityKind,
        records: &[Entity],
        confirmed_before: &HashSet<EntityId>,
        token: &AuthToken,
        removals: &mut Vec<DeleteOutcome>,
    ) -> Result<KindSummary, SyncError> {
        let mut summary = KindSummary::empty(kind);
        summary.fetched = records.len();
        let remote_ids: HashSet<EntityId> = records.iter().map(Entity::id).collect();
        let resolved_at = now_millis();

        // Held for the whole merge so a delete cannot land between the
        // staleness check and the write.
        let _gate = self
            .write_gate
            .lock()
            .map_err(|_| SyncError::Local("write gate poisoned".to_string()))?;

        for record in records {
            if record.kind() != kind {
                tracing::warn!(
                    "Ignoring {} returned from the {kind} collection",
                    record.entity_ref()
                );
                continue;
            }
            if self.is_stale(token, record)? {
                tracing::debug!("Skipping stale {}", record.entity_ref());
                summary.skipped_stale += 1;
                continue;
            }
            match self.store.apply_remote(record, resolved_at)? {
                MergeOutcome::Inserted => summary.inserted += 1,
                MergeOutcome::Updated => summary.updated += 1,
                MergeOutcome::Unchanged => summary.unchanged += 1,
                MergeOutcome::KeptLocal { local_updated_at } => {
                    tracing::debug!(
                        "Kept local {} ({local_updated_at} > {})",
                        record.entity_ref(),
                        record.updated_at()
                    );
                    summary.conflicts += 1;
                }
            }
        }

        let mut gone: Vec<EntityId> = confirmed_before
            .iter()
            .filter(|id| !remote_ids.contains(id))
            .copied()
            .collect();
        gone.sort();
        for id in gone {
            let Some(outcome) = self.store.remove_confirmed(kind, &id, resolved_at)? else {
                continue;
            };
            tracing::debug!("Removed {kind}:{id} deleted on the server");
            summary.removed += 1;
            // Cascaded children may still be on the server until their
            // delete lands; keep later pulls from bringing them back.
            for child in outcome.removed.iter().skip(1) {
                self.ledger
                    .record_entity_delete(token, child.kind, &child.id, resolved_at)?;
            }
            removals.push(outcome);
        }

        summary.pruned_tombstones = self
            .ledger
            .prune_entity_tombstones(token, kind, &remote_ids)?;
        Ok(summary)
    }

    fn is_stale(&self, token: &AuthToken, record: &Entity) -> Result<bool, SyncError> {
        let stale = match self.policy {
            TombstonePolicy::UserScoped => {
                self.ledger.is_stale(token, record.updated_at())?
                    || self.ledger.is_entity_stale(
                        token,
                        record.kind(),
                        &record.id(),
                        record.updated_at(),
                    )?
            }
            TombstonePolicy::PerEntity => self.ledger.is_entity_stale(
                token,
                record.kind(),
                &record.id(),
                record.updated_at(),
            )?,
        };
        Ok(stale)
    }
}
