//! The sync engine handle shared by views and the CLI

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::reconcile::{Reconciler, SyncReport};
use super::upload::{UploadCoordinator, UploadStats};
use crate::auth::{AuthToken, CredentialProvider};
use crate::config::EngineConfig;
use crate::db::{
    Database, DeleteOutcome, LocalStore, SqliteStore, SqliteTombstoneLedger, TombstoneLedger,
};
use crate::error::{Error, Result};
use crate::models::{Entity, EntityId, EntityKind, EntityRef, LastDeleteTombstone};
use crate::remote::RemoteApi;
use crate::state::SyncState;
use crate::util::now_millis;

struct EngineInner {
    config: EngineConfig,
    store: Arc<dyn LocalStore>,
    ledger: Arc<dyn TombstoneLedger>,
    credentials: Arc<dyn CredentialProvider>,
    uploads: UploadCoordinator,
    reconciler: Reconciler,
    write_gate: Arc<Mutex<()>>,
    state: watch::Sender<SyncState>,
}

/// Offline-first sync engine.
///
/// Local mutations commit synchronously and are then handed to the upload
/// queues; pulls run on tokio tasks. Cloning is cheap and shares one engine.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    /// Build an engine from its collaborators. Must be called inside a tokio
    /// runtime (the upload workers are spawned immediately).
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn LocalStore>,
        ledger: Arc<dyn TombstoneLedger>,
        remote: Arc<dyn RemoteApi>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let write_gate = Arc::new(Mutex::new(()));
        let uploads = UploadCoordinator::start(Arc::clone(&store), Arc::clone(&remote));
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            remote,
            Arc::clone(&ledger),
            config.tombstone_policy,
            Arc::clone(&write_gate),
        );
        let initial = if credentials.current_token().is_some() {
            SyncState::Synced
        } else {
            SyncState::Offline
        };
        let (state, _) = watch::channel(initial);

        tracing::debug!(
            "Sync engine started (tombstone policy: {})",
            config.tombstone_policy.as_str()
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                store,
                ledger,
                credentials,
                uploads,
                reconciler,
                write_gate,
                state,
            }),
        })
    }

    /// Engine backed by `SQLite` for both the store and the tombstone ledger
    pub fn with_database(
        config: EngineConfig,
        db: Arc<Database>,
        remote: Arc<dyn RemoteApi>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let store = Arc::new(SqliteStore::new(Arc::clone(&db)));
        let ledger = Arc::new(SqliteTombstoneLedger::new(db));
        Self::new(config, store, ledger, remote, credentials)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Read access for views
    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.inner.store
    }

    fn current_token(&self) -> Option<AuthToken> {
        self.inner.credentials.current_token()
    }

    fn write_gate(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.inner
            .write_gate
            .lock()
            .map_err(|_| Error::Database("write gate poisoned".to_string()))
    }

    /// Hand an already committed entity to its upload queue. Never blocks
    /// and never fails; signed out means nothing is sent.
    pub fn upload_entity(&self, entity: &Entity) {
        let Some(token) = self.current_token() else {
            tracing::debug!("Not signed in; {} stays local", entity.entity_ref());
            return;
        };
        self.inner.uploads.submit_upsert(entity.clone(), token);
    }

    /// Commit a new entity locally, then upload it
    pub fn insert_entity(&self, entity: &Entity) -> Result<()> {
        self.inner.store.insert(entity)?;
        self.upload_entity(entity);
        Ok(())
    }

    /// Commit a change locally, then upload it. The caller bumps `updated_at`.
    pub fn update_entity(&self, entity: &Entity) -> Result<()> {
        self.inner.store.update(entity)?;
        self.upload_entity(entity);
        Ok(())
    }

    /// Delete locally and queue the remote deletes.
    ///
    /// The tombstone is written before the row is removed, and both happen
    /// under the write gate so an in-flight pull cannot resurrect the entity.
    pub fn delete_entity(&self, kind: EntityKind, id: &EntityId) -> Result<DeleteOutcome> {
        let token = self.current_token();
        let now = now_millis();

        let outcome = {
            let _gate = self.write_gate()?;
            if self.inner.store.get(kind, id)?.is_none() {
                return Err(Error::NotFound(EntityRef::new(kind, *id).to_string()));
            }

            if let Some(token) = &token {
                self.inner.ledger.record_delete(token, now)?;
                self.inner.ledger.record_entity_delete(token, kind, id, now)?;
            }
            let outcome = self.inner.store.delete(kind, id, now)?;
            if let Some(token) = &token {
                for removed in outcome.removed.iter().skip(1) {
                    self.inner
                        .ledger
                        .record_entity_delete(token, removed.kind, &removed.id, now)?;
                }
            }
            outcome
        };

        match token {
            Some(token) => {
                for removed in &outcome.removed {
                    self.inner
                        .uploads
                        .submit_delete(removed.kind, removed.id, token.clone());
                }
                for detached in &outcome.detached {
                    self.inner
                        .uploads
                        .submit_upsert(detached.clone(), token.clone());
                }
            }
            None => tracing::info!(
                "Deleted {} locally; not signed in, so the server is not told",
                EntityRef::new(kind, *id)
            ),
        }

        Ok(outcome)
    }

    /// Pull every kind and merge it. Never fails as a whole.
    pub async fn sync_all(&self) -> SyncReport {
        self.set_state(SyncState::Syncing);
        let token = self.current_token();
        let report = self.inner.reconciler.sync_all(token.as_ref()).await;

        if let Some(token) = &token {
            // The server already dropped the root; its cascade is ours to send.
            for outcome in &report.server_removals {
                for removed in outcome.removed.iter().skip(1) {
                    self.inner
                        .uploads
                        .submit_delete(removed.kind, removed.id, token.clone());
                }
                for detached in &outcome.detached {
                    self.inner
                        .uploads
                        .submit_upsert(detached.clone(), token.clone());
                }
            }
        }

        let state = if report.is_offline() {
            SyncState::Offline
        } else if report.is_success() {
            SyncState::Synced
        } else {
            SyncState::Error
        };
        self.set_state(state);
        report
    }

    /// Run a sync on a background task
    pub fn spawn_sync(&self) -> JoinHandle<SyncReport> {
        let engine = self.clone();
        tokio::spawn(async move { engine.sync_all().await })
    }

    /// Sync every `interval` until the handle is aborted. The first run
    /// starts immediately.
    pub fn spawn_periodic_sync(&self, interval: Duration) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let report = engine.sync_all().await;
                tracing::debug!(
                    "Periodic sync: {} ok, {} failed",
                    report.succeeded.len(),
                    report.failed.len()
                );
            }
        })
    }

    /// Start periodic sync when the config asks for it
    pub fn start_background_sync(&self) -> Option<JoinHandle<()>> {
        self.inner
            .config
            .sync_interval()
            .map(|interval| self.spawn_periodic_sync(interval))
    }

    /// Wait until every queued upload has had its attempt
    pub async fn flush_uploads(&self) {
        self.inner.uploads.flush().await;
    }

    pub fn upload_stats(&self) -> UploadStats {
        self.inner.uploads.stats()
    }

    /// Close the upload queues after draining them
    pub async fn shutdown(&self) {
        self.inner.uploads.shutdown().await;
    }

    pub fn sync_state(&self) -> SyncState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    fn set_state(&self, state: SyncState) {
        self.inner.state.send_replace(state);
    }

    /// The signed-in user's last delete, if any
    pub fn last_delete(&self) -> Result<Option<LastDeleteTombstone>> {
        match self.current_token() {
            Some(token) => self.inner.ledger.last_delete(&token),
            None => Ok(None),
        }
    }
}
