//! Upload coordinator: one sequential queue per entity kind.
//!
//! Jobs are fire-and-forget. Each job gets exactly one remote attempt; a
//! failure is logged and dropped, never retried and never surfaced to the
//! caller that submitted it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::auth::AuthToken;
use crate::db::LocalStore;
use crate::models::{Entity, EntityId, EntityKind, EntityRef, Event, NoteItem, Project, TaskItem};
use crate::remote::RemoteApi;

enum UploadJob {
    Upsert { entity: Entity, token: AuthToken },
    Delete { target: EntityRef, token: AuthToken },
    Flush(oneshot::Sender<()>),
}

/// Remote call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

struct Worker {
    kind: EntityKind,
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteApi>,
    counters: Arc<Counters>,
}

pub struct UploadCoordinator {
    queues: Mutex<HashMap<EntityKind, mpsc::UnboundedSender<UploadJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl UploadCoordinator {
    /// Start one worker per kind. Must be called inside a tokio runtime.
    pub fn start(store: Arc<dyn LocalStore>, remote: Arc<dyn RemoteApi>) -> Self {
        let counters = Arc::new(Counters::default());
        let mut queues = HashMap::new();
        let mut workers = Vec::new();

        for kind in EntityKind::SYNC_ORDER {
            let (sender, receiver) = mpsc::unbounded_channel();
            let worker = Worker {
                kind,
                store: Arc::clone(&store),
                remote: Arc::clone(&remote),
                counters: Arc::clone(&counters),
            };
            workers.push(tokio::spawn(worker.run(receiver)));
            queues.insert(kind, sender);
        }

        Self {
            queues: Mutex::new(queues),
            workers: Mutex::new(workers),
            counters,
        }
    }

    fn submit(&self, kind: EntityKind, job: UploadJob) -> bool {
        let queues = match self.queues.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(sender) = queues.get(&kind) else {
            tracing::warn!("Upload queue for {kind} is closed; dropping job");
            return false;
        };
        sender.send(job).is_ok()
    }

    /// Queue a create-or-update of an already committed entity
    pub fn submit_upsert(&self, entity: Entity, token: AuthToken) -> bool {
        let kind = entity.kind();
        tracing::debug!("Queued upload of {}", entity.entity_ref());
        self.submit(kind, UploadJob::Upsert { entity, token })
    }

    /// Queue a remote delete
    pub fn submit_delete(&self, kind: EntityKind, id: EntityId, token: AuthToken) -> bool {
        let target = EntityRef::new(kind, id);
        tracing::debug!("Queued delete of {target}");
        self.submit(kind, UploadJob::Delete { target, token })
    }

    pub fn upload_project(&self, project: &Project, token: AuthToken) -> bool {
        self.submit_upsert(project.clone().into(), token)
    }

    pub fn upload_event(&self, event: &Event, token: AuthToken) -> bool {
        self.submit_upsert(event.clone().into(), token)
    }

    pub fn upload_task(&self, task: &TaskItem, token: AuthToken) -> bool {
        self.submit_upsert(task.clone().into(), token)
    }

    pub fn upload_note(&self, note: &NoteItem, token: AuthToken) -> bool {
        self.submit_upsert(note.clone().into(), token)
    }

    pub fn delete_project(&self, id: EntityId, token: AuthToken) -> bool {
        self.submit_delete(EntityKind::Project, id, token)
    }

    pub fn delete_event(&self, id: EntityId, token: AuthToken) -> bool {
        self.submit_delete(EntityKind::Event, id, token)
    }

    pub fn delete_task(&self, id: EntityId, token: AuthToken) -> bool {
        self.submit_delete(EntityKind::Task, id, token)
    }

    pub fn delete_note(&self, id: EntityId, token: AuthToken) -> bool {
        self.submit_delete(EntityKind::Note, id, token)
    }

    /// Wait until every job submitted before this call has been dispatched.
    pub async fn flush(&self) {
        let mut pending = Vec::new();
        for kind in EntityKind::SYNC_ORDER {
            let (done, wait) = oneshot::channel();
            if self.submit(kind, UploadJob::Flush(done)) {
                pending.push(wait);
            }
        }
        for wait in pending {
            // A closed worker has nothing left to dispatch.
            let _ = wait.await;
        }
    }

    pub fn stats(&self) -> UploadStats {
        UploadStats {
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Close every queue and wait for the workers to drain what is queued.
    pub async fn shutdown(&self) {
        match self.queues.lock() {
            Ok(mut queues) => queues.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for worker in workers {
            if let Err(error) = worker.await {
                tracing::warn!("Upload worker ended abnormally: {error}");
            }
        }
    }
}

impl Worker {
    async fn run(self, mut receiver: mpsc::UnboundedReceiver<UploadJob>) {
        while let Some(job) = receiver.recv().await {
            match job {
                UploadJob::Upsert { entity, token } => self.upsert(&entity, &token).await,
                UploadJob::Delete { target, token } => self.delete(target, &token).await,
                UploadJob::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        tracing::debug!("Upload queue for {} closed", self.kind);
    }

    async fn upsert(&self, entity: &Entity, token: &AuthToken) {
        let target = entity.entity_ref();
        let confirmed = match self.store.is_confirmed(target.kind, &target.id) {
            Ok(confirmed) => confirmed,
            Err(error) => {
                tracing::warn!("Could not read sync state of {target}: {error}");
                false
            }
        };

        let result = if confirmed {
            self.remote.update(entity, token).await
        } else {
            self.remote.create(entity, token).await
        };

        match result {
            Ok(()) => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    "Uploaded {target} ({})",
                    if confirmed { "update" } else { "create" }
                );
                if let Err(error) = self.store.mark_confirmed(target.kind, &target.id) {
                    tracing::warn!("Could not mark {target} as confirmed: {error}");
                }
            }
            Err(error) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Upload of {target} failed: {error}");
            }
        }
    }

    async fn delete(&self, target: EntityRef, token: &AuthToken) {
        match self.remote.delete(target.kind, &target.id, token).await {
            Ok(()) => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Deleted {target} remotely");
            }
            Err(error) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Remote delete of {target} failed: {error}");
            }
        }
    }
}
