//! In-process remote used by tests and offline demos

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{RemoteApi, RemoteError, RemoteResult};
use crate::auth::AuthToken;
use crate::models::{Entity, EntityId, EntityKind, EntityRef};

/// One call received by a [`MemoryRemote`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    FetchAll(EntityKind),
    Create(EntityRef),
    Update(EntityRef),
    Delete(EntityRef),
}

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<EntityKind, BTreeMap<EntityId, Entity>>,
    failures: HashMap<EntityKind, RemoteError>,
    calls: Vec<RemoteCall>,
}

/// Server stand-in holding records in memory.
///
/// Cloning shares the same state, so a test can keep a handle while the
/// engine owns another.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Put a record on the server without going through the API
    pub fn seed(&self, entity: impl Into<Entity>) {
        let entity = entity.into();
        self.lock()
            .records
            .entry(entity.kind())
            .or_default()
            .insert(entity.id(), entity);
    }

    /// Delete a record server-side (another device's delete landing)
    pub fn remove(&self, kind: EntityKind, id: &EntityId) -> Option<Entity> {
        self.lock()
            .records
            .get_mut(&kind)
            .and_then(|records| records.remove(id))
    }

    pub fn get(&self, kind: EntityKind, id: &EntityId) -> Option<Entity> {
        self.lock()
            .records
            .get(&kind)
            .and_then(|records| records.get(id).cloned())
    }

    pub fn records(&self, kind: EntityKind) -> Vec<Entity> {
        self.lock()
            .records
            .get(&kind)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Make every call touching `kind` fail with `error`
    pub fn fail_kind(&self, kind: EntityKind, error: RemoteError) {
        self.lock().failures.insert(kind, error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Calls received so far, in arrival order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, call: RemoteCall) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|recorded| **recorded == call)
            .count()
    }

    fn begin(
        &self,
        call: RemoteCall,
        kind: EntityKind,
    ) -> RemoteResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(error) = state.failures.get(&kind) {
            return Err(error.clone());
        }
        Ok(state)
    }
}

#[async_trait::async_trait]
impl RemoteApi for MemoryRemote {
    async fn fetch_all(&self, kind: EntityKind, _token: &AuthToken) -> RemoteResult<Vec<Entity>> {
        let state = self.begin(RemoteCall::FetchAll(kind), kind)?;
        Ok(state
            .records
            .get(&kind)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn create(&self, entity: &Entity, _token: &AuthToken) -> RemoteResult<()> {
        let mut state = self.begin(RemoteCall::Create(entity.entity_ref()), entity.kind())?;
        state
            .records
            .entry(entity.kind())
            .or_default()
            .insert(entity.id(), entity.clone());
        Ok(())
    }

    async fn update(&self, entity: &Entity, _token: &AuthToken) -> RemoteResult<()> {
        let mut state = self.begin(RemoteCall::Update(entity.entity_ref()), entity.kind())?;
        let records = state.records.entry(entity.kind()).or_default();
        match records.get_mut(&entity.id()) {
            Some(existing) => {
                *existing = entity.clone();
                Ok(())
            }
            None => Err(RemoteError::Rejected {
                status: 404,
                message: format!("{} not found", entity.entity_ref()),
            }),
        }
    }

    async fn delete(
        &self,
        kind: EntityKind,
        id: &EntityId,
        _token: &AuthToken,
    ) -> RemoteResult<()> {
        let mut state = self.begin(RemoteCall::Delete(EntityRef::new(kind, *id)), kind)?;
        if let Some(records) = state.records.get_mut(&kind) {
            records.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NoteItem, Project};

    fn token() -> AuthToken {
        AuthToken::new("user").unwrap()
    }

    #[tokio::test]
    async fn create_then_update_replaces_record() {
        let remote = MemoryRemote::new();
        let mut project = Project::new("Draft");
        remote.create(&project.clone().into(), &token()).await.unwrap();

        project.name = "Final".to_string();
        remote.update(&project.clone().into(), &token()).await.unwrap();

        assert_eq!(
            remote.records(EntityKind::Project),
            vec![Entity::Project(project)]
        );
    }

    #[tokio::test]
    async fn update_of_unknown_record_is_rejected() {
        let remote = MemoryRemote::new();
        let error = remote
            .update(&NoteItem::new("n", "").into(), &token())
            .await
            .unwrap_err();
        assert!(matches!(error, RemoteError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn injected_failures_are_scoped_to_one_kind() {
        let remote = MemoryRemote::new();
        remote.seed(Project::new("kept"));
        remote.fail_kind(
            EntityKind::Note,
            RemoteError::Unavailable("offline".to_string()),
        );

        assert!(remote.fetch_all(EntityKind::Note, &token()).await.is_err());
        assert_eq!(
            remote
                .fetch_all(EntityKind::Project, &token())
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(remote.calls().len(), 2);

        remote.clear_failures();
        assert!(remote.fetch_all(EntityKind::Note, &token()).await.is_ok());
    }
}
