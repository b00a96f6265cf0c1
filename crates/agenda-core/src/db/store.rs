//! Local store: the UI's source of truth

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::rows::{
    id_value, insert_row, select_all, select_one, select_where, table_for, update_row, TableRow,
};
use super::Database;
use crate::error::{Error, Result};
use crate::models::{
    Entity, EntityId, EntityKind, EntityRef, Event, NoteItem, Project, SyncConflict, TaskItem,
};

const LWW_STRATEGY: &str = "lww";

/// Result of a local delete, including the cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Every entity removed, the target first
    pub removed: Vec<EntityRef>,
    /// Entities whose link to the removed target was cleared (already saved
    /// with a bumped `updated_at`)
    pub detached: Vec<Entity>,
}

/// What happened when a pulled record was merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Unchanged,
    /// Local row is newer; the incoming record was dropped and logged
    KeptLocal { local_updated_at: i64 },
}

/// A child pointing at a parent that is not in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DanglingLink {
    pub child: EntityRef,
    pub parent: EntityRef,
}

/// One stored entity plus its sync flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub entity: Entity,
    pub confirmed: bool,
}

/// Every stored entity in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub rows: Vec<SnapshotRow>,
}

impl StoreSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Persistence capability consumed by the sync engine and the views.
///
/// All calls are synchronous and expected to be fast.
pub trait LocalStore: Send + Sync {
    /// Insert a new entity (not yet known to the server)
    fn insert(&self, entity: &Entity) -> Result<()>;

    /// Overwrite an existing entity
    fn update(&self, entity: &Entity) -> Result<()>;

    /// Delete an entity. Deleting an event removes its tasks and detaches
    /// its notes; deleting a project detaches its events and notes.
    fn delete(&self, kind: EntityKind, id: &EntityId, now: i64) -> Result<DeleteOutcome>;

    fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>>;

    /// All entities of a kind, oldest first
    fn fetch(&self, kind: EntityKind) -> Result<Vec<Entity>>;

    /// Ids of a kind starting with `prefix`
    fn find_ids_by_prefix(
        &self,
        kind: EntityKind,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<EntityId>>;

    fn events_of_project(&self, project_id: &EntityId) -> Result<Vec<Event>>;
    fn tasks_of_event(&self, event_id: &EntityId) -> Result<Vec<TaskItem>>;
    fn notes_of_project(&self, project_id: &EntityId) -> Result<Vec<NoteItem>>;
    fn notes_of_event(&self, event_id: &EntityId) -> Result<Vec<NoteItem>>;

    /// Merge one pulled record using last-writer-wins on `updated_at`.
    /// The merged row is marked as confirmed by the server.
    fn apply_remote(&self, entity: &Entity, resolved_at: i64) -> Result<MergeOutcome>;

    /// Remove a row the server no longer has, with the same cascade as
    /// [`LocalStore::delete`]. Rows never confirmed by the server are left
    /// alone and yield `None`.
    fn remove_confirmed(
        &self,
        kind: EntityKind,
        id: &EntityId,
        now: i64,
    ) -> Result<Option<DeleteOutcome>>;

    fn confirmed_ids(&self, kind: EntityKind) -> Result<HashSet<EntityId>>;
    fn is_confirmed(&self, kind: EntityKind, id: &EntityId) -> Result<bool>;
    fn mark_confirmed(&self, kind: EntityKind, id: &EntityId) -> Result<()>;

    /// Parent links that point at ids missing from the store
    fn dangling_links(&self) -> Result<Vec<DanglingLink>>;

    /// Recently resolved conflicts, newest first
    fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>>;

    fn snapshot(&self) -> Result<StoreSnapshot>;
}

/// `SQLite` implementation of [`LocalStore`]
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Open a store backed by a fresh in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Arc::new(Database::open_in_memory()?)))
    }
}

fn insert_entity(conn: &Connection, entity: &Entity, confirmed: bool) -> Result<()> {
    match entity {
        Entity::Project(project) => insert_row(conn, project, confirmed),
        Entity::Event(event) => insert_row(conn, event, confirmed),
        Entity::Task(task) => insert_row(conn, task, confirmed),
        Entity::Note(note) => insert_row(conn, note, confirmed),
    }
}

fn update_entity(conn: &Connection, entity: &Entity, confirm: bool) -> Result<usize> {
    match entity {
        Entity::Project(project) => update_row(conn, project, confirm),
        Entity::Event(event) => update_row(conn, event, confirm),
        Entity::Task(task) => update_row(conn, task, confirm),
        Entity::Note(note) => update_row(conn, note, confirm),
    }
}

fn get_entity(conn: &Connection, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>> {
    Ok(match kind {
        EntityKind::Project => select_one::<Project>(conn, id)?.map(Entity::from),
        EntityKind::Event => select_one::<Event>(conn, id)?.map(Entity::from),
        EntityKind::Task => select_one::<TaskItem>(conn, id)?.map(Entity::from),
        EntityKind::Note => select_one::<NoteItem>(conn, id)?.map(Entity::from),
    })
}

fn fetch_kind(conn: &Connection, kind: EntityKind) -> Result<Vec<Entity>> {
    fn wrap<T: TableRow + Into<Entity>>(rows: Vec<T>) -> Vec<Entity> {
        rows.into_iter().map(Into::into).collect()
    }

    Ok(match kind {
        EntityKind::Project => wrap(select_all::<Project>(conn)?),
        EntityKind::Event => wrap(select_all::<Event>(conn)?),
        EntityKind::Task => wrap(select_all::<TaskItem>(conn)?),
        EntityKind::Note => wrap(select_all::<NoteItem>(conn)?),
    })
}

fn is_confirmed_in(conn: &Connection, kind: EntityKind, id: &EntityId) -> Result<bool> {
    let sql = format!("SELECT confirmed FROM {} WHERE id = ?1", table_for(kind));
    let confirmed: Option<i64> = conn
        .query_row(&sql, [id.as_str()], |row| row.get(0))
        .optional()?;
    Ok(confirmed.unwrap_or(0) != 0)
}

/// Clear `column` on every row of `T` pointing at `parent`, bump their
/// `updated_at`, and return the updated rows.
fn detach_children<T: TableRow + Into<Entity>>(
    conn: &Connection,
    column: &str,
    parent: &EntityId,
    now: i64,
) -> Result<Vec<Entity>> {
    let filter = format!("WHERE {column} = ?1");
    let children = select_where::<T>(conn, &filter, &[id_value(*parent)])?;
    if children.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "UPDATE {} SET {column} = NULL, updated_at = MAX(updated_at, ?2) WHERE {column} = ?1",
        T::TABLE
    );
    conn.execute(&sql, params![parent.as_str(), now])?;

    children
        .iter()
        .map(|child| {
            select_one::<T>(conn, &child.id())?
                .map(Into::into)
                .ok_or_else(|| Error::NotFound(format!("{}:{}", T::KIND, child.id())))
        })
        .collect()
}

fn delete_row(conn: &Connection, kind: EntityKind, id: &EntityId) -> Result<usize> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", table_for(kind));
    Ok(conn.execute(&sql, [id.as_str()])?)
}

/// Apply what removing `kind:id` implies for its children: an event takes
/// its tasks with it and lets go of its notes, a project lets go of its
/// events and notes.
fn cascade_from(
    conn: &Connection,
    kind: EntityKind,
    id: &EntityId,
    now: i64,
    outcome: &mut DeleteOutcome,
) -> Result<()> {
    match kind {
        EntityKind::Project => {
            outcome
                .detached
                .extend(detach_children::<Event>(conn, "project_id", id, now)?);
            outcome
                .detached
                .extend(detach_children::<NoteItem>(conn, "project_id", id, now)?);
        }
        EntityKind::Event => {
            let tasks = select_where::<TaskItem>(conn, "WHERE event_id = ?1", &[id_value(*id)])?;
            for task in tasks {
                delete_row(conn, EntityKind::Task, &task.id)?;
                outcome
                    .removed
                    .push(EntityRef::new(EntityKind::Task, task.id));
            }
            outcome
                .detached
                .extend(detach_children::<NoteItem>(conn, "event_id", id, now)?);
        }
        EntityKind::Task | EntityKind::Note => {}
    }
    Ok(())
}

fn record_conflict(
    conn: &Connection,
    entity: &Entity,
    local_updated_at: i64,
    resolved_at: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO sync_conflicts (
            kind, entity_id, local_updated_at, incoming_updated_at, resolved_at, strategy
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entity.kind().as_str(),
            entity.id().as_str(),
            local_updated_at,
            entity.updated_at(),
            resolved_at,
            LWW_STRATEGY
        ],
    )?;
    Ok(())
}

fn parse_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncConflict> {
    let kind: String = row.get(1)?;
    Ok(SyncConflict {
        id: row.get(0)?,
        kind: kind.parse().map_err(|error: String| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                error.into(),
            )
        })?,
        entity_id: row.get(2)?,
        local_updated_at: row.get(3)?,
        incoming_updated_at: row.get(4)?,
        resolved_at: row.get(5)?,
        strategy: row.get(6)?,
    })
}

impl LocalStore for SqliteStore {
    fn insert(&self, entity: &Entity) -> Result<()> {
        self.db
            .with_connection(|conn| insert_entity(conn, entity, false))
    }

    fn update(&self, entity: &Entity) -> Result<()> {
        self.db.with_connection(|conn| {
            if update_entity(conn, entity, false)? == 0 {
                return Err(Error::NotFound(entity.entity_ref().to_string()));
            }
            Ok(())
        })
    }

    fn delete(&self, kind: EntityKind, id: &EntityId, now: i64) -> Result<DeleteOutcome> {
        self.db.with_connection(|conn| {
            let tx = conn.transaction()?;
            let mut outcome = DeleteOutcome::default();

            if delete_row(&tx, kind, id)? == 0 {
                return Err(Error::NotFound(EntityRef::new(kind, *id).to_string()));
            }
            outcome.removed.push(EntityRef::new(kind, *id));

            cascade_from(&tx, kind, id, now, &mut outcome)?;

            tx.commit()?;
            Ok(outcome)
        })
    }

    fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>> {
        self.db.with_connection(|conn| get_entity(conn, kind, id))
    }

    fn fetch(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        self.db.with_connection(|conn| fetch_kind(conn, kind))
    }

    fn find_ids_by_prefix(
        &self,
        kind: EntityKind,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<EntityId>> {
        let pattern = format!("{}%", prefix.replace(['%', '_'], ""));
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db.with_connection(|conn| {
            let sql = format!(
                "SELECT id FROM {} WHERE id LIKE ?1 ORDER BY id LIMIT ?2",
                table_for(kind)
            );
            let mut stmt = conn.prepare(&sql)?;
            let ids = stmt
                .query_map(params![pattern, limit], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids.into_iter()
                .map(|id| {
                    id.parse::<EntityId>()
                        .map_err(|_| Error::Database(format!("invalid stored id '{id}'")))
                })
                .collect()
        })
    }

    fn events_of_project(&self, project_id: &EntityId) -> Result<Vec<Event>> {
        self.db.with_connection(|conn| {
            select_where(conn, "WHERE project_id = ?1", &[id_value(*project_id)])
        })
    }

    fn tasks_of_event(&self, event_id: &EntityId) -> Result<Vec<TaskItem>> {
        self.db.with_connection(|conn| {
            select_where(conn, "WHERE event_id = ?1", &[id_value(*event_id)])
        })
    }

    fn notes_of_project(&self, project_id: &EntityId) -> Result<Vec<NoteItem>> {
        self.db.with_connection(|conn| {
            select_where(conn, "WHERE project_id = ?1", &[id_value(*project_id)])
        })
    }

    fn notes_of_event(&self, event_id: &EntityId) -> Result<Vec<NoteItem>> {
        self.db.with_connection(|conn| {
            select_where(conn, "WHERE event_id = ?1", &[id_value(*event_id)])
        })
    }

    fn apply_remote(&self, entity: &Entity, resolved_at: i64) -> Result<MergeOutcome> {
        self.db.with_connection(|conn| {
            let tx = conn.transaction()?;
            let outcome = match get_entity(&tx, entity.kind(), &entity.id())? {
                None => {
                    insert_entity(&tx, entity, true)?;
                    MergeOutcome::Inserted
                }
                Some(local) if entity.updated_at() > local.updated_at() => {
                    update_entity(&tx, entity, true)?;
                    MergeOutcome::Updated
                }
                Some(local) if entity.updated_at() == local.updated_at() => {
                    let sql = format!(
                        "UPDATE {} SET confirmed = 1 WHERE id = ?1 AND confirmed = 0",
                        table_for(entity.kind())
                    );
                    tx.execute(&sql, [entity.id().as_str()])?;
                    MergeOutcome::Unchanged
                }
                Some(local) => {
                    record_conflict(&tx, entity, local.updated_at(), resolved_at)?;
                    MergeOutcome::KeptLocal {
                        local_updated_at: local.updated_at(),
                    }
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
    }

    fn remove_confirmed(
        &self,
        kind: EntityKind,
        id: &EntityId,
        now: i64,
    ) -> Result<Option<DeleteOutcome>> {
        self.db.with_connection(|conn| {
            let tx = conn.transaction()?;
            let sql = format!(
                "DELETE FROM {} WHERE id = ?1 AND confirmed = 1",
                table_for(kind)
            );
            if tx.execute(&sql, [id.as_str()])? == 0 {
                return Ok(None);
            }

            let mut outcome = DeleteOutcome::default();
            outcome.removed.push(EntityRef::new(kind, *id));
            cascade_from(&tx, kind, id, now, &mut outcome)?;

            tx.commit()?;
            Ok(Some(outcome))
        })
    }

    fn confirmed_ids(&self, kind: EntityKind) -> Result<HashSet<EntityId>> {
        self.db.with_connection(|conn| {
            let sql = format!("SELECT id FROM {} WHERE confirmed = 1", table_for(kind));
            let mut stmt = conn.prepare(&sql)?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids.iter().filter_map(|id| id.parse::<EntityId>().ok()).collect())
        })
    }

    fn is_confirmed(&self, kind: EntityKind, id: &EntityId) -> Result<bool> {
        self.db
            .with_connection(|conn| is_confirmed_in(conn, kind, id))
    }

    fn mark_confirmed(&self, kind: EntityKind, id: &EntityId) -> Result<()> {
        self.db.with_connection(|conn| {
            let sql = format!("UPDATE {} SET confirmed = 1 WHERE id = ?1", table_for(kind));
            conn.execute(&sql, [id.as_str()])?;
            Ok(())
        })
    }

    fn dangling_links(&self) -> Result<Vec<DanglingLink>> {
        const CHECKS: [(EntityKind, &str, EntityKind); 4] = [
            (EntityKind::Event, "project_id", EntityKind::Project),
            (EntityKind::Task, "event_id", EntityKind::Event),
            (EntityKind::Note, "project_id", EntityKind::Project),
            (EntityKind::Note, "event_id", EntityKind::Event),
        ];

        self.db.with_connection(|conn| {
            let mut links = Vec::new();
            for (child_kind, column, parent_kind) in CHECKS {
                let sql = format!(
                    "SELECT c.id, c.{column} FROM {child} c
                     WHERE c.{column} IS NOT NULL
                       AND NOT EXISTS (SELECT 1 FROM {parent} p WHERE p.id = c.{column})
                     ORDER BY c.id",
                    child = table_for(child_kind),
                    parent = table_for(parent_kind),
                );
                let mut stmt = conn.prepare(&sql)?;
                let pairs = stmt
                    .query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                for (child, parent) in pairs {
                    let parsed = (child.parse::<EntityId>(), parent.parse::<EntityId>());
                    if let (Ok(child), Ok(parent)) = parsed {
                        links.push(DanglingLink {
                            child: EntityRef::new(child_kind, child),
                            parent: EntityRef::new(parent_kind, parent),
                        });
                    }
                }
            }
            Ok(links)
        })
    }

    fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, entity_id, local_updated_at, incoming_updated_at, resolved_at, strategy
                 FROM sync_conflicts
                 ORDER BY resolved_at DESC, id DESC
                 LIMIT ?1",
            )?;
            let conflicts = stmt
                .query_map([limit], parse_conflict)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(conflicts)
        })
    }

    fn snapshot(&self) -> Result<StoreSnapshot> {
        self.db.with_connection(|conn| {
            let mut rows = Vec::new();
            for kind in EntityKind::SYNC_ORDER {
                let mut entities = fetch_kind(conn, kind)?;
                entities.sort_by_key(Entity::id);
                for entity in entities {
                    let confirmed = is_confirmed_in(conn, kind, &entity.id())?;
                    rows.push(SnapshotRow { entity, confirmed });
                }
            }
            Ok(StoreSnapshot { rows })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use pretty_assertions::assert_eq;

    fn setup() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = setup();
        let project = Project::new("Garden");
        store.insert(&project.clone().into()).unwrap();

        let fetched = store
            .get(EntityKind::Project, &project.id)
            .unwrap()
            .unwrap();
        assert_eq!(fetched, Entity::Project(project.clone()));
        assert!(!store.is_confirmed(EntityKind::Project, &project.id).unwrap());
    }

    #[test]
    fn test_update_missing_entity_is_not_found() {
        let store = setup();
        let error = store.update(&Project::new("ghost").into()).unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
    }

    #[test]
    fn test_update_keeps_confirmed_flag() {
        let store = setup();
        let mut task = TaskItem::new("Water plants");
        store.insert(&task.clone().into()).unwrap();
        store.mark_confirmed(EntityKind::Task, &task.id).unwrap();

        task.complete(task.updated_at + 1);
        store.update(&task.clone().into()).unwrap();

        assert!(store.is_confirmed(EntityKind::Task, &task.id).unwrap());
        let Some(Entity::Task(stored)) = store.get(EntityKind::Task, &task.id).unwrap() else {
            panic!("task missing");
        };
        assert_eq!(stored.status, TaskStatus::Completed);
    }

    #[test]
    fn test_relationship_accessors() {
        let store = setup();
        let project = Project::new("Trip");
        let event = Event::new("Flight", 10, 20).in_project(project.id);
        let task = TaskItem::new("Pack").in_event(event.id);
        let note = NoteItem::new("Checklist", "passport")
            .in_project(project.id)
            .in_event(event.id);

        store.insert(&project.clone().into()).unwrap();
        store.insert(&event.clone().into()).unwrap();
        store.insert(&task.clone().into()).unwrap();
        store.insert(&note.clone().into()).unwrap();

        assert_eq!(store.events_of_project(&project.id).unwrap(), vec![event.clone()]);
        assert_eq!(store.tasks_of_event(&event.id).unwrap(), vec![task]);
        assert_eq!(store.notes_of_project(&project.id).unwrap(), vec![note.clone()]);
        assert_eq!(store.notes_of_event(&event.id).unwrap(), vec![note]);
    }

    #[test]
    fn test_delete_event_cascades_tasks_and_detaches_notes() {
        let store = setup();
        let event = Event::new("Workshop", 10, 20);
        let task_a = TaskItem::new("Slides").in_event(event.id);
        let task_b = TaskItem::new("Room").in_event(event.id);
        let note = NoteItem::new("Agenda", "intro").in_event(event.id);

        store.insert(&event.clone().into()).unwrap();
        store.insert(&task_a.clone().into()).unwrap();
        store.insert(&task_b.clone().into()).unwrap();
        store.insert(&note.clone().into()).unwrap();

        let now = note.updated_at + 100;
        let outcome = store.delete(EntityKind::Event, &event.id, now).unwrap();

        assert_eq!(outcome.removed.len(), 3);
        assert_eq!(outcome.removed[0], EntityRef::new(EntityKind::Event, event.id));
        assert!(store.fetch(EntityKind::Task).unwrap().is_empty());

        let Some(Entity::Note(detached)) = store.get(EntityKind::Note, &note.id).unwrap() else {
            panic!("note should survive");
        };
        assert_eq!(detached.event_id, None);
        assert_eq!(detached.updated_at, now);
        assert_eq!(outcome.detached, vec![Entity::Note(detached)]);
    }

    #[test]
    fn test_delete_project_detaches_events() {
        let store = setup();
        let project = Project::new("Home");
        let event = Event::new("Cleanup", 1, 2).in_project(project.id);
        store.insert(&project.clone().into()).unwrap();
        store.insert(&event.clone().into()).unwrap();

        let outcome = store
            .delete(EntityKind::Project, &project.id, event.updated_at + 1)
            .unwrap();

        assert_eq!(outcome.removed, vec![EntityRef::new(EntityKind::Project, project.id)]);
        assert_eq!(outcome.detached.len(), 1);
        assert!(store.events_of_project(&project.id).unwrap().is_empty());
        assert!(store.get(EntityKind::Event, &event.id).unwrap().is_some());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let store = setup();
        let error = store
            .delete(EntityKind::Note, &EntityId::new(), 1)
            .unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
    }

    #[test]
    fn test_apply_remote_last_writer_wins() {
        let store = setup();
        let mut local = TaskItem::new("Review");
        local.complete(local.updated_at + 50);
        store.insert(&local.clone().into()).unwrap();

        let mut stale = local.clone();
        stale.reopen(local.updated_at - 10);
        let outcome = store.apply_remote(&stale.clone().into(), 999).unwrap();
        assert_eq!(
            outcome,
            MergeOutcome::KeptLocal {
                local_updated_at: local.updated_at
            }
        );

        // The same conflict is only logged once.
        store.apply_remote(&stale.into(), 1_000).unwrap();
        assert_eq!(store.list_conflicts(10).unwrap().len(), 1);

        let mut newer = local.clone();
        newer.title = "Review again".to_string();
        newer.updated_at += 10;
        assert_eq!(
            store.apply_remote(&newer.clone().into(), 1_001).unwrap(),
            MergeOutcome::Updated
        );
        assert_eq!(
            store.apply_remote(&newer.clone().into(), 1_002).unwrap(),
            MergeOutcome::Unchanged
        );
        assert!(store.is_confirmed(EntityKind::Task, &newer.id).unwrap());
    }

    #[test]
    fn test_remove_confirmed_keeps_unconfirmed_rows() {
        let store = setup();
        let pending = NoteItem::new("draft", "");
        let synced = NoteItem::new("synced", "");
        store.insert(&pending.clone().into()).unwrap();
        store.apply_remote(&synced.clone().into(), 1).unwrap();

        assert_eq!(
            store.remove_confirmed(EntityKind::Note, &pending.id, 2).unwrap(),
            None
        );
        assert!(store
            .remove_confirmed(EntityKind::Note, &synced.id, 2)
            .unwrap()
            .is_some());
        assert_eq!(
            store.confirmed_ids(EntityKind::Note).unwrap(),
            HashSet::new()
        );
        assert_eq!(store.fetch(EntityKind::Note).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_confirmed_event_cascades_like_a_local_delete() {
        let store = setup();
        let event = Event::new("Cancelled", 10, 20);
        let task = TaskItem::new("Prepare").in_event(event.id);
        let note = NoteItem::new("Minutes", "").in_event(event.id);
        store.apply_remote(&event.clone().into(), 1).unwrap();
        store.insert(&task.clone().into()).unwrap();
        store.insert(&note.clone().into()).unwrap();

        let now = note.updated_at + 50;
        let outcome = store
            .remove_confirmed(EntityKind::Event, &event.id, now)
            .unwrap()
            .unwrap();

        assert_eq!(
            outcome.removed,
            vec![
                EntityRef::new(EntityKind::Event, event.id),
                EntityRef::new(EntityKind::Task, task.id),
            ]
        );
        assert!(store.get(EntityKind::Task, &task.id).unwrap().is_none());
        let Some(Entity::Note(detached)) = store.get(EntityKind::Note, &note.id).unwrap() else {
            panic!("note should survive");
        };
        assert_eq!(detached.event_id, None);
        assert_eq!(detached.updated_at, now);
        assert_eq!(outcome.detached, vec![Entity::Note(detached)]);
        assert!(store.dangling_links().unwrap().is_empty());
    }

    #[test]
    fn test_dangling_links_report_missing_parents() {
        let store = setup();
        let missing_event = EntityId::new();
        let task = TaskItem::new("orphan").in_event(missing_event);
        store.insert(&task.clone().into()).unwrap();

        let links = store.dangling_links().unwrap();
        assert_eq!(
            links,
            vec![DanglingLink {
                child: EntityRef::new(EntityKind::Task, task.id),
                parent: EntityRef::new(EntityKind::Event, missing_event),
            }]
        );
    }

    #[test]
    fn test_find_ids_by_prefix() {
        let store = setup();
        let project = Project::new("Prefix");
        store.insert(&project.clone().into()).unwrap();

        let prefix: String = project.id.to_string().chars().take(8).collect();
        let ids = store
            .find_ids_by_prefix(EntityKind::Project, &prefix, 3)
            .unwrap();
        assert_eq!(ids, vec![project.id]);
    }
}
