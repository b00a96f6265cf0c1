//! Kind-erased entity wrapper used by the store and the sync pipeline

use serde::{Deserialize, Serialize};

use super::{EntityId, EntityKind, EntityRef, Event, NoteItem, Project, TaskItem};

/// Any synchronized entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    Project(Project),
    Event(Event),
    Task(TaskItem),
    Note(NoteItem),
}

impl Entity {
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Project(_) => EntityKind::Project,
            Self::Event(_) => EntityKind::Event,
            Self::Task(_) => EntityKind::Task,
            Self::Note(_) => EntityKind::Note,
        }
    }

    #[must_use]
    pub const fn id(&self) -> EntityId {
        match self {
            Self::Project(project) => project.id,
            Self::Event(event) => event.id,
            Self::Task(task) => task.id,
            Self::Note(note) => note.id,
        }
    }

    #[must_use]
    pub const fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind(), self.id())
    }

    /// Last-modified timestamp (Unix ms), compared during merges.
    #[must_use]
    pub const fn updated_at(&self) -> i64 {
        match self {
            Self::Project(project) => project.updated_at,
            Self::Event(event) => event.updated_at,
            Self::Task(task) => task.updated_at,
            Self::Note(note) => note.updated_at,
        }
    }

    #[must_use]
    pub const fn created_at(&self) -> i64 {
        match self {
            Self::Project(project) => project.created_at,
            Self::Event(event) => event.created_at,
            Self::Task(task) => task.created_at,
            Self::Note(note) => note.created_at,
        }
    }

    /// Set the last-modified timestamp
    pub fn touch(&mut self, now: i64) {
        match self {
            Self::Project(project) => project.updated_at = now,
            Self::Event(event) => event.updated_at = now,
            Self::Task(task) => task.updated_at = now,
            Self::Note(note) => note.updated_at = now,
        }
    }

    /// Parent references held by this entity, as (kind, id) pairs.
    #[must_use]
    pub fn parent_refs(&self) -> Vec<EntityRef> {
        match self {
            Self::Project(_) => Vec::new(),
            Self::Event(event) => event
                .project_id
                .map(|id| EntityRef::new(EntityKind::Project, id))
                .into_iter()
                .collect(),
            Self::Task(task) => task
                .event_id
                .map(|id| EntityRef::new(EntityKind::Event, id))
                .into_iter()
                .collect(),
            Self::Note(note) => note
                .project_id
                .map(|id| EntityRef::new(EntityKind::Project, id))
                .into_iter()
                .chain(note.event_id.map(|id| EntityRef::new(EntityKind::Event, id)))
                .collect(),
        }
    }
}

impl From<Project> for Entity {
    fn from(value: Project) -> Self {
        Self::Project(value)
    }
}

impl From<Event> for Entity {
    fn from(value: Event) -> Self {
        Self::Event(value)
    }
}

impl From<TaskItem> for Entity {
    fn from(value: TaskItem) -> Self {
        Self::Task(value)
    }
}

impl From<NoteItem> for Entity {
    fn from(value: NoteItem) -> Self {
        Self::Note(value)
    }
}
