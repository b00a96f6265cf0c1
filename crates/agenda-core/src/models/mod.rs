//! Data models for Agenda

mod entity;
mod event;
mod id;
mod kind;
mod note;
mod project;
mod sync_conflict;
mod task;
mod tombstone;

pub use entity::Entity;
pub use event::{Event, EventStatus};
pub use id::EntityId;
pub use kind::{EntityKind, EntityRef};
pub use note::NoteItem;
pub use project::Project;
pub use sync_conflict::SyncConflict;
pub use task::{TaskItem, TaskStatus};
pub use tombstone::{EntityTombstone, LastDeleteTombstone};
