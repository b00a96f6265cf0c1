//! agenda-core - Core library for Agenda
//!
//! Models, the `SQLite` local store, the tombstone ledger, remote API
//! clients, and the offline-first sync engine shared by every Agenda client.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod state;
pub mod sync;
pub mod util;

pub use auth::{AuthToken, CredentialProvider, StaticCredentials};
pub use config::{EngineConfig, RemoteConfig, TombstonePolicy};
pub use error::{Error, Result};
pub use models::{Entity, EntityId, EntityKind, EntityRef, Event, NoteItem, Project, TaskItem};
pub use state::SyncState;
pub use sync::{SyncEngine, SyncError, SyncReport};
