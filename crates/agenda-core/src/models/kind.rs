//! Entity kinds and references

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::EntityId;

/// The four synchronized entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Project,
    Event,
    Task,
    Note,
}

impl EntityKind {
    /// Kinds in merge order: parents before the children that reference them.
    pub const SYNC_ORDER: [Self; 4] = [Self::Project, Self::Event, Self::Task, Self::Note];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Event => "event",
            Self::Task => "task",
            Self::Note => "note",
        }
    }

    /// Remote collection name (`/v1/{collection}`).
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::Event => "events",
            Self::Task => "tasks",
            Self::Note => "notes",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "project" | "projects" => Ok(Self::Project),
            "event" | "events" => Ok(Self::Event),
            "task" | "tasks" => Ok(Self::Task),
            "note" | "notes" => Ok(Self::Note),
            other => Err(format!("unknown entity kind '{other}'")),
        }
    }
}

/// A (kind, id) pair naming one stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    #[must_use]
    pub const fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
