//! Project model

use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::util::now_millis;

/// A project grouping events and notes.
///
/// Events and notes point at their project by id; the project does not own
/// their lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Project {
    /// Create a new project with the given name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: EntityId::new(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
