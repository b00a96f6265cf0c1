//! Note model

use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::util::now_millis;

/// A note, optionally linked to a project and/or an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteItem {
    /// Unique identifier
    pub id: EntityId,
    /// Note title
    pub title: String,
    /// Plain text content
    pub content: String,
    /// Linked project
    pub project_id: Option<EntityId>,
    /// Linked event
    pub event_id: Option<EntityId>,
    /// Pinned as favorite
    pub is_favorite: bool,
    /// Hidden from the default list
    pub is_archived: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl NoteItem {
    /// Create a new note with the given title and content
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: EntityId::new(),
            title: title.into(),
            content: content.into(),
            project_id: None,
            event_id: None,
            is_favorite: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Link this note to a project
    #[must_use]
    pub const fn in_project(mut self, project_id: EntityId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Link this note to an event
    #[must_use]
    pub const fn in_event(mut self, event_id: EntityId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    /// Get first line of the content as a preview, truncated to `max_len` characters
    #[must_use]
    pub fn content_preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}
