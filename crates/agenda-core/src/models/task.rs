//! Task model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::EntityId;
use crate::util::now_millis;

/// Task completion status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Open,
    Completed,
}

impl TaskStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}

/// A to-do item, usually belonging to an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    /// Unique identifier
    pub id: EntityId,
    /// Task title
    pub title: String,
    /// Optional due timestamp (Unix ms)
    pub due_at: Option<i64>,
    /// Open or completed
    pub status: TaskStatus,
    /// When the task was completed (Unix ms)
    pub completed_at: Option<i64>,
    /// Owning event; `None` for standalone tasks
    pub event_id: Option<EntityId>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl TaskItem {
    /// Create a new open task
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: EntityId::new(),
            title: title.into(),
            due_at: None,
            status: TaskStatus::Open,
            completed_at: None,
            event_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach this task to an event
    #[must_use]
    pub const fn in_event(mut self, event_id: EntityId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    /// Mark the task completed at `now`
    pub fn complete(&mut self, now: i64) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Reopen a completed task
    pub fn reopen(&mut self, now: i64) {
        self.status = TaskStatus::Open;
        self.completed_at = None;
        self.updated_at = now;
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}
