//! Event model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::EntityId;
use crate::util::now_millis;

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Scheduled,
    Completed,
}

impl EventStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown event status '{other}'")),
        }
    }
}

/// A scheduled event, optionally part of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier
    pub id: EntityId,
    /// Event title
    pub title: String,
    /// Start timestamp (Unix ms)
    pub start_at: i64,
    /// End timestamp (Unix ms)
    pub end_at: i64,
    /// Scheduled or completed
    pub status: EventStatus,
    /// Owning project, if any
    pub project_id: Option<EntityId>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Event {
    /// Create a new scheduled event
    #[must_use]
    pub fn new(title: impl Into<String>, start_at: i64, end_at: i64) -> Self {
        let now = now_millis();
        Self {
            id: EntityId::new(),
            title: title.into(),
            start_at,
            end_at,
            status: EventStatus::Scheduled,
            project_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach this event to a project
    #[must_use]
    pub const fn in_project(mut self, project_id: EntityId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Mark the event completed at `now`
    pub fn complete(&mut self, now: i64) {
        self.status = EventStatus::Completed;
        self.updated_at = now;
    }
}
