//! Delete tombstones

use serde::{Deserialize, Serialize};

use super::{EntityId, EntityKind};

/// The most recent delete issued by one user.
///
/// A coarse marker: anything deleted at or before `deleted_at` must not be
/// resurrected by a pull carrying an older (or equal) last-modified time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastDeleteTombstone {
    /// Token of the owning user
    pub token: String,
    /// Timestamp of the latest delete (Unix ms)
    pub deleted_at: i64,
}

impl std::fmt::Debug for LastDeleteTombstone {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LastDeleteTombstone")
            .field("token", &"[REDACTED]")
            .field("deleted_at", &self.deleted_at)
            .finish()
    }
}

/// Delete marker for a single entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTombstone {
    pub kind: EntityKind,
    pub entity_id: EntityId,
    /// Timestamp of the delete (Unix ms)
    pub deleted_at: i64,
}
