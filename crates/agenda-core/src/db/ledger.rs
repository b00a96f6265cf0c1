//! Tombstone ledger: the most recent delete per user

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::auth::AuthToken;
use crate::error::Result;
use crate::models::{EntityId, EntityKind, EntityTombstone, LastDeleteTombstone};

/// Persisted delete markers consulted before a pulled record is written.
pub trait TombstoneLedger: Send + Sync {
    /// Raise the user's last-delete timestamp to `deleted_at` (never lowers it)
    fn record_delete(&self, token: &AuthToken, deleted_at: i64) -> Result<()>;

    fn last_delete(&self, token: &AuthToken) -> Result<Option<LastDeleteTombstone>>;

    /// True when the user deleted something at or after `record_updated_at`.
    /// No tombstone means nothing was ever deleted: never stale.
    fn is_stale(&self, token: &AuthToken, record_updated_at: i64) -> Result<bool> {
        Ok(self
            .last_delete(token)?
            .is_some_and(|tombstone| tombstone.deleted_at >= record_updated_at))
    }

    fn record_entity_delete(
        &self,
        token: &AuthToken,
        kind: EntityKind,
        id: &EntityId,
        deleted_at: i64,
    ) -> Result<()>;

    fn entity_tombstones(&self, token: &AuthToken, kind: EntityKind)
        -> Result<Vec<EntityTombstone>>;

    /// True when this id was deleted at or after `record_updated_at`
    fn is_entity_stale(
        &self,
        token: &AuthToken,
        kind: EntityKind,
        id: &EntityId,
        record_updated_at: i64,
    ) -> Result<bool>;

    /// Drop per-entity tombstones whose id is no longer on the server.
    /// Returns how many were removed.
    fn prune_entity_tombstones(
        &self,
        token: &AuthToken,
        kind: EntityKind,
        remote_ids: &HashSet<EntityId>,
    ) -> Result<usize>;
}

/// `SQLite` implementation of [`TombstoneLedger`] sharing the store's database
#[derive(Clone)]
pub struct SqliteTombstoneLedger {
    db: Arc<Database>,
}

impl SqliteTombstoneLedger {
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl TombstoneLedger for SqliteTombstoneLedger {
    fn record_delete(&self, token: &AuthToken, deleted_at: i64) -> Result<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO last_delete_tombstones (token, deleted_at) VALUES (?1, ?2)
                 ON CONFLICT(token) DO UPDATE
                 SET deleted_at = MAX(deleted_at, excluded.deleted_at)",
                params![token.as_str(), deleted_at],
            )?;
            Ok(())
        })
    }

    fn last_delete(&self, token: &AuthToken) -> Result<Option<LastDeleteTombstone>> {
        self.db.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT token, deleted_at FROM last_delete_tombstones WHERE token = ?1",
                    [token.as_str()],
                    |row| {
                        Ok(LastDeleteTombstone {
                            token: row.get(0)?,
                            deleted_at: row.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
    }

    fn record_entity_delete(
        &self,
        token: &AuthToken,
        kind: EntityKind,
        id: &EntityId,
        deleted_at: i64,
    ) -> Result<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO entity_tombstones (token, kind, entity_id, deleted_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(token, kind, entity_id) DO UPDATE
                 SET deleted_at = MAX(deleted_at, excluded.deleted_at)",
                params![token.as_str(), kind.as_str(), id.as_str(), deleted_at],
            )?;
            Ok(())
        })
    }

    fn entity_tombstones(
        &self,
        token: &AuthToken,
        kind: EntityKind,
    ) -> Result<Vec<EntityTombstone>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT entity_id, deleted_at FROM entity_tombstones
                 WHERE token = ?1 AND kind = ?2
                 ORDER BY deleted_at DESC, entity_id",
            )?;
            let rows = stmt
                .query_map(params![token.as_str(), kind.as_str()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(rows
                .into_iter()
                .filter_map(|(entity_id, deleted_at)| {
                    entity_id
                        .parse::<EntityId>()
                        .ok()
                        .map(|entity_id| EntityTombstone {
                            kind,
                            entity_id,
                            deleted_at,
                        })
                })
                .collect())
        })
    }

    fn is_entity_stale(
        &self,
        token: &AuthToken,
        kind: EntityKind,
        id: &EntityId,
        record_updated_at: i64,
    ) -> Result<bool> {
        self.db.with_connection(|conn| {
            let deleted_at: Option<i64> = conn
                .query_row(
                    "SELECT deleted_at FROM entity_tombstones
                     WHERE token = ?1 AND kind = ?2 AND entity_id = ?3",
                    params![token.as_str(), kind.as_str(), id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(deleted_at.is_some_and(|deleted_at| deleted_at >= record_updated_at))
        })
    }

    fn prune_entity_tombstones(
        &self,
        token: &AuthToken,
        kind: EntityKind,
        remote_ids: &HashSet<EntityId>,
    ) -> Result<usize> {
        let landed: Vec<EntityId> = self
            .entity_tombstones(token, kind)?
            .into_iter()
            .map(|tombstone| tombstone.entity_id)
            .filter(|id| !remote_ids.contains(id))
            .collect();
        if landed.is_empty() {
            return Ok(0);
        }

        self.db.with_connection(|conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            for id in &landed {
                removed += tx.execute(
                    "DELETE FROM entity_tombstones
                     WHERE token = ?1 AND kind = ?2 AND entity_id = ?3",
                    params![token.as_str(), kind.as_str(), id.as_str()],
                )?;
            }
            tx.commit()?;
            Ok(removed)
        })
    }
}
