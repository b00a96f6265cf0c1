//! Shared cross-platform state types.

/// Unified sync state published by the engine for views to observe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// No credentials, or the last sync could not reach the server at all
    Offline,
    Syncing,
    Synced,
    /// The last sync finished with at least one failed kind
    Error,
}
