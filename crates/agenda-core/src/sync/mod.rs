//! Offline-first sync: upload queues, full-state pulls, and the engine
//! that ties them to the local store.

mod engine;
mod reconcile;
mod upload;

pub use engine::SyncEngine;
pub use reconcile::{
    DanglingLinkReport, KindFailure, KindSummary, Reconciler, SyncError, SyncReport,
};
pub use upload::{UploadCoordinator, UploadStats};
