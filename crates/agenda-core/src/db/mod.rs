//! Database layer for Agenda

mod connection;
mod ledger;
mod migrations;
mod rows;
mod store;

pub use connection::Database;
pub use ledger::{SqliteTombstoneLedger, TombstoneLedger};
pub use store::{
    DanglingLink, DeleteOutcome, LocalStore, MergeOutcome, SnapshotRow, SqliteStore,
    StoreSnapshot,
};
