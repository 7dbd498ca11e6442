// crates/partner-sync-store-sqlite/src/lib.rs
// ============================================================================
// Module: Partner Sync SQLite Store
// Description: Durable SyncLogStore backed by SQLite.
// Purpose: Persist sync logs and splits across restarts.
// Dependencies: partner-sync-core, rusqlite
// ============================================================================

//! ## Overview
//! `SQLite`-backed implementation of [`partner_sync_core::SyncLogStore`].

pub mod store;

pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncLogStore;
pub use store::SqliteSyncMode;
