// crates/gallery-validation-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Validation Store
// Description: Durable validator status and validation set backend using SQLite.
// Purpose: Persist validator statuses with compare-and-swap transitions.
// Dependencies: gallery-validation-core, rusqlite, uuid
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`gallery_validation_core::ValidatorStateService`]
//! whose conditional writes run inside immediate transactions, so concurrent
//! workers sharing one database file observe a single winner per transition.
//! It also persists orchestrated validation sets as JSON snapshots, and
//! [`SqliteAuditBlobStore`] keeps leased audit blobs in the same file.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod blob;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use blob::SqliteAuditBlobStore;
pub use store::MAX_SET_BYTES;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteValidationStore;
