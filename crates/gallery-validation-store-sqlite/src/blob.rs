// crates/gallery-validation-store-sqlite/src/blob.rs
// ============================================================================
// Module: SQLite Audit Blob Store
// Description: Leased audit blob storage sharing the validation store file.
// Purpose: Keep audit history and its leases durable across restarts.
// Dependencies: gallery-validation-core, rusqlite, uuid
// ============================================================================

//! ## Overview
//! [`SqliteAuditBlobStore`] implements [`AuditBlobStore`] over three tables of
//! the validation store database: containers, blobs, and leases. Lease checks
//! and the writes they guard run inside one `BEGIN IMMEDIATE` transaction, so
//! workers sharing the file observe a single lease holder per blob. Lease
//! expiry is measured against an injected [`Clock`]; a lease abandoned by a
//! crashed worker becomes acquirable once it expires.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use gallery_validation_core::AuditBlobStore;
use gallery_validation_core::BlobError;
use gallery_validation_core::Clock;
use gallery_validation_core::ContainerAccess;
use gallery_validation_core::LeaseId;
use gallery_validation_core::content_etag;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use uuid::Uuid;

use crate::store::SqliteValidationStore;

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed audit blob store.
///
/// # Invariants
/// - Shares the connection mutex of the [`SqliteValidationStore`] it was built from.
/// - A write succeeds only while the caller holds the unexpired lease.
#[derive(Clone)]
pub struct SqliteAuditBlobStore {
    /// Connection shared with the validation store.
    connection: Arc<Mutex<Connection>>,
    /// Time source for lease expiry.
    clock: Arc<dyn Clock>,
}

impl SqliteAuditBlobStore {
    /// Creates a blob store over the database of `store`.
    #[must_use]
    pub fn new(store: &SqliteValidationStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            connection: store.shared_connection(),
            clock,
        }
    }

    /// Returns the access level of `container`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] when the row cannot be read or is not recognized.
    pub fn container_access(&self, container: &str) -> Result<Option<ContainerAccess>, BlobError> {
        let guard = self.lock()?;
        let label: Option<String> = guard
            .query_row(
                "SELECT access FROM blob_containers WHERE name = ?1",
                params![container],
                |row| row.get(0),
            )
            .optional()
            .map_err(blob_db_error)?;
        drop(guard);
        label.map(|label| parse_access(&label)).transpose()
    }

    /// Returns the ETag of a stored blob.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] when the row cannot be read.
    pub fn etag(&self, container: &str, path: &str) -> Result<Option<String>, BlobError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT etag FROM audit_blobs WHERE container = ?1 AND path = ?2",
                params![container, path],
                |row| row.get(0),
            )
            .optional()
            .map_err(blob_db_error)
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, BlobError> {
        self.connection
            .lock()
            .map_err(|_| BlobError::Io("sqlite connection mutex poisoned".to_string()))
    }

    /// Runs `f` inside an immediate transaction after checking `container` exists.
    fn with_container<T>(
        &self,
        container: &str,
        f: impl FnOnce(&Connection, i64) -> Result<T, BlobError>,
    ) -> Result<T, BlobError> {
        let now = self.clock.now().as_unix_millis();
        let mut guard = self.lock()?;
        let tx =
            guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(blob_db_error)?;
        let exists: Option<i64> = tx
            .query_row("SELECT 1 FROM blob_containers WHERE name = ?1", params![container], |row| {
                row.get(0)
            })
            .optional()
            .map_err(blob_db_error)?;
        if exists.is_none() {
            return Err(BlobError::ContainerNotFound(container.to_string()));
        }
        let value = f(&tx, now)?;
        tx.commit().map_err(blob_db_error)?;
        drop(guard);
        Ok(value)
    }
}

#[async_trait]
impl AuditBlobStore for SqliteAuditBlobStore {
    async fn ensure_container(
        &self,
        container: &str,
        access: ContainerAccess,
    ) -> Result<(), BlobError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO blob_containers (name, access) VALUES (?1, ?2) ON CONFLICT(name) DO \
                 NOTHING",
                params![container, access_label(access)],
            )
            .map_err(blob_db_error)?;
        Ok(())
    }

    async fn read(&self, container: &str, path: &str) -> Result<Option<Vec<u8>>, BlobError> {
        self.with_container(container, |tx, _| {
            tx.query_row(
                "SELECT bytes FROM audit_blobs WHERE container = ?1 AND path = ?2",
                params![container, path],
                |row| row.get(0),
            )
            .optional()
            .map_err(blob_db_error)
        })
    }

    async fn acquire_lease(
        &self,
        container: &str,
        path: &str,
        duration_ms: u64,
    ) -> Result<Option<LeaseId>, BlobError> {
        self.with_container(container, |tx, now| {
            if active_lease(tx, container, path, now)?.is_some() {
                return Ok(None);
            }
            let lease = LeaseId::new(Uuid::new_v4().to_string());
            let delta = i64::try_from(duration_ms).unwrap_or(i64::MAX);
            tx.execute(
                "INSERT INTO blob_leases (container, path, lease_id, expires_ms) VALUES (?1, ?2, \
                 ?3, ?4) ON CONFLICT(container, path) DO UPDATE SET lease_id = \
                 excluded.lease_id, expires_ms = excluded.expires_ms",
                params![container, path, lease.as_str(), now.saturating_add(delta)],
            )
            .map_err(blob_db_error)?;
            Ok(Some(lease))
        })
    }

    async fn write(
        &self,
        container: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        lease: &LeaseId,
    ) -> Result<(), BlobError> {
        self.with_container(container, |tx, now| {
            if active_lease(tx, container, path, now)?.as_deref() != Some(lease.as_str()) {
                return Err(BlobError::LeaseMismatch(format!("{container}/{path}")));
            }
            let etag = content_etag(&bytes);
            tx.execute(
                "INSERT INTO audit_blobs (container, path, content_type, etag, bytes) VALUES (?1, \
                 ?2, ?3, ?4, ?5) ON CONFLICT(container, path) DO UPDATE SET content_type = \
                 excluded.content_type, etag = excluded.etag, bytes = excluded.bytes",
                params![container, path, content_type, etag, bytes],
            )
            .map_err(blob_db_error)?;
            Ok(())
        })
    }

    async fn release_lease(
        &self,
        container: &str,
        path: &str,
        lease: &LeaseId,
    ) -> Result<(), BlobError> {
        self.with_container(container, |tx, _| {
            let removed = tx
                .execute(
                    "DELETE FROM blob_leases WHERE container = ?1 AND path = ?2 AND lease_id = ?3",
                    params![container, path, lease.as_str()],
                )
                .map_err(blob_db_error)?;
            if removed == 0 {
                return Err(BlobError::LeaseMismatch(format!("{container}/{path}")));
            }
            Ok(())
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the token of the unexpired lease on `path`.
fn active_lease(
    tx: &Connection,
    container: &str,
    path: &str,
    now: i64,
) -> Result<Option<String>, BlobError> {
    tx.query_row(
        "SELECT lease_id FROM blob_leases WHERE container = ?1 AND path = ?2 AND expires_ms > ?3",
        params![container, path, now],
        |row| row.get(0),
    )
    .optional()
    .map_err(blob_db_error)
}

/// Returns the stored label of `access`.
const fn access_label(access: ContainerAccess) -> &'static str {
    match access {
        ContainerAccess::Private => "private",
        ContainerAccess::Blob => "blob",
    }
}

/// Parses a stored access label.
fn parse_access(label: &str) -> Result<ContainerAccess, BlobError> {
    match label {
        "private" => Ok(ContainerAccess::Private),
        "blob" => Ok(ContainerAccess::Blob),
        other => Err(BlobError::Io(format!("unknown container access label {other}"))),
    }
}

/// Maps a rusqlite error into a blob error.
#[allow(clippy::needless_pass_by_value, reason = "Used as a map_err adapter.")]
fn blob_db_error(err: rusqlite::Error) -> BlobError {
    BlobError::Io(err.to_string())
}
