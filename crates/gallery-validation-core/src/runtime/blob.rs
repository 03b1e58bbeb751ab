// crates/gallery-validation-core/src/runtime/blob.rs
// ============================================================================
// Module: In-Memory Blob Store
// Description: Leased blob storage held in process memory.
// Purpose: Exercise the audit lease discipline without a storage service.
// Dependencies: crate::core::time, crate::interfaces, sha2, uuid
// ============================================================================

//! ## Overview
//! [`InMemoryBlobStore`] models containers of blobs with exclusive, expiring
//! leases. Lease expiry is measured against an injected [`Clock`] so tests can
//! expire abandoned leases deterministically. Every write records a SHA-256
//! ETag of the stored bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::Digest;
use sha2::Sha256;
use uuid::Uuid;

use crate::core::time::Clock;
use crate::core::time::Timestamp;
use crate::interfaces::AuditBlobStore;
use crate::interfaces::BlobError;
use crate::interfaces::ContainerAccess;
use crate::interfaces::LeaseId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Stored blob contents.
#[derive(Debug, Clone)]
struct BlobEntry {
    /// Blob bytes.
    bytes: Vec<u8>,
    /// Declared content type.
    content_type: String,
    /// Lowercase hex SHA-256 of `bytes`.
    etag: String,
}

/// Active lease on a blob path.
#[derive(Debug, Clone)]
struct LeaseEntry {
    /// Lease token.
    id: LeaseId,
    /// Expiry time.
    expires: Timestamp,
}

/// One container's blobs and leases.
#[derive(Debug)]
struct ContainerState {
    /// Public access level.
    access: ContainerAccess,
    /// Blobs keyed by path.
    blobs: BTreeMap<String, BlobEntry>,
    /// Leases keyed by path.
    leases: BTreeMap<String, LeaseEntry>,
}

impl ContainerState {
    /// Returns the unexpired lease on `path`.
    fn active_lease(&self, path: &str, now: Timestamp) -> Option<&LeaseEntry> {
        self.leases.get(path).filter(|lease| lease.expires > now)
    }
}

/// In-memory leased blob store.
#[derive(Clone)]
pub struct InMemoryBlobStore {
    /// Time source for lease expiry.
    clock: Arc<dyn Clock>,
    /// Containers keyed by name.
    containers: Arc<Mutex<BTreeMap<String, ContainerState>>>,
}

impl InMemoryBlobStore {
    /// Creates an empty store using `clock` for lease expiry.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            containers: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Returns the access level of `container`, if it exists.
    #[must_use]
    pub fn container_access(&self, container: &str) -> Option<ContainerAccess> {
        self.containers.lock().ok()?.get(container).map(|state| state.access)
    }

    /// Returns the ETag of a stored blob.
    #[must_use]
    pub fn etag(&self, container: &str, path: &str) -> Option<String> {
        let guard = self.containers.lock().ok()?;
        guard.get(container)?.blobs.get(path).map(|blob| blob.etag.clone())
    }

    /// Returns the content type of a stored blob.
    #[must_use]
    pub fn content_type(&self, container: &str, path: &str) -> Option<String> {
        let guard = self.containers.lock().ok()?;
        guard.get(container)?.blobs.get(path).map(|blob| blob.content_type.clone())
    }

    /// Runs `f` against a container under the store mutex.
    fn with_container<T>(
        &self,
        container: &str,
        f: impl FnOnce(&mut ContainerState, Timestamp) -> Result<T, BlobError>,
    ) -> Result<T, BlobError> {
        let now = self.clock.now();
        let mut guard = self
            .containers
            .lock()
            .map_err(|_| BlobError::Io("blob store mutex poisoned".to_string()))?;
        let state = guard
            .get_mut(container)
            .ok_or_else(|| BlobError::ContainerNotFound(container.to_string()))?;
        f(state, now)
    }
}

#[async_trait]
impl AuditBlobStore for InMemoryBlobStore {
    async fn ensure_container(
        &self,
        container: &str,
        access: ContainerAccess,
    ) -> Result<(), BlobError> {
        self.containers
            .lock()
            .map_err(|_| BlobError::Io("blob store mutex poisoned".to_string()))?
            .entry(container.to_string())
            .or_insert_with(|| ContainerState {
                access,
                blobs: BTreeMap::new(),
                leases: BTreeMap::new(),
            });
        Ok(())
    }

    async fn read(&self, container: &str, path: &str) -> Result<Option<Vec<u8>>, BlobError> {
        self.with_container(container, |state, _| {
            Ok(state.blobs.get(path).map(|blob| blob.bytes.clone()))
        })
    }

    async fn acquire_lease(
        &self,
        container: &str,
        path: &str,
        duration_ms: u64,
    ) -> Result<Option<LeaseId>, BlobError> {
        self.with_container(container, |state, now| {
            if state.active_lease(path, now).is_some() {
                return Ok(None);
            }
            let lease = LeaseEntry {
                id: LeaseId::new(Uuid::new_v4().to_string()),
                expires: now.plus_millis(duration_ms),
            };
            let id = lease.id.clone();
            state.leases.insert(path.to_string(), lease);
            Ok(Some(id))
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
        self.with_container(container, |state, now| {
            match state.active_lease(path, now) {
                Some(active) if &active.id == lease => {}
                _ => return Err(BlobError::LeaseMismatch(format!("{container}/{path}"))),
            }
            let etag = content_etag(&bytes);
            state.blobs.insert(
                path.to_string(),
                BlobEntry {
                    bytes,
                    content_type: content_type.to_string(),
                    etag,
                },
            );
            Ok(())
        })
    }

    async fn release_lease(
        &self,
        container: &str,
        path: &str,
        lease: &LeaseId,
    ) -> Result<(), BlobError> {
        self.with_container(container, |state, _| {
            match state.leases.get(path) {
                Some(active) if &active.id == lease => {
                    state.leases.remove(path);
                    Ok(())
                }
                _ => Err(BlobError::LeaseMismatch(format!("{container}/{path}"))),
            }
        })
    }
}

/// Returns the ETag recorded for `bytes`: lowercase hex SHA-256.
#[must_use]
pub fn content_etag(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}
