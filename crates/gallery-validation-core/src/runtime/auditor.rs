// crates/gallery-validation-core/src/runtime/auditor.rs
// ============================================================================
// Module: Package Validation Auditor
// Description: Lease-protected read-modify-write of audit JSON blobs.
// Purpose: Persist replayable validation history independent of live status.
// Dependencies: crate::core, crate::interfaces, serde_json, tokio
// ============================================================================

//! ## Overview
//! Each validation attempt has one audit document stored as JSON at
//! `{packageId}/{packageVersion}/{validationId}.json` (lowercased) in the
//! `{prefix}-audit` container. Every update acquires a short lease on that
//! blob, reads the current document (or starts from an empty one), applies
//! the caller's update, writes it back, and releases the lease best-effort.
//! Lease contention is retried locally; every other failure propagates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::core::audit::PackageValidationAudit;
use crate::core::audit::PackageValidationAuditEntry;
use crate::core::identifiers::PackageId;
use crate::core::identifiers::PackageVersion;
use crate::core::identifiers::ValidationId;
use crate::core::status::ValidationRequest;
use crate::core::time::Clock;
use crate::interfaces::AuditBlobStore;
use crate::interfaces::AuditError;
use crate::interfaces::ContainerAccess;
use crate::interfaces::LeaseId;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Content type of audit blobs.
pub const AUDIT_CONTENT_TYPE: &str = "application/json";
/// Maximum audit lease duration in milliseconds.
pub const MAX_AUDIT_LEASE_MS: u64 = 30_000;

/// Auditor tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditorSettings {
    /// Container name prefix; the container is `{prefix}-audit`.
    pub container_prefix: String,
    /// Lease duration in milliseconds (at most [`MAX_AUDIT_LEASE_MS`]).
    pub lease_ms: u64,
    /// Lease acquisition attempts before giving up.
    pub max_lease_attempts: u32,
    /// Delay between lease attempts in milliseconds.
    pub lease_retry_delay_ms: u64,
}

impl Default for AuditorSettings {
    fn default() -> Self {
        Self {
            container_prefix: "validation".to_string(),
            lease_ms: MAX_AUDIT_LEASE_MS,
            max_lease_attempts: 10,
            lease_retry_delay_ms: 50,
        }
    }
}

/// Identity of one audit document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTarget {
    /// Attempt identifier.
    pub validation_id: ValidationId,
    /// Package identifier.
    pub package_id: PackageId,
    /// Package version.
    pub package_version: PackageVersion,
}

impl From<&ValidationRequest> for AuditTarget {
    fn from(request: &ValidationRequest) -> Self {
        Self {
            validation_id: request.validation_id,
            package_id: request.package_id.clone(),
            package_version: request.package_version.clone(),
        }
    }
}

impl AuditTarget {
    /// Returns the blob path of the document.
    #[must_use]
    pub fn blob_path(&self) -> String {
        format!("{}/{}/{}.json", self.package_id, self.package_version, self.validation_id)
            .to_lowercase()
    }

    /// Returns an empty document for this target.
    fn empty_audit(&self) -> PackageValidationAudit {
        PackageValidationAudit::empty(
            self.validation_id,
            self.package_id.clone(),
            self.package_version.clone(),
        )
    }
}

// ============================================================================
// SECTION: Auditor
// ============================================================================

/// Lease-protected audit writer and reader.
#[derive(Clone)]
pub struct PackageValidationAuditor {
    /// Backing blob store.
    blobs: Arc<dyn AuditBlobStore>,
    /// Time source for audit timestamps.
    clock: Arc<dyn Clock>,
    /// Tuning.
    settings: AuditorSettings,
}

impl PackageValidationAuditor {
    /// Creates an auditor; `lease_ms` is clamped to [`MAX_AUDIT_LEASE_MS`].
    #[must_use]
    pub fn new(
        blobs: Arc<dyn AuditBlobStore>,
        clock: Arc<dyn Clock>,
        mut settings: AuditorSettings,
    ) -> Self {
        settings.lease_ms = settings.lease_ms.clamp(1, MAX_AUDIT_LEASE_MS);
        settings.max_lease_attempts = settings.max_lease_attempts.max(1);
        Self {
            blobs,
            clock,
            settings,
        }
    }

    /// Returns the audit container name.
    #[must_use]
    pub fn container(&self) -> String {
        format!("{}-audit", self.settings.container_prefix)
    }

    /// Records the start time and participating validators.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the update cannot be stored.
    pub async fn start_audit(
        &self,
        target: &AuditTarget,
        validators: &[String],
    ) -> Result<(), AuditError> {
        let now = self.clock.now();
        let validators = validators.to_vec();
        self.store_audit(target, move |mut audit| {
            audit.started.get_or_insert(now);
            for name in validators {
                if !audit.validators.contains(&name) {
                    audit.validators.push(name);
                }
            }
            audit
        })
        .await
    }

    /// Appends one entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the update cannot be stored.
    pub async fn write_audit_entry(
        &self,
        target: &AuditTarget,
        entry: PackageValidationAuditEntry,
    ) -> Result<(), AuditError> {
        self.write_audit_entries(target, vec![entry]).await
    }

    /// Appends entries in order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the update cannot be stored.
    pub async fn write_audit_entries(
        &self,
        target: &AuditTarget,
        entries: Vec<PackageValidationAuditEntry>,
    ) -> Result<(), AuditError> {
        self.store_audit(target, move |mut audit| {
            audit.entries.extend(entries);
            audit
        })
        .await
    }

    /// Records the completion time if not already set.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the update cannot be stored.
    pub async fn complete_audit(&self, target: &AuditTarget) -> Result<(), AuditError> {
        let now = self.clock.now();
        self.store_audit(target, move |mut audit| {
            audit.completed.get_or_insert(now);
            audit
        })
        .await
    }

    /// Reads the document, returning `None` when none was written.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the blob cannot be read or parsed.
    pub async fn read_audit(
        &self,
        target: &AuditTarget,
    ) -> Result<Option<PackageValidationAudit>, AuditError> {
        let container = self.container();
        self.blobs.ensure_container(&container, ContainerAccess::Blob).await?;
        let Some(bytes) = self.blobs.read(&container, &target.blob_path()).await? else {
            return Ok(None);
        };
        let audit = serde_json::from_slice(&bytes)
            .map_err(|err| AuditError::Serialization(err.to_string()))?;
        Ok(Some(audit))
    }

    /// Applies `update` to the document while holding the blob lease.
    ///
    /// A missing blob is presented to `update` as an empty document.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::LeaseUnavailable`] when the lease stays held by
    /// another writer, or another [`AuditError`] on read, parse, or write
    /// failure.
    pub async fn store_audit<F>(&self, target: &AuditTarget, update: F) -> Result<(), AuditError>
    where
        F: FnOnce(PackageValidationAudit) -> PackageValidationAudit + Send,
    {
        let container = self.container();
        let path = target.blob_path();
        self.blobs.ensure_container(&container, ContainerAccess::Blob).await?;
        let lease = self.acquire_lease(&container, &path).await?;
        let outcome = self.update_under_lease(&container, &path, target, &lease, update).await;
        let _ = self.blobs.release_lease(&container, &path, &lease).await;
        outcome
    }

    /// Acquires the blob lease, retrying on contention.
    async fn acquire_lease(
        &self,
        container: &str,
        path: &str,
    ) -> Result<LeaseId, AuditError> {
        for attempt in 1 ..= self.settings.max_lease_attempts {
            if let Some(lease) =
                self.blobs.acquire_lease(container, path, self.settings.lease_ms).await?
            {
                return Ok(lease);
            }
            if attempt < self.settings.max_lease_attempts {
                tokio::time::sleep(Duration::from_millis(self.settings.lease_retry_delay_ms)).await;
            }
        }
        Err(AuditError::LeaseUnavailable {
            path: path.to_string(),
            attempts: self.settings.max_lease_attempts,
        })
    }

    /// Read-modify-write body executed while `lease` is held.
    async fn update_under_lease<F>(
        &self,
        container: &str,
        path: &str,
        target: &AuditTarget,
        lease: &LeaseId,
        update: F,
    ) -> Result<(), AuditError>
    where
        F: FnOnce(PackageValidationAudit) -> PackageValidationAudit + Send,
    {
        let current = match self.blobs.read(container, path).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| AuditError::Serialization(err.to_string()))?,
            None => target.empty_audit(),
        };
        let updated = update(current);
        let bytes =
            serde_json::to_vec(&updated).map_err(|err| AuditError::Serialization(err.to_string()))?;
        self.blobs.write(container, path, bytes, AUDIT_CONTENT_TYPE, lease).await?;
        Ok(())
    }
}
