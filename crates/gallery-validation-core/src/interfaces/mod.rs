// crates/gallery-validation-core/src/interfaces/mod.rs
// ============================================================================
// Module: Gallery Validation Interfaces
// Description: Contracts for validators, status storage, blobs, and queues.
// Purpose: Define the seams between the pipeline core and external systems.
// Dependencies: crate::core, async-trait, thiserror
// ============================================================================

//! ## Overview
//! Interfaces describe how the validation core talks to databases, blob
//! storage, and message brokers without embedding transport details. Every
//! shared mutable resource behind these traits is written with optimistic
//! concurrency (conditional writes or short leases) instead of locks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::PackageKey;
use crate::core::identifiers::ValidationSetId;
use crate::core::identifiers::ValidatorName;
use crate::core::messaging::ValidationMessage;
use crate::core::package::PackageMetadata;
use crate::core::set::PackageValidationSet;
use crate::core::set::SetOutcome;
use crate::core::status::StatusTransition;
use crate::core::status::ValidationRequest;
use crate::core::status::ValidationResult;
use crate::core::status::ValidationStatus;
use crate::core::status::ValidatorStatus;

// ============================================================================
// SECTION: Validator Provider
// ============================================================================

/// Resolves configured step names to validator implementations.
pub trait ValidatorProvider {
    /// Returns true when `name` is a registered validator (case-sensitive).
    fn is_validator(&self, name: &str) -> bool;

    /// Returns true when `name` is a registered processor.
    fn is_processor(&self, name: &str) -> bool;
}

// ============================================================================
// SECTION: Run State Store
// ============================================================================

/// Status and set store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("validation store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("validation store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("validation store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("validation store invalid data: {0}")]
    Invalid(String),
    /// Requested transition violates the status state machine.
    #[error("illegal validator status transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Stored state.
        from: ValidationStatus,
        /// Requested state.
        to: ValidationStatus,
    },
    /// Store reported an error.
    #[error("validation store error: {0}")]
    Store(String),
}

/// Authoritative per-validator status store.
///
/// Records are keyed by `(validator name, validation id)`.
#[async_trait]
pub trait ValidatorStateService: Send + Sync {
    /// Returns the stored status, or a `NotStarted` record when none exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    async fn get_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
    ) -> Result<ValidatorStatus, StoreError>;

    /// Moves the stored state from `previous` to `new_status` if it still equals `previous`.
    ///
    /// On conflict nothing is written and the current record is returned with
    /// `applied == false`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTransition`] when `previous -> new_status`
    /// is not a legal transition, or another [`StoreError`] on I/O failure.
    async fn try_add_validator_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
        previous: ValidationStatus,
        new_status: ValidationStatus,
    ) -> Result<StatusTransition, StoreError>;

    /// Records `result` (state, artifact URL, issues) if the stored state still equals `previous`.
    ///
    /// # Errors
    ///
    /// Same as [`ValidatorStateService::try_add_validator_status`].
    async fn try_update_validator_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
        previous: ValidationStatus,
        result: &ValidationResult,
    ) -> Result<StatusTransition, StoreError>;
}

/// Persistence for orchestrated validation sets.
#[async_trait]
pub trait ValidationSetStore: Send + Sync {
    /// Loads a set by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    async fn load(&self, set_id: &ValidationSetId)
    -> Result<Option<PackageValidationSet>, StoreError>;

    /// Saves a set, replacing the previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    async fn save(&self, set: &PackageValidationSet) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Audit Blob Store
// ============================================================================

/// Public access level of a blob container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerAccess {
    /// No anonymous access.
    Private,
    /// Anonymous read access to individual blobs.
    Blob,
}

/// Opaque lease token for a blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaseId(String);

impl LeaseId {
    /// Wraps a lease token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Blob store errors.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Container does not exist.
    #[error("blob container not found: {0}")]
    ContainerNotFound(String),
    /// Lease is missing, expired, or held by someone else.
    #[error("blob lease mismatch: {0}")]
    LeaseMismatch(String),
    /// Transport or storage failure.
    #[error("blob store io error: {0}")]
    Io(String),
}

/// Blob storage with short exclusive leases.
#[async_trait]
pub trait AuditBlobStore: Send + Sync {
    /// Creates the container when missing.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] when the container cannot be created.
    async fn ensure_container(&self, container: &str, access: ContainerAccess)
    -> Result<(), BlobError>;

    /// Reads a blob, returning `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] on storage failure.
    async fn read(&self, container: &str, path: &str) -> Result<Option<Vec<u8>>, BlobError>;

    /// Acquires an exclusive lease, returning `None` while another lease is active.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] on storage failure.
    async fn acquire_lease(
        &self,
        container: &str,
        path: &str,
        duration_ms: u64,
    ) -> Result<Option<LeaseId>, BlobError>;

    /// Writes a blob while holding `lease`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::LeaseMismatch`] when the lease is not current.
    async fn write(
        &self,
        container: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        lease: &LeaseId,
    ) -> Result<(), BlobError>;

    /// Releases `lease`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] when the lease cannot be released.
    async fn release_lease(&self, container: &str, path: &str, lease: &LeaseId)
    -> Result<(), BlobError>;
}

/// Auditor errors.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Underlying blob store failure.
    #[error(transparent)]
    Blob(#[from] BlobError),
    /// Audit document could not be (de)serialized.
    #[error("audit serialization error: {0}")]
    Serialization(String),
    /// Lease could not be acquired within the retry budget.
    #[error("audit blob {path} still leased after {attempts} attempts")]
    LeaseUnavailable {
        /// Blob path.
        path: String,
        /// Attempts made.
        attempts: u32,
    },
}

// ============================================================================
// SECTION: Messaging
// ============================================================================

/// Message enqueue errors.
#[derive(Debug, Error)]
pub enum EnqueueError {
    /// Broker rejected or failed the send.
    #[error("message enqueue failed: {0}")]
    Send(String),
}

/// At-least-once message sender.
#[async_trait]
pub trait MessageEnqueuer: Send + Sync {
    /// Enqueues `message`.
    ///
    /// # Errors
    ///
    /// Returns [`EnqueueError`] when the send fails.
    async fn enqueue(&self, message: ValidationMessage) -> Result<(), EnqueueError>;
}

// ============================================================================
// SECTION: Package Metadata
// ============================================================================

/// Package metadata lookup errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Package does not exist.
    #[error("package not found: {0}")]
    NotFound(String),
    /// Lookup failed.
    #[error("package metadata lookup failed: {0}")]
    Lookup(String),
}

/// Gallery package lookups.
#[async_trait]
pub trait PackageMetadataSource: Send + Sync {
    /// Finds a package by key.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup fails.
    async fn find_package(&self, key: PackageKey) -> Result<Option<PackageMetadata>, MetadataError>;
}

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Validator errors.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Status store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Message enqueue failure.
    #[error(transparent)]
    Enqueue(#[from] EnqueueError),
    /// Audit failure.
    #[error(transparent)]
    Audit(#[from] AuditError),
    /// Package metadata failure.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    /// A result shape that indicates an integration defect.
    #[error("unexpected validation result: {0}")]
    UnexpectedResult(String),
}

impl ValidatorError {
    /// Returns false for defects that must be dead-lettered instead of retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::UnexpectedResult(_))
    }
}

/// Common contract of every validation step.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Registered name of the validator.
    fn name(&self) -> &ValidatorName;

    /// Starts validation; must not repeat external side effects once started.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`] on store, queue, or integration failures.
    async fn start(&self, request: &ValidationRequest) -> Result<ValidationResult, ValidatorError>;

    /// Reports the current result without changing the validator's state.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`] on store or integration failures.
    async fn get_result(&self, request: &ValidationRequest)
    -> Result<ValidationResult, ValidatorError>;
}

// ============================================================================
// SECTION: Outcome Notification
// ============================================================================

/// Outcome notification errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Downstream notification failed.
    #[error("outcome notification failed: {0}")]
    Failed(String),
}

/// Receiver of terminal validation set outcomes (messaging, symbol publishing).
#[async_trait]
pub trait OutcomeNotifier: Send + Sync {
    /// Called once when `set` reaches a terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when delivery fails; the orchestrator retries
    /// on its next pass.
    async fn notify(&self, set: &PackageValidationSet, outcome: SetOutcome)
    -> Result<(), NotifyError>;
}
