// crates/gallery-validation-core/src/core/audit.rs
// ============================================================================
// Module: Package Validation Audit Model
// Description: Append-only audit documents for validation attempts.
// Purpose: Capture replayable validation history separate from live status.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! One [`PackageValidationAudit`] exists per package version and validation
//! attempt. Entries are only ever appended. Unknown event kinds written by
//! other producers deserialize as [`ValidationEvent::Unrecognized`] so older
//! readers never reject a newer document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PackageId;
use crate::core::identifiers::PackageVersion;
use crate::core::identifiers::ValidationId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Audit event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationEvent {
    /// A validator raised an exception while working.
    ValidatorException,
    /// A virus scan request is about to be sent.
    BeforeVirusScanRequest,
    /// A virus scan request was accepted.
    VirusScanRequestSent,
    /// Sending a virus scan request failed.
    VirusScanRequestFailed,
    /// The scanner reported the package clean.
    PackageClean,
    /// The scanner reported the package not clean.
    PackageNotClean,
    /// The scanner supplied a reason for a not-clean verdict.
    NotCleanReason,
    /// The scan itself failed.
    ScanFailed,
    /// Event kind not known to this reader.
    #[serde(other)]
    Unrecognized,
}

impl ValidationEvent {
    /// Returns the serialized label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidatorException => "validator_exception",
            Self::BeforeVirusScanRequest => "before_virus_scan_request",
            Self::VirusScanRequestSent => "virus_scan_request_sent",
            Self::VirusScanRequestFailed => "virus_scan_request_failed",
            Self::PackageClean => "package_clean",
            Self::PackageNotClean => "package_not_clean",
            Self::NotCleanReason => "not_clean_reason",
            Self::ScanFailed => "scan_failed",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// One immutable audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageValidationAuditEntry {
    /// Time the event was recorded.
    pub timestamp: Timestamp,
    /// Validator that produced the event.
    pub validator_name: String,
    /// Event kind.
    pub event: ValidationEvent,
    /// Optional free-form detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_details: Option<String>,
}

impl PackageValidationAuditEntry {
    /// Creates an entry without detail.
    #[must_use]
    pub fn new(timestamp: Timestamp, validator_name: impl Into<String>, event: ValidationEvent) -> Self {
        Self {
            timestamp,
            validator_name: validator_name.into(),
            event,
            event_details: None,
        }
    }

    /// Attaches detail text.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.event_details = Some(details.into());
        self
    }
}

// ============================================================================
// SECTION: Audit Document
// ============================================================================

/// Audit document for one package version and validation attempt.
///
/// # Invariants
/// - `entries` only grows.
/// - `completed`, once set, is never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageValidationAudit {
    /// Attempt identifier.
    pub validation_id: ValidationId,
    /// Package identifier.
    pub package_id: PackageId,
    /// Package version.
    pub package_version: PackageVersion,
    /// Time the attempt started, when recorded.
    pub started: Option<Timestamp>,
    /// Time the attempt completed, when recorded.
    pub completed: Option<Timestamp>,
    /// Validators participating in the attempt.
    #[serde(default)]
    pub validators: Vec<String>,
    /// Ordered audit entries.
    #[serde(default)]
    pub entries: Vec<PackageValidationAuditEntry>,
}

impl PackageValidationAudit {
    /// Fresh document used when no blob exists yet.
    #[must_use]
    pub const fn empty(
        validation_id: ValidationId,
        package_id: PackageId,
        package_version: PackageVersion,
    ) -> Self {
        Self {
            validation_id,
            package_id,
            package_version,
            started: None,
            completed: None,
            validators: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Returns the entries produced by `validator_name`.
    pub fn entries_for<'a>(
        &'a self,
        validator_name: &'a str,
    ) -> impl Iterator<Item = &'a PackageValidationAuditEntry> + 'a {
        self.entries.iter().filter(move |entry| entry.validator_name == validator_name)
    }
}
