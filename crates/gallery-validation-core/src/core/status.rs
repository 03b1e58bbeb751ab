// crates/gallery-validation-core/src/core/status.rs
// ============================================================================
// Module: Gallery Validation Status Model
// Description: Validation states, requests, results, and persisted status.
// Purpose: Define the per-validator state machine and its value types.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Every validator moves a validation attempt through
//! `NotStarted -> Incomplete -> {Succeeded, Failed}`. Terminal states are
//! sticky: a new attempt gets a new [`ValidationId`] rather than rewriting the
//! history of an old one. Requests are immutable and results are produced
//! fresh on every call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PackageId;
use crate::core::identifiers::PackageKey;
use crate::core::identifiers::PackageVersion;
use crate::core::identifiers::ValidationId;
use crate::core::identifiers::ValidatorName;

// ============================================================================
// SECTION: Validation Status
// ============================================================================

/// Lifecycle state of one validator for one validation attempt.
///
/// # Invariants
/// - Variants are stable for serialization and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// No work has been requested yet.
    NotStarted,
    /// Work was requested and has not finished.
    Incomplete,
    /// Work finished and the package passed.
    Succeeded,
    /// Work finished and the package was rejected.
    Failed,
}

impl ValidationStatus {
    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns whether moving from `self` to `next` respects the state machine.
    ///
    /// Staying in place is not a transition. Skipping `Incomplete` is allowed
    /// because a validator may decide synchronously.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::NotStarted => !matches!(next, Self::NotStarted),
            Self::Incomplete => next.is_terminal(),
            Self::Succeeded | Self::Failed => false,
        }
    }

    /// Returns a stable label for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Incomplete => "incomplete",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "not_started" => Some(Self::NotStarted),
            "incomplete" => Some(Self::Incomplete),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Issues
// ============================================================================

/// Structured problem codes surfaced to package publishers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// Unclassified failure.
    Unknown,
    /// Package archive uses unsupported Zip64 format.
    PackageIsZip64,
    /// Signed packages are not accepted for this owner.
    PackageIsSigned,
    /// Client-side signature verification failed.
    ClientSigningVerificationFailure,
    /// Only author primary signatures are accepted.
    OnlyAuthorSignaturesSupported,
    /// Author counter-signatures are not accepted.
    AuthorCounterSignaturesNotSupported,
    /// Only signature format version 1 is accepted.
    OnlySignatureFormatVersion1Supported,
    /// The signing certificate is not registered to the owner.
    PackageIsNotSignedWithRegisteredCertificate,
    /// Symbol file checksum does not match the assembly.
    SymbolChecksumDoesNotMatch,
    /// No assembly in the package matches the symbol file.
    SymbolMatchingAssemblyNotFound,
    /// Symbol file is not a portable PDB.
    SymbolPdbIsNotPortable,
}

/// A structured validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Issue code.
    pub code: IssueCode,
    /// Optional detail safe to show to publishers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ValidationIssue {
    /// Creates an issue without detail.
    #[must_use]
    pub const fn new(code: IssueCode) -> Self {
        Self {
            code,
            detail: None,
        }
    }

    /// Creates an issue with detail text.
    #[must_use]
    pub fn with_detail(code: IssueCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: Some(detail.into()),
        }
    }
}

// ============================================================================
// SECTION: Requests and Results
// ============================================================================

/// Identity of one validation attempt for one package version.
///
/// # Invariants
/// - Created once when a step is scheduled and only ever shared by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    /// Attempt identifier.
    pub validation_id: ValidationId,
    /// Package database key.
    pub package_key: PackageKey,
    /// Package identifier.
    pub package_id: PackageId,
    /// Package version.
    pub package_version: PackageVersion,
    /// URL of the package artifact to validate.
    pub nupkg_url: String,
}

/// Outcome reported by a validator call.
///
/// # Invariants
/// - Produced fresh on every call; callers replace rather than mutate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Current status.
    pub status: ValidationStatus,
    /// Replacement artifact URL when the validator produced a new package.
    pub nupkg_url: Option<String>,
    /// Ordered issues surfaced by the validator.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Result with the given status and no issues.
    #[must_use]
    pub const fn from_status(status: ValidationStatus) -> Self {
        Self {
            status,
            nupkg_url: None,
            issues: Vec::new(),
        }
    }

    /// `NotStarted` result.
    #[must_use]
    pub const fn not_started() -> Self {
        Self::from_status(ValidationStatus::NotStarted)
    }

    /// `Incomplete` result.
    #[must_use]
    pub const fn incomplete() -> Self {
        Self::from_status(ValidationStatus::Incomplete)
    }

    /// `Succeeded` result with no issues.
    #[must_use]
    pub const fn succeeded() -> Self {
        Self::from_status(ValidationStatus::Succeeded)
    }

    /// `Failed` result with the given issues.
    #[must_use]
    pub const fn failed(issues: Vec<ValidationIssue>) -> Self {
        Self {
            status: ValidationStatus::Failed,
            nupkg_url: None,
            issues,
        }
    }
}

// ============================================================================
// SECTION: Persisted Status
// ============================================================================

/// Persisted status of one validator for one validation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorStatus {
    /// Attempt identifier.
    pub validation_id: ValidationId,
    /// Validator owning this record.
    pub validator_name: ValidatorName,
    /// Package database key.
    pub package_key: PackageKey,
    /// Current state.
    pub state: ValidationStatus,
    /// Replacement artifact URL, if any.
    pub nupkg_url: Option<String>,
    /// Issues recorded with the terminal state.
    pub issues: Vec<ValidationIssue>,
}

impl ValidatorStatus {
    /// Returns the default record for an attempt with no stored state.
    #[must_use]
    pub fn not_started(validator_name: &ValidatorName, request: &ValidationRequest) -> Self {
        Self {
            validation_id: request.validation_id,
            validator_name: validator_name.clone(),
            package_key: request.package_key,
            state: ValidationStatus::NotStarted,
            nupkg_url: None,
            issues: Vec::new(),
        }
    }

    /// Maps the stored record to a fresh result.
    #[must_use]
    pub fn to_result(&self) -> ValidationResult {
        ValidationResult {
            status: self.state,
            nupkg_url: self.nupkg_url.clone(),
            issues: self.issues.clone(),
        }
    }
}

/// Outcome of a conditional status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    /// True when the caller's transition was applied.
    pub applied: bool,
    /// Stored status after the call (the winner's state on conflict).
    pub current: ValidatorStatus,
}

#[cfg(test)]
mod tests {
    use super::ValidationStatus;

    #[test]
    fn terminal_states_never_transition() {
        for terminal in [ValidationStatus::Succeeded, ValidationStatus::Failed] {
            for next in [
                ValidationStatus::NotStarted,
                ValidationStatus::Incomplete,
                ValidationStatus::Succeeded,
                ValidationStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn incomplete_only_moves_forward() {
        assert!(!ValidationStatus::Incomplete.can_transition_to(ValidationStatus::NotStarted));
        assert!(!ValidationStatus::Incomplete.can_transition_to(ValidationStatus::Incomplete));
        assert!(ValidationStatus::Incomplete.can_transition_to(ValidationStatus::Failed));
    }

    #[test]
    fn labels_parse_back() {
        for status in [
            ValidationStatus::NotStarted,
            ValidationStatus::Incomplete,
            ValidationStatus::Succeeded,
            ValidationStatus::Failed,
        ] {
            assert_eq!(ValidationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ValidationStatus::parse("done"), None);
    }
}
