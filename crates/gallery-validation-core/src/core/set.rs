// crates/gallery-validation-core/src/core/set.rs
// ============================================================================
// Module: Package Validation Sets
// Description: Step outcomes for one package version's validation run.
// Purpose: Persistable snapshot driven by the orchestrator.
// Dependencies: crate::core::{identifiers, status, time}, serde
// ============================================================================

//! ## Overview
//! A [`PackageValidationSet`] is created once per validation attempt with one
//! [`PackageValidation`] record per configured step, all `NotStarted`. The
//! orchestrator mutates the records as steps progress and derives the
//! aggregate [`SetOutcome`] from them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ContentType;
use crate::core::identifiers::PackageId;
use crate::core::identifiers::PackageKey;
use crate::core::identifiers::PackageVersion;
use crate::core::identifiers::ValidationId;
use crate::core::identifiers::ValidationSetId;
use crate::core::identifiers::ValidatorName;
use crate::core::status::ValidationIssue;
use crate::core::status::ValidationRequest;
use crate::core::status::ValidationStatus;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Outcome of one step within a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageValidation {
    /// Step (validator) name.
    pub name: ValidatorName,
    /// Last observed status.
    pub status: ValidationStatus,
    /// Time the step was started.
    pub started: Option<Timestamp>,
    /// Time the step reached a terminal status.
    pub completed: Option<Timestamp>,
    /// Replacement artifact URL reported by the step.
    pub nupkg_url: Option<String>,
    /// Issues surfaced by the step.
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
}

impl PackageValidation {
    /// Creates a `NotStarted` record for `name`.
    #[must_use]
    pub const fn not_started(name: ValidatorName) -> Self {
        Self {
            name,
            status: ValidationStatus::NotStarted,
            started: None,
            completed: None,
            nupkg_url: None,
            issues: Vec::new(),
        }
    }
}

/// Aggregate outcome of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOutcome {
    /// At least one step can still make progress.
    InProgress,
    /// Every enabled step succeeded.
    Succeeded,
    /// A step failed.
    Failed,
}

impl SetOutcome {
    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Full collection of step outcomes for one validation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageValidationSet {
    /// Set identifier.
    pub set_id: ValidationSetId,
    /// Attempt identifier shared by every step request.
    pub validation_id: ValidationId,
    /// Content type whose step graph applies.
    pub content_type: ContentType,
    /// Gallery package key.
    pub package_key: PackageKey,
    /// Package identifier.
    pub package_id: PackageId,
    /// Package version.
    pub package_version: PackageVersion,
    /// Current artifact URL; replaced when a processor produces a new artifact.
    pub nupkg_url: String,
    /// Creation time.
    pub created: Timestamp,
    /// Step records in configuration order.
    pub validations: Vec<PackageValidation>,
    /// Whether the terminal outcome was delivered downstream.
    #[serde(default)]
    pub outcome_notified: bool,
}

impl PackageValidationSet {
    /// Builds the request every step of this set receives.
    #[must_use]
    pub fn request(&self) -> ValidationRequest {
        ValidationRequest {
            validation_id: self.validation_id,
            package_key: self.package_key,
            package_id: self.package_id.clone(),
            package_version: self.package_version.clone(),
            nupkg_url: self.nupkg_url.clone(),
        }
    }

    /// Returns the record for `name`.
    #[must_use]
    pub fn validation(&self, name: &ValidatorName) -> Option<&PackageValidation> {
        self.validations.iter().find(|validation| &validation.name == name)
    }

    /// Returns the mutable record for `name`.
    pub fn validation_mut(&mut self, name: &ValidatorName) -> Option<&mut PackageValidation> {
        self.validations.iter_mut().find(|validation| &validation.name == name)
    }

    /// Issues from every step, in step order.
    #[must_use]
    pub fn issues(&self) -> Vec<ValidationIssue> {
        self.validations.iter().flat_map(|validation| validation.issues.iter().cloned()).collect()
    }
}
