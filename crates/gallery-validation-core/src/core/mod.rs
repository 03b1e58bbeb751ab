// crates/gallery-validation-core/src/core/mod.rs
// ============================================================================
// Module: Gallery Validation Core Types
// Description: Canonical validation pipeline, status, and audit structures.
// Purpose: Provide stable, serializable types shared by every pipeline crate.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Core types define the validation step graph, per-validator status state
//! machine, validation sets, audit documents, and queue messages. These types
//! are the canonical source of truth for stores, validators, and tooling.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod certificates;
pub mod identifiers;
pub mod kinds;
pub mod messaging;
pub mod package;
pub mod pipeline;
pub mod set;
pub mod status;
pub mod time;
pub mod topology;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::PackageValidationAudit;
pub use audit::PackageValidationAuditEntry;
pub use audit::ValidationEvent;
pub use certificates::CertificateVerification;
pub use certificates::EndCertificate;
pub use certificates::EndCertificateStatus;
pub use identifiers::ContentType;
pub use identifiers::PackageId;
pub use identifiers::PackageKey;
pub use identifiers::PackageVersion;
pub use identifiers::ValidationId;
pub use identifiers::ValidationSetId;
pub use identifiers::ValidatorName;
pub use kinds::ValidatorCatalog;
pub use kinds::ValidatorKind;
pub use messaging::MessageTopic;
pub use messaging::ValidationMessage;
pub use package::PackageMetadata;
pub use pipeline::ConfigurationValidator;
pub use pipeline::ContentTypeSteps;
pub use pipeline::GraphError;
pub use pipeline::ValidationConfiguration;
pub use pipeline::ValidationConfigurationItem;
pub use set::PackageValidation;
pub use set::PackageValidationSet;
pub use set::SetOutcome;
pub use status::IssueCode;
pub use status::StatusTransition;
pub use status::ValidationIssue;
pub use status::ValidationRequest;
pub use status::ValidationResult;
pub use status::ValidationStatus;
pub use status::ValidatorStatus;
pub use time::Clock;
pub use time::FixedClock;
pub use time::SystemClock;
pub use time::Timestamp;
pub use topology::TopologicalSort;
pub use topology::TopologyError;
