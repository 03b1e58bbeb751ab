// crates/gallery-validation-core/src/lib.rs
// ============================================================================
// Module: Gallery Validation Core Library
// Description: Public API surface for the package validation pipeline core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The validation core drives package artifacts through a configurable,
//! dependency-ordered sequence of asynchronous validation steps. Every step is
//! idempotent under re-delivery: status writes are compare-and-swap and audit
//! writes are lease-protected, so a crashed or duplicated pass resumes safely.
//! Storage, queues, and notification are reached only through the traits in
//! [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::AuditBlobStore;
pub use interfaces::AuditError;
pub use interfaces::BlobError;
pub use interfaces::ContainerAccess;
pub use interfaces::EnqueueError;
pub use interfaces::LeaseId;
pub use interfaces::MessageEnqueuer;
pub use interfaces::MetadataError;
pub use interfaces::NotifyError;
pub use interfaces::OutcomeNotifier;
pub use interfaces::PackageMetadataSource;
pub use interfaces::StoreError;
pub use interfaces::ValidationSetStore;
pub use interfaces::Validator;
pub use interfaces::ValidatorError;
pub use interfaces::ValidatorProvider;
pub use interfaces::ValidatorStateService;
pub use runtime::AUDIT_CONTENT_TYPE;
pub use runtime::AuditTarget;
pub use runtime::AuditorSettings;
pub use runtime::FileLogSink;
pub use runtime::InMemoryBlobStore;
pub use runtime::InMemoryValidationSetStore;
pub use runtime::InMemoryValidatorStateStore;
pub use runtime::LogLevel;
pub use runtime::MAX_AUDIT_LEASE_MS;
pub use runtime::MemoryLogSink;
pub use runtime::NoopLogSink;
pub use runtime::OrchestratorError;
pub use runtime::PackageValidationAuditor;
pub use runtime::PackageValidationInput;
pub use runtime::ProcessReport;
pub use runtime::RegistryError;
pub use runtime::SharedLogSink;
pub use runtime::StderrLogSink;
pub use runtime::ValidationLogEvent;
pub use runtime::ValidationLogSink;
pub use runtime::ValidationOrchestrator;
pub use runtime::ValidatorRegistry;
pub use runtime::compare_and_transition;
pub use runtime::content_etag;
