// crates/gallery-validation-core/src/runtime/mod.rs
// ============================================================================
// Module: Gallery Validation Runtime
// Description: Orchestrator driver, auditor, registry, stores, and log sinks.
// Purpose: Execute validation sets against registered validators.
// Dependencies: crate::{core, interfaces}, tokio
// ============================================================================

//! ## Overview
//! Runtime modules implement the orchestration pass, lease-protected audit
//! persistence, the explicit validator registry, and in-memory backends. All
//! hosts drive validation through the same orchestrator logic.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod auditor;
pub mod blob;
pub mod log;
pub mod orchestrator;
pub mod registry;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auditor::AUDIT_CONTENT_TYPE;
pub use auditor::AuditTarget;
pub use auditor::AuditorSettings;
pub use auditor::MAX_AUDIT_LEASE_MS;
pub use auditor::PackageValidationAuditor;
pub use blob::InMemoryBlobStore;
pub use blob::content_etag;
pub use log::FileLogSink;
pub use log::LogLevel;
pub use log::MemoryLogSink;
pub use log::NoopLogSink;
pub use log::SharedLogSink;
pub use log::StderrLogSink;
pub use log::ValidationLogEvent;
pub use log::ValidationLogSink;
pub use orchestrator::OrchestratorError;
pub use orchestrator::PackageValidationInput;
pub use orchestrator::ProcessReport;
pub use orchestrator::ValidationOrchestrator;
pub use registry::RegistryError;
pub use registry::ValidatorRegistry;
pub use store::InMemoryValidationSetStore;
pub use store::InMemoryValidatorStateStore;
pub use store::compare_and_transition;
