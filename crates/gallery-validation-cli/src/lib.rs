// crates/gallery-validation-cli/src/lib.rs
// ============================================================================
// Module: Gallery Validation CLI Library
// Description: Runtime assembly shared by the CLI binary and its tests.
// Purpose: Build an orchestrator from validated configuration.
// Dependencies: gallery-validation-config, gallery-validation-validators
// ============================================================================

//! ## Overview
//! The CLI binary is a thin dispatcher; the wiring from an
//! [`gallery_validation_config::OrchestratorConfig`] to a running
//! [`gallery_validation_core::ValidationOrchestrator`] lives in [`runtime`]
//! so it can be exercised without spawning the binary.

pub mod runtime;
