// crates/gallery-validation-config/src/lib.rs
// ============================================================================
// Module: Gallery Validation Config
// Description: Canonical orchestrator configuration model and loader.
// Purpose: Provide a single source of truth for orchestrator configuration.
// Dependencies: gallery-validation-core, gallery-validation-validators, toml
// ============================================================================

//! ## Overview
//! This crate owns the canonical orchestrator configuration model: the
//! validation step graphs, validator settings, audit tuning, state store, and
//! log sink selection. Loading is fail-closed; a configuration that cannot
//! drive the pipeline never reaches the runtime.

pub mod config;

pub use config::*;
