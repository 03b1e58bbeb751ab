// crates/gallery-validation-validators/src/lib.rs
// ============================================================================
// Module: Gallery Validators Library
// Description: Concrete validation steps for the package pipeline.
// Purpose: Provide the signing, symbol, and legacy scan validators.
// Dependencies: gallery-validation-core, glob, regex
// ============================================================================

//! ## Overview
//! Validators implement [`gallery_validation_core::Validator`]. Message-driven
//! steps share the [`queued`] engine; the VCS bridge reads the validation
//! audit instead of the status store. [`build_registry`] wires all of them
//! into a [`gallery_validation_core::ValidatorRegistry`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod criteria;
pub mod factory;
pub mod memory;
pub mod queued;
pub mod signing;
pub mod symbols;
pub mod username;
pub mod vcs;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use criteria::CriteriaError;
pub use criteria::PackageCriteria;
pub use criteria::PackageCriteriaEvaluator;
pub use factory::FactoryError;
pub use factory::ValidatorDependencies;
pub use factory::ValidatorSettings;
pub use factory::build_registry;
pub use memory::InMemoryMessageQueue;
pub use memory::InMemoryPackageMetadataSource;
pub use queued::QueuedServices;
pub use queued::QueuedValidator;
pub use signing::PackageSignatureValidator;
pub use signing::PackageSigningProcessor;
pub use symbols::SymbolValidator;
pub use username::UsernameRule;
pub use vcs::LEGACY_SCAN_VALIDATOR;
pub use vcs::VCS_KNOWN_FAILURE;
pub use vcs::VCS_UNEXPECTED_EVENT;
pub use vcs::VcsServices;
pub use vcs::VcsValidator;
