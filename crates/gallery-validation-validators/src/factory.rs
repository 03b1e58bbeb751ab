// crates/gallery-validation-validators/src/factory.rs
// ============================================================================
// Module: Validator Factory
// Description: Builds the validator registry from explicit dependencies.
// Purpose: Map every validator kind to its constructor at process start.
// Dependencies: gallery-validation-core, thiserror
// ============================================================================

//! ## Overview
//! [`build_registry`] constructs one instance of every [`ValidatorKind`] and
//! registers it under the kind's configuration name. The match over kinds is
//! exhaustive, so adding a kind without a constructor fails to compile.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use gallery_validation_core::Clock;
use gallery_validation_core::MessageEnqueuer;
use gallery_validation_core::PackageMetadataSource;
use gallery_validation_core::PackageValidationAuditor;
use gallery_validation_core::RegistryError;
use gallery_validation_core::SharedLogSink;
use gallery_validation_core::Validator;
use gallery_validation_core::ValidatorKind;
use gallery_validation_core::ValidatorRegistry;
use gallery_validation_core::ValidatorStateService;
use thiserror::Error;

use crate::criteria::CriteriaError;
use crate::criteria::PackageCriteria;
use crate::criteria::PackageCriteriaEvaluator;
use crate::queued::QueuedServices;
use crate::signing::PackageSignatureValidator;
use crate::signing::PackageSigningProcessor;
use crate::symbols::SymbolValidator;
use crate::username::UsernameRule;
use crate::vcs::VcsServices;
use crate::vcs::VcsValidator;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Validator behavior switches.
#[derive(Debug, Clone, Default)]
pub struct ValidatorSettings {
    /// Whether the environment repository-signs packages.
    pub repository_signing_enabled: bool,
    /// Packages eligible for legacy scanning.
    pub vcs_criteria: PackageCriteria,
}

/// Services every validator is built from.
#[derive(Clone)]
pub struct ValidatorDependencies {
    /// Authoritative status store.
    pub state: Arc<dyn ValidatorStateService>,
    /// Outbound message sender.
    pub queue: Arc<dyn MessageEnqueuer>,
    /// Package metadata lookups.
    pub metadata: Arc<dyn PackageMetadataSource>,
    /// Audit document access.
    pub auditor: PackageValidationAuditor,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Structured log sink.
    pub log: SharedLogSink,
}

/// Registry construction errors.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// Registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// VCS criteria are malformed.
    #[error(transparent)]
    Criteria(#[from] CriteriaError),
    /// Username rule failed to compile.
    #[error("username rule failed to compile: {0}")]
    UsernameRule(#[from] regex::Error),
}

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Builds a registry holding every validator kind.
///
/// # Errors
///
/// Returns [`FactoryError`] when settings are malformed or registration fails.
pub fn build_registry(
    dependencies: &ValidatorDependencies,
    settings: &ValidatorSettings,
) -> Result<ValidatorRegistry, FactoryError> {
    let queued = QueuedServices {
        state: Arc::clone(&dependencies.state),
        queue: Arc::clone(&dependencies.queue),
        clock: Arc::clone(&dependencies.clock),
        log: Arc::clone(&dependencies.log),
    };
    let mut registry = ValidatorRegistry::new();
    for kind in ValidatorKind::ALL {
        let validator: Arc<dyn Validator> = match kind {
            ValidatorKind::PackageSigningProcessor => {
                Arc::new(PackageSigningProcessor::new(queued.clone()))
            }
            ValidatorKind::PackageSignatureValidator => Arc::new(PackageSignatureValidator::new(
                queued.clone(),
                Arc::clone(&dependencies.metadata),
                UsernameRule::new()?,
                settings.repository_signing_enabled,
            )),
            ValidatorKind::SymbolValidator => Arc::new(SymbolValidator::new(queued.clone())),
            ValidatorKind::VcsValidator => Arc::new(VcsValidator::new(
                PackageCriteriaEvaluator::new(&settings.vcs_criteria)?,
                VcsServices {
                    auditor: dependencies.auditor.clone(),
                    queue: Arc::clone(&dependencies.queue),
                    metadata: Arc::clone(&dependencies.metadata),
                    clock: Arc::clone(&dependencies.clock),
                    log: Arc::clone(&dependencies.log),
                },
            )),
        };
        registry.register_kind(kind, validator)?;
    }
    Ok(registry)
}
