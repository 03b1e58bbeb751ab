// crates/gallery-validation-validators/src/symbols.rs
// ============================================================================
// Module: Symbol Validator
// Description: Hands symbol packages to the symbol processing topic.
// Purpose: Validate symbols against their assemblies out of process.
// Dependencies: gallery-validation-core, async-trait
// ============================================================================

//! ## Overview
//! Duplicate enqueues can happen when two starts race on the status store;
//! the symbol worker tolerates them, so the loser only logs the race.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use gallery_validation_core::MessageTopic;
use gallery_validation_core::ValidationRequest;
use gallery_validation_core::ValidationResult;
use gallery_validation_core::Validator;
use gallery_validation_core::ValidatorError;
use gallery_validation_core::ValidatorKind;
use gallery_validation_core::ValidatorName;

use crate::queued::QueuedServices;
use crate::queued::QueuedValidator;

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Symbol package validator.
#[derive(Clone)]
pub struct SymbolValidator {
    /// Queue-backed engine.
    engine: QueuedValidator,
}

impl SymbolValidator {
    /// Creates the validator.
    #[must_use]
    pub fn new(services: QueuedServices) -> Self {
        Self {
            engine: QueuedValidator::new(
                ValidatorKind::SymbolValidator.as_str(),
                MessageTopic::SymbolValidation,
                false,
                services,
            ),
        }
    }
}

#[async_trait]
impl Validator for SymbolValidator {
    fn name(&self) -> &ValidatorName {
        self.engine.name()
    }

    async fn start(&self, request: &ValidationRequest) -> Result<ValidationResult, ValidatorError> {
        self.engine.start(request).await
    }

    async fn get_result(
        &self,
        request: &ValidationRequest,
    ) -> Result<ValidationResult, ValidatorError> {
        self.engine.get_result(request).await
    }
}
