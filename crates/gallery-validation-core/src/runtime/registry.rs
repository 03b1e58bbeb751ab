// crates/gallery-validation-core/src/runtime/registry.rs
// ============================================================================
// Module: Validator Registry
// Description: Explicit name-to-instance map of validators built at startup.
// Purpose: Resolve configured step names without reflection or attributes.
// Dependencies: crate::core::{identifiers, kinds}, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! The registry is populated once at process start and then shared read-only.
//! It answers the same [`ValidatorProvider`] queries as the static catalog,
//! so the startup graph check runs against exactly the instances the
//! orchestrator will drive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::identifiers::ValidatorName;
use crate::core::kinds::ValidatorKind;
use crate::interfaces::Validator;
use crate::interfaces::ValidatorProvider;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A validator with the same name is already registered.
    #[error("validator already registered: {0}")]
    Duplicate(String),
    /// Instance name differs from its kind's configuration name.
    #[error("validator kind {expected} registered with instance named {actual}")]
    NameMismatch {
        /// Kind name.
        expected: String,
        /// Instance name.
        actual: String,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registered validator and its role.
#[derive(Clone)]
struct RegisteredValidator {
    /// Validator instance.
    validator: Arc<dyn Validator>,
    /// Whether the validator may replace the package artifact.
    processor: bool,
}

/// Explicit validator registry.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    /// Validators keyed by name.
    entries: BTreeMap<ValidatorName, RegisteredValidator>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validator under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when the name is taken.
    pub fn register(
        &mut self,
        validator: Arc<dyn Validator>,
        processor: bool,
    ) -> Result<(), RegistryError> {
        let name = validator.name().clone();
        if self.entries.contains_key(&name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.entries.insert(
            name,
            RegisteredValidator {
                validator,
                processor,
            },
        );
        Ok(())
    }

    /// Registers the implementation of a known [`ValidatorKind`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NameMismatch`] when the instance name differs
    /// from the kind's name, or [`RegistryError::Duplicate`].
    pub fn register_kind(
        &mut self,
        kind: ValidatorKind,
        validator: Arc<dyn Validator>,
    ) -> Result<(), RegistryError> {
        if validator.name().as_str() != kind.as_str() {
            return Err(RegistryError::NameMismatch {
                expected: kind.as_str().to_string(),
                actual: validator.name().to_string(),
            });
        }
        self.register(validator, kind.is_processor())
    }

    /// Returns the validator registered as `name`.
    #[must_use]
    pub fn get(&self, name: &ValidatorName) -> Option<Arc<dyn Validator>> {
        self.entries.get(name).map(|entry| Arc::clone(&entry.validator))
    }

    /// Returns registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<ValidatorName> {
        self.entries.keys().cloned().collect()
    }
}

impl ValidatorProvider for ValidatorRegistry {
    fn is_validator(&self, name: &str) -> bool {
        self.entries.contains_key(&ValidatorName::new(name))
    }

    fn is_processor(&self, name: &str) -> bool {
        self.entries.get(&ValidatorName::new(name)).is_some_and(|entry| entry.processor)
    }
}
