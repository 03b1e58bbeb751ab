// crates/gallery-validation-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Validation Stores
// Description: In-memory validator status and validation set stores.
// Purpose: Provide deterministic store implementations without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of
//! [`ValidatorStateService`] and [`ValidationSetStore`] for tests and local
//! runs. The conditional status write is shared with durable backends through
//! [`compare_and_transition`] so every store enforces the same state machine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::identifiers::ValidationId;
use crate::core::identifiers::ValidationSetId;
use crate::core::identifiers::ValidatorName;
use crate::core::set::PackageValidationSet;
use crate::core::status::StatusTransition;
use crate::core::status::ValidationRequest;
use crate::core::status::ValidationResult;
use crate::core::status::ValidationStatus;
use crate::core::status::ValidatorStatus;
use crate::interfaces::StoreError;
use crate::interfaces::ValidationSetStore;
use crate::interfaces::ValidatorStateService;

// ============================================================================
// SECTION: Conditional Transition
// ============================================================================

/// Applies `result` to `current` if `current` is still in `previous`.
///
/// Returns the record to persist (when applied) alongside the transition
/// outcome. On conflict the current record is returned unchanged.
///
/// # Errors
///
/// Returns [`StoreError::InvalidTransition`] when `previous -> result.status`
/// is not a legal transition.
pub fn compare_and_transition(
    current: &ValidatorStatus,
    previous: ValidationStatus,
    result: &ValidationResult,
) -> Result<StatusTransition, StoreError> {
    if !previous.can_transition_to(result.status) {
        return Err(StoreError::InvalidTransition {
            from: previous,
            to: result.status,
        });
    }
    if current.state != previous {
        return Ok(StatusTransition {
            applied: false,
            current: current.clone(),
        });
    }
    let mut next = current.clone();
    next.state = result.status;
    next.nupkg_url.clone_from(&result.nupkg_url);
    next.issues.clone_from(&result.issues);
    Ok(StatusTransition {
        applied: true,
        current: next,
    })
}

// ============================================================================
// SECTION: Validator Status Store
// ============================================================================

/// In-memory validator status store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryValidatorStateStore {
    /// Status records keyed by validator name and validation id.
    statuses: Arc<Mutex<BTreeMap<(ValidatorName, ValidationId), ValidatorStatus>>>,
}

impl InMemoryValidatorStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            statuses: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Applies a conditional write under the store mutex.
    fn transition(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
        previous: ValidationStatus,
        result: &ValidationResult,
    ) -> Result<StatusTransition, StoreError> {
        let mut guard = self
            .statuses
            .lock()
            .map_err(|_| StoreError::Store("validator status store mutex poisoned".to_string()))?;
        let key = (validator.clone(), request.validation_id);
        let current = guard
            .get(&key)
            .cloned()
            .unwrap_or_else(|| ValidatorStatus::not_started(validator, request));
        let transition = compare_and_transition(&current, previous, result)?;
        if transition.applied {
            guard.insert(key, transition.current.clone());
        }
        drop(guard);
        Ok(transition)
    }
}

#[async_trait]
impl ValidatorStateService for InMemoryValidatorStateStore {
    async fn get_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
    ) -> Result<ValidatorStatus, StoreError> {
        let guard = self
            .statuses
            .lock()
            .map_err(|_| StoreError::Store("validator status store mutex poisoned".to_string()))?;
        Ok(guard
            .get(&(validator.clone(), request.validation_id))
            .cloned()
            .unwrap_or_else(|| ValidatorStatus::not_started(validator, request)))
    }

    async fn try_add_validator_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
        previous: ValidationStatus,
        new_status: ValidationStatus,
    ) -> Result<StatusTransition, StoreError> {
        self.transition(validator, request, previous, &ValidationResult::from_status(new_status))
    }

    async fn try_update_validator_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
        previous: ValidationStatus,
        result: &ValidationResult,
    ) -> Result<StatusTransition, StoreError> {
        self.transition(validator, request, previous, result)
    }
}

// ============================================================================
// SECTION: Validation Set Store
// ============================================================================

/// In-memory validation set store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryValidationSetStore {
    /// Sets keyed by identifier.
    sets: Arc<Mutex<BTreeMap<ValidationSetId, PackageValidationSet>>>,
}

impl InMemoryValidationSetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sets: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

#[async_trait]
impl ValidationSetStore for InMemoryValidationSetStore {
    async fn load(
        &self,
        set_id: &ValidationSetId,
    ) -> Result<Option<PackageValidationSet>, StoreError> {
        let guard = self
            .sets
            .lock()
            .map_err(|_| StoreError::Store("validation set store mutex poisoned".to_string()))?;
        Ok(guard.get(set_id).cloned())
    }

    async fn save(&self, set: &PackageValidationSet) -> Result<(), StoreError> {
        self.sets
            .lock()
            .map_err(|_| StoreError::Store("validation set store mutex poisoned".to_string()))?
            .insert(set.set_id, set.clone());
        Ok(())
    }
}
