// crates/gallery-validation-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Validation Orchestrator
// Description: Drives validation sets through the configured step graph.
// Purpose: Start eligible steps, poll running ones, and aggregate outcomes.
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! [`ValidationOrchestrator`] owns the validated pipeline configuration and the
//! validator registry. Each [`ValidationOrchestrator::process`] call is one
//! polling pass over a set: steps are visited in topological order, running
//! steps are polled, and a not-started enabled step is started only once all
//! its prerequisites have succeeded. The set is persisted after every step
//! transition so a crashed pass resumes from the last recorded state.
//!
//! Security posture: step results are trusted only within the status state
//! machine; a validator reporting a regressing status is rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::identifiers::ContentType;
use crate::core::identifiers::PackageId;
use crate::core::identifiers::PackageKey;
use crate::core::identifiers::PackageVersion;
use crate::core::identifiers::ValidationId;
use crate::core::identifiers::ValidationSetId;
use crate::core::identifiers::ValidatorName;
use crate::core::pipeline::ConfigurationValidator;
use crate::core::pipeline::GraphError;
use crate::core::pipeline::ValidationConfiguration;
use crate::core::pipeline::ValidationConfigurationItem;
use crate::core::set::PackageValidation;
use crate::core::set::PackageValidationSet;
use crate::core::set::SetOutcome;
use crate::core::status::ValidationIssue;
use crate::core::status::ValidationResult;
use crate::core::status::ValidationStatus;
use crate::core::time::Clock;
use crate::core::topology::TopologicalSort;
use crate::core::topology::TopologyError;
use crate::interfaces::NotifyError;
use crate::interfaces::OutcomeNotifier;
use crate::interfaces::StoreError;
use crate::interfaces::ValidationSetStore;
use crate::interfaces::Validator;
use crate::interfaces::ValidatorError;
use crate::interfaces::ValidatorProvider;
use crate::runtime::log::LogLevel;
use crate::runtime::log::SharedLogSink;
use crate::runtime::log::ValidationLogEvent;
use crate::runtime::registry::ValidatorRegistry;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Orchestration errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Pipeline configuration is invalid.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Step graph could not be ordered.
    #[error(transparent)]
    Topology(#[from] TopologyError),
    /// Content type has no declared steps.
    #[error("unknown content type: {0}")]
    UnknownContentType(String),
    /// Validation set does not exist.
    #[error("validation set not found: {0}")]
    SetNotFound(String),
    /// Configured step has no registered validator.
    #[error("no validator registered for step: {0}")]
    MissingValidator(String),
    /// Validator reported a status the state machine forbids.
    #[error("step {step} reported illegal transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Step name.
        step: String,
        /// Recorded status.
        from: ValidationStatus,
        /// Reported status.
        to: ValidationStatus,
    },
    /// Set store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Validator call failed.
    #[error("validator {step} failed: {source}")]
    Validator {
        /// Step name.
        step: String,
        /// Underlying error.
        #[source]
        source: ValidatorError,
    },
    /// Outcome notification failed.
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl OrchestratorError {
    /// Returns false when the enclosing message must be dead-lettered.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validator {
                source, ..
            } => source.is_retryable(),
            Self::Store(_) | Self::Notify(_) => true,
            Self::Graph(_)
            | Self::Topology(_)
            | Self::UnknownContentType(_)
            | Self::SetNotFound(_)
            | Self::MissingValidator(_)
            | Self::IllegalTransition {
                ..
            } => false,
        }
    }
}

// ============================================================================
// SECTION: Requests and Reports
// ============================================================================

/// Package version entering validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageValidationInput {
    /// Content type whose step graph applies.
    pub content_type: ContentType,
    /// Gallery package key.
    pub package_key: PackageKey,
    /// Package identifier.
    pub package_id: PackageId,
    /// Package version.
    pub package_version: PackageVersion,
    /// Artifact URL.
    pub nupkg_url: String,
}

/// Result of one processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    /// Aggregate outcome after the pass.
    pub outcome: SetOutcome,
    /// Issues surfaced by every step.
    pub issues: Vec<ValidationIssue>,
    /// Steps started during this pass.
    pub started: Vec<ValidatorName>,
    /// Incomplete steps running longer than their `track_after_ms`.
    pub slow_steps: Vec<ValidatorName>,
    /// True when this pass delivered the terminal outcome downstream.
    pub notified: bool,
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Validation set driver.
pub struct ValidationOrchestrator<S, N> {
    /// Validated pipeline configuration.
    configuration: ValidationConfiguration,
    /// Step execution order per content type.
    orders: BTreeMap<ContentType, Vec<ValidatorName>>,
    /// Registered validators.
    registry: ValidatorRegistry,
    /// Validation set persistence.
    sets: S,
    /// Terminal outcome receiver.
    notifier: N,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Log sink.
    log: SharedLogSink,
}

impl<S, N> ValidationOrchestrator<S, N>
where
    S: ValidationSetStore,
    N: OutcomeNotifier,
{
    /// Creates an orchestrator after validating `configuration` against `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Graph`] when the configuration is invalid.
    pub fn new(
        configuration: ValidationConfiguration,
        registry: ValidatorRegistry,
        sets: S,
        notifier: N,
        clock: Arc<dyn Clock>,
        log: SharedLogSink,
    ) -> Result<Self, OrchestratorError> {
        ConfigurationValidator::new(&configuration, &registry).validate()?;
        let mut orders = BTreeMap::new();
        for entry in &configuration.content_types {
            orders.insert(entry.content_type.clone(), TopologicalSort::order(&entry.steps)?);
        }
        Ok(Self {
            configuration,
            orders,
            registry,
            sets,
            notifier,
            clock,
            log,
        })
    }

    /// Creates and persists a new set with every step `NotStarted`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::UnknownContentType`] or a store error.
    pub async fn create_set(
        &self,
        input: PackageValidationInput,
    ) -> Result<PackageValidationSet, OrchestratorError> {
        let steps = self.steps_for(&input.content_type)?;
        let set = PackageValidationSet {
            set_id: ValidationSetId::generate(),
            validation_id: ValidationId::generate(),
            content_type: input.content_type,
            package_key: input.package_key,
            package_id: input.package_id,
            package_version: input.package_version,
            nupkg_url: input.nupkg_url,
            created: self.clock.now(),
            validations: steps
                .iter()
                .map(|step| PackageValidation::not_started(step.name.clone()))
                .collect(),
            outcome_notified: false,
        };
        self.sets.save(&set).await?;
        Ok(set)
    }

    /// Runs one processing pass over the set.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the set cannot be loaded or saved,
    /// a validator call fails, or notification fails. Progress made before
    /// the failure is already persisted.
    pub async fn process(&self, set_id: &ValidationSetId) -> Result<ProcessReport, OrchestratorError> {
        let mut set = self
            .sets
            .load(set_id)
            .await?
            .ok_or_else(|| OrchestratorError::SetNotFound(set_id.to_string()))?;
        let steps = self.steps_for(&set.content_type)?;
        let order = self
            .orders
            .get(&set.content_type)
            .ok_or_else(|| OrchestratorError::UnknownContentType(set.content_type.to_string()))?;

        let mut started = Vec::new();
        for name in order {
            let Some(step) = steps.iter().find(|step| &step.name == name) else {
                continue;
            };
            let status = current_status(&set, name)?;
            match status {
                ValidationStatus::Incomplete => {
                    let validator = self.validator(name)?;
                    let result = validator
                        .get_result(&set.request())
                        .await
                        .map_err(|source| validator_error(name, source))?;
                    if result.status != status {
                        self.apply_result(&mut set, name, result)?;
                        self.sets.save(&set).await?;
                    }
                }
                ValidationStatus::NotStarted => {
                    if !step.should_start || has_failure(&set) || !prerequisites_met(&set, step) {
                        continue;
                    }
                    let validator = self.validator(name)?;
                    let result = validator
                        .start(&set.request())
                        .await
                        .map_err(|source| validator_error(name, source))?;
                    if result.status == ValidationStatus::NotStarted {
                        continue;
                    }
                    if let Some(record) = set.validation_mut(name) {
                        record.started = Some(self.clock.now());
                    }
                    self.apply_result(&mut set, name, result)?;
                    self.sets.save(&set).await?;
                    started.push(name.clone());
                    self.log(
                        ValidationLogEvent::new(
                            "step_started",
                            LogLevel::Info,
                            self.clock.now(),
                            format!("started {name}"),
                        )
                        .for_request(name, &set.request()),
                    );
                }
                ValidationStatus::Succeeded | ValidationStatus::Failed => {}
            }
        }

        let outcome = aggregate_outcome(&set, steps);
        let slow_steps = self.slow_steps(&set, steps);
        for name in &slow_steps {
            self.log(
                ValidationLogEvent::new(
                    "step_taking_too_long",
                    LogLevel::Warn,
                    self.clock.now(),
                    format!("{name} exceeded its tracking threshold"),
                )
                .for_request(name, &set.request()),
            );
        }
        let mut notified = false;
        if outcome.is_terminal() && !set.outcome_notified {
            self.notifier.notify(&set, outcome).await?;
            set.outcome_notified = true;
            self.sets.save(&set).await?;
            notified = true;
            self.log(ValidationLogEvent::new(
                "set_completed",
                LogLevel::Info,
                self.clock.now(),
                format!("validation set {} finished as {}", set.set_id, outcome.as_str()),
            ));
        }
        Ok(ProcessReport {
            outcome,
            issues: set.issues(),
            started,
            slow_steps,
            notified,
        })
    }

    /// Returns the steps declared for `content_type`.
    fn steps_for(
        &self,
        content_type: &ContentType,
    ) -> Result<&[ValidationConfigurationItem], OrchestratorError> {
        self.configuration
            .steps_for(content_type)
            .ok_or_else(|| OrchestratorError::UnknownContentType(content_type.to_string()))
    }

    /// Resolves the validator for `name`.
    fn validator(
        &self,
        name: &ValidatorName,
    ) -> Result<Arc<dyn Validator>, OrchestratorError> {
        self.registry.get(name).ok_or_else(|| OrchestratorError::MissingValidator(name.to_string()))
    }

    /// Records `result` on the step and adopts a processor's replacement artifact.
    fn apply_result(
        &self,
        set: &mut PackageValidationSet,
        name: &ValidatorName,
        result: ValidationResult,
    ) -> Result<(), OrchestratorError> {
        let processor = self.registry.is_processor(name.as_str());
        let now = self.clock.now();
        let request = set.request();
        let Some(record) = set.validation_mut(name) else {
            return Err(missing_record(name));
        };
        if result.status != record.status && !record.status.can_transition_to(result.status) {
            return Err(OrchestratorError::IllegalTransition {
                step: name.to_string(),
                from: record.status,
                to: result.status,
            });
        }
        record.status = result.status;
        record.issues = result.issues;
        if result.status.is_terminal() && record.completed.is_none() {
            record.completed = Some(now);
        }
        let Some(url) = result.nupkg_url else {
            return Ok(());
        };
        record.nupkg_url = Some(url.clone());
        if processor && result.status == ValidationStatus::Succeeded {
            set.nupkg_url = url;
        } else if !processor {
            self.log(
                ValidationLogEvent::new(
                    "unexpected_artifact_replacement",
                    LogLevel::Warn,
                    now,
                    format!("{name} is not a processor; replacement artifact ignored"),
                )
                .for_request(name, &request),
            );
        }
        Ok(())
    }

    /// Returns incomplete steps running past their tracking threshold.
    fn slow_steps(
        &self,
        set: &PackageValidationSet,
        steps: &[ValidationConfigurationItem],
    ) -> Vec<ValidatorName> {
        let now = self.clock.now();
        steps
            .iter()
            .filter(|step| {
                set.validation(&step.name).is_some_and(|record| {
                    record.status == ValidationStatus::Incomplete
                        && record
                            .started
                            .is_some_and(|started| now.millis_since(started) > step.track_after_ms)
                })
            })
            .map(|step| step.name.clone())
            .collect()
    }

    /// Records a log event.
    fn log(&self, event: ValidationLogEvent) {
        self.log.record(&event);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the recorded status of step `name`.
fn current_status(
    set: &PackageValidationSet,
    name: &ValidatorName,
) -> Result<ValidationStatus, OrchestratorError> {
    set.validation(name).map(|record| record.status).ok_or_else(|| missing_record(name))
}

/// Error for a configured step missing from a persisted set.
fn missing_record(name: &ValidatorName) -> OrchestratorError {
    OrchestratorError::Store(StoreError::Corrupt(format!("validation set has no record for {name}")))
}

/// Wraps a validator error with its step name.
fn validator_error(name: &ValidatorName, source: ValidatorError) -> OrchestratorError {
    OrchestratorError::Validator {
        step: name.to_string(),
        source,
    }
}

/// Returns true when any step failed.
fn has_failure(set: &PackageValidationSet) -> bool {
    set.validations.iter().any(|record| record.status == ValidationStatus::Failed)
}

/// Returns true when every prerequisite of `step` succeeded.
fn prerequisites_met(set: &PackageValidationSet, step: &ValidationConfigurationItem) -> bool {
    step.required_validations.iter().all(|required| {
        set.validation(required).is_some_and(|record| record.status == ValidationStatus::Succeeded)
    })
}

/// Aggregates step records into the set outcome.
///
/// Disabled steps that never started are skipped.
fn aggregate_outcome(set: &PackageValidationSet, steps: &[ValidationConfigurationItem]) -> SetOutcome {
    if has_failure(set) {
        return SetOutcome::Failed;
    }
    let all_succeeded = steps.iter().filter(|step| step.should_start).all(|step| {
        set.validation(&step.name).is_some_and(|record| record.status == ValidationStatus::Succeeded)
    });
    if all_succeeded { SetOutcome::Succeeded } else { SetOutcome::InProgress }
}
