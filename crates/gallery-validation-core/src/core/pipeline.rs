// crates/gallery-validation-core/src/core/pipeline.rs
// ============================================================================
// Module: Validation Pipeline Configuration
// Description: Declarative step graphs per content type and their validator.
// Purpose: Fail fast at startup when a declared pipeline cannot execute.
// Dependencies: crate::core::{identifiers, topology}, crate::interfaces, serde
// ============================================================================

//! ## Overview
//! A [`ValidationConfiguration`] lists, per content type, the validation steps
//! and their prerequisite edges. [`ConfigurationValidator`] runs a fixed
//! sequence of check categories; each category reports every offender it
//! finds, and the first failing category aborts validation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::ContentType;
use crate::core::identifiers::ValidatorName;
use crate::core::topology::TopologicalSort;
use crate::core::topology::TopologyError;
use crate::interfaces::ValidatorProvider;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// One node of a content type's step graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfigurationItem {
    /// Step name; must match a registered validator.
    pub name: ValidatorName,
    /// Steps that must succeed before this one starts.
    #[serde(default)]
    pub required_validations: Vec<ValidatorName>,
    /// Whether the orchestrator may start this step.
    pub should_start: bool,
    /// Milliseconds after which an incomplete step is flagged as slow.
    pub track_after_ms: u64,
}

impl ValidationConfigurationItem {
    /// Builds a step from plain strings.
    #[must_use]
    pub fn new(name: &str, requires: &[&str], should_start: bool, track_after_ms: u64) -> Self {
        Self {
            name: ValidatorName::new(name),
            required_validations: requires.iter().map(|value| ValidatorName::new(*value)).collect(),
            should_start,
            track_after_ms,
        }
    }
}

/// Steps declared for one content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeSteps {
    /// Content type label.
    #[serde(rename = "name")]
    pub content_type: ContentType,
    /// Steps in declaration order.
    #[serde(default)]
    pub steps: Vec<ValidationConfigurationItem>,
}

/// Complete validation pipeline declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfiguration {
    /// Step lists per content type.
    #[serde(default)]
    pub content_types: Vec<ContentTypeSteps>,
}

impl ValidationConfiguration {
    /// Returns the steps declared for `content_type`.
    #[must_use]
    pub fn steps_for(&self, content_type: &ContentType) -> Option<&[ValidationConfigurationItem]> {
        self.content_types
            .iter()
            .find(|entry| &entry.content_type == content_type)
            .map(|entry| entry.steps.as_slice())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal pipeline configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// No content types are declared.
    #[error("validation configuration declares no content types")]
    NoContentTypes,
    /// Content types declared more than once.
    #[error("duplicate content types: {}", .0.join(", "))]
    DuplicateContentTypes(Vec<String>),
    /// Content types with an empty step list.
    #[error("content types without validation steps: {}", .0.join(", "))]
    MissingSteps(Vec<String>),
    /// Steps with an empty name or non-positive `track_after_ms`.
    #[error("invalid validation steps: {}", .0.join("; "))]
    InvalidSteps(Vec<String>),
    /// Step names declared twice within one content type.
    #[error("duplicate validation steps: {}", .0.join(", "))]
    DuplicateSteps(Vec<String>),
    /// Prerequisites naming undeclared steps.
    #[error("required validations reference unknown steps: {}", .0.join("; "))]
    UnknownPrerequisites(Vec<String>),
    /// Step names with no registered validator.
    #[error("unknown validators: {}", .0.join(", "))]
    UnknownValidators(Vec<String>),
    /// Dependency cycles.
    #[error("validation step cycles: {}", .0.join("; "))]
    Cycle(Vec<String>),
    /// Processors that could run on parallel branches.
    #[error("parallel processors: {}", .0.join("; "))]
    ParallelProcessors(Vec<String>),
    /// Enabled steps that transitively require disabled steps.
    #[error("enabled steps require disabled steps: {}", .0.join("; "))]
    DisabledPrerequisites(Vec<String>),
}

// ============================================================================
// SECTION: Configuration Validator
// ============================================================================

/// Startup verifier for a [`ValidationConfiguration`].
pub struct ConfigurationValidator<'a, P: ValidatorProvider + ?Sized> {
    /// Configuration under test.
    configuration: &'a ValidationConfiguration,
    /// Resolver for validator names.
    provider: &'a P,
}

impl<'a, P: ValidatorProvider + ?Sized> ConfigurationValidator<'a, P> {
    /// Creates a validator over `configuration`.
    #[must_use]
    pub const fn new(configuration: &'a ValidationConfiguration, provider: &'a P) -> Self {
        Self {
            configuration,
            provider,
        }
    }

    /// Runs every check category in order.
    ///
    /// # Errors
    ///
    /// Returns the [`GraphError`] of the first failing category.
    pub fn validate(&self) -> Result<(), GraphError> {
        self.ensure_steps_declared()?;
        self.ensure_steps_well_formed()?;
        self.ensure_unique_steps()?;
        self.ensure_prerequisites_declared()?;
        self.ensure_validators_registered()?;
        self.ensure_topology()?;
        self.ensure_enabled_prerequisites()?;
        Ok(())
    }

    /// Every content type is unique and has at least one step.
    fn ensure_steps_declared(&self) -> Result<(), GraphError> {
        if self.configuration.content_types.is_empty() {
            return Err(GraphError::NoContentTypes);
        }
        let mut seen = BTreeSet::new();
        let mut duplicates = Vec::new();
        for entry in &self.configuration.content_types {
            if !seen.insert(entry.content_type.as_str()) {
                duplicates.push(entry.content_type.to_string());
            }
        }
        if !duplicates.is_empty() {
            return Err(GraphError::DuplicateContentTypes(duplicates));
        }
        let missing: Vec<String> = self
            .configuration
            .content_types
            .iter()
            .filter(|entry| entry.steps.is_empty())
            .map(|entry| entry.content_type.to_string())
            .collect();
        if missing.is_empty() { Ok(()) } else { Err(GraphError::MissingSteps(missing)) }
    }

    /// Every step has a name and a positive slow-step threshold.
    fn ensure_steps_well_formed(&self) -> Result<(), GraphError> {
        let mut problems = Vec::new();
        for entry in &self.configuration.content_types {
            for (index, step) in entry.steps.iter().enumerate() {
                if step.name.as_str().trim().is_empty() {
                    problems.push(format!("{}: step #{index} has an empty name", entry.content_type));
                }
                if step.track_after_ms == 0 {
                    problems.push(format!(
                        "{}/{}: track_after_ms must be positive",
                        entry.content_type, step.name
                    ));
                }
            }
        }
        if problems.is_empty() { Ok(()) } else { Err(GraphError::InvalidSteps(problems)) }
    }

    /// Step names are unique within each content type.
    fn ensure_unique_steps(&self) -> Result<(), GraphError> {
        let mut duplicates = Vec::new();
        for entry in &self.configuration.content_types {
            for (index, step) in entry.steps.iter().enumerate() {
                let earlier = entry.steps[.. index].iter().any(|other| other.name == step.name);
                let reported = duplicates.contains(&qualified(&entry.content_type, &step.name));
                if earlier && !reported {
                    duplicates.push(qualified(&entry.content_type, &step.name));
                }
            }
        }
        if duplicates.is_empty() { Ok(()) } else { Err(GraphError::DuplicateSteps(duplicates)) }
    }

    /// Every prerequisite names a step of the same content type.
    fn ensure_prerequisites_declared(&self) -> Result<(), GraphError> {
        let mut missing = Vec::new();
        for entry in &self.configuration.content_types {
            for step in &entry.steps {
                for required in &step.required_validations {
                    if !entry.steps.iter().any(|candidate| &candidate.name == required) {
                        missing.push(format!(
                            "{} requires {required}",
                            qualified(&entry.content_type, &step.name)
                        ));
                    }
                }
            }
        }
        if missing.is_empty() { Ok(()) } else { Err(GraphError::UnknownPrerequisites(missing)) }
    }

    /// Every step name resolves to a registered validator.
    fn ensure_validators_registered(&self) -> Result<(), GraphError> {
        let mut unknown: Vec<String> = Vec::new();
        for entry in &self.configuration.content_types {
            for step in &entry.steps {
                let name = step.name.to_string();
                if !self.provider.is_validator(step.name.as_str()) && !unknown.contains(&name) {
                    unknown.push(name);
                }
            }
        }
        if unknown.is_empty() { Ok(()) } else { Err(GraphError::UnknownValidators(unknown)) }
    }

    /// Graphs are acyclic and processors are totally ordered.
    fn ensure_topology(&self) -> Result<(), GraphError> {
        let mut cycles = Vec::new();
        let mut parallel = Vec::new();
        for entry in &self.configuration.content_types {
            let result = TopologicalSort::validate(&entry.steps, |name| {
                self.provider.is_processor(name.as_str())
            });
            match result {
                Ok(_) => {}
                Err(error @ TopologyError::Cycle(_)) => {
                    cycles.push(format!("{}: {error}", entry.content_type));
                }
                Err(error @ TopologyError::ParallelProcessors(_)) => {
                    parallel.push(format!("{}: {error}", entry.content_type));
                }
                Err(error @ TopologyError::UnknownPrerequisite {
                    ..
                }) => {
                    return Err(GraphError::UnknownPrerequisites(vec![format!(
                        "{}: {error}",
                        entry.content_type
                    )]));
                }
            }
        }
        if !cycles.is_empty() {
            return Err(GraphError::Cycle(cycles));
        }
        if !parallel.is_empty() {
            return Err(GraphError::ParallelProcessors(parallel));
        }
        Ok(())
    }

    /// No enabled step transitively requires a disabled step.
    fn ensure_enabled_prerequisites(&self) -> Result<(), GraphError> {
        let mut violations = Vec::new();
        for entry in &self.configuration.content_types {
            for step in entry.steps.iter().filter(|step| step.should_start) {
                let ancestors = TopologicalSort::prerequisites_of(&entry.steps, &step.name)
                    .map_err(|error| {
                        GraphError::UnknownPrerequisites(vec![format!(
                            "{}: {error}",
                            entry.content_type
                        )])
                    })?;
                for ancestor in ancestors {
                    let disabled = entry
                        .steps
                        .iter()
                        .any(|candidate| candidate.name == ancestor && !candidate.should_start);
                    if disabled {
                        violations.push(format!(
                            "{} requires disabled {ancestor}",
                            qualified(&entry.content_type, &step.name)
                        ));
                    }
                }
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(GraphError::DisabledPrerequisites(violations))
        }
    }
}

/// Formats `content_type/step` for error messages.
fn qualified(content_type: &ContentType, step: &ValidatorName) -> String {
    format!("{content_type}/{step}")
}
