// crates/gallery-validation-core/tests/graph_validation.rs
// ============================================================================
// Module: Graph Validation Tests
// Description: Startup checks over declared validation step graphs.
// Purpose: Ensure invalid pipelines are rejected with precise messages.
// ============================================================================

//! Configuration validator tests for unknown steps, cycles, and disabled prerequisites.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use gallery_validation_core::ConfigurationValidator;
use gallery_validation_core::ContentType;
use gallery_validation_core::ContentTypeSteps;
use gallery_validation_core::GraphError;
use gallery_validation_core::TopologicalSort;
use gallery_validation_core::ValidationConfiguration;
use gallery_validation_core::ValidationConfigurationItem;
use gallery_validation_core::ValidatorCatalog;
use gallery_validation_core::ValidatorName;
use gallery_validation_core::ValidatorProvider;
use proptest::prelude::*;

type TestResult = Result<(), String>;

/// Provider over explicit name lists.
struct ListProvider {
    validators: Vec<String>,
    processors: Vec<String>,
}

impl ListProvider {
    fn new(validators: &[&str], processors: &[&str]) -> Self {
        Self {
            validators: validators.iter().map(ToString::to_string).collect(),
            processors: processors.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ValidatorProvider for ListProvider {
    fn is_validator(&self, name: &str) -> bool {
        self.validators.iter().any(|candidate| candidate == name)
    }

    fn is_processor(&self, name: &str) -> bool {
        self.processors.iter().any(|candidate| candidate == name)
    }
}

fn step(name: &str, requires: &[&str], should_start: bool) -> ValidationConfigurationItem {
    ValidationConfigurationItem::new(name, requires, should_start, 60_000)
}

fn config(steps: Vec<ValidationConfigurationItem>) -> ValidationConfiguration {
    ValidationConfiguration {
        content_types: vec![ContentTypeSteps {
            content_type: ContentType::new("NuGet"),
            steps,
        }],
    }
}

fn assert_invalid(result: Result<(), GraphError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid configuration".to_string()),
    }
}

#[test]
fn unknown_prerequisite_is_named() -> TestResult {
    let provider = ListProvider::new(&["A", "B"], &[]);
    let configuration = config(vec![step("A", &[], true), step("B", &["Missing"], true)]);
    let result = ConfigurationValidator::new(&configuration, &provider).validate();
    assert!(matches!(result, Err(GraphError::UnknownPrerequisites(_))));
    assert_invalid(result, "NuGet/B requires Missing")
}

#[test]
fn processor_cycle_is_rejected() -> TestResult {
    let provider = ListProvider::new(&["A", "B", "C"], &["A", "B", "C"]);
    let configuration =
        config(vec![step("A", &["C"], true), step("B", &["A"], true), step("C", &["B"], true)]);
    let result = ConfigurationValidator::new(&configuration, &provider).validate();
    assert!(matches!(result, Err(GraphError::Cycle(_))));
    assert_invalid(result, "A -> B -> C -> A")
}

#[test]
fn enabled_step_requiring_disabled_step_is_rejected() -> TestResult {
    let provider = ListProvider::new(&["X", "Y"], &[]);
    let configuration = config(vec![step("Y", &[], false), step("X", &["Y"], true)]);
    assert_invalid(
        ConfigurationValidator::new(&configuration, &provider).validate(),
        "NuGet/X requires disabled Y",
    )
}

#[test]
fn transitive_disabled_prerequisite_is_rejected() -> TestResult {
    let provider = ListProvider::new(&["X", "Y", "Z"], &[]);
    let configuration =
        config(vec![step("Z", &[], false), step("Y", &["Z"], false), step("X", &["Y"], true)]);
    assert_invalid(
        ConfigurationValidator::new(&configuration, &provider).validate(),
        "NuGet/X requires disabled Z",
    )
}

#[test]
fn disabled_step_may_require_disabled_step() {
    let provider = ListProvider::new(&["X", "Y"], &[]);
    let configuration = config(vec![step("Y", &[], false), step("X", &["Y"], false)]);
    assert!(ConfigurationValidator::new(&configuration, &provider).validate().is_ok());
}

#[test]
fn processor_then_validator_is_accepted() {
    let provider = ListProvider::new(&["Processor", "Validator"], &["Processor"]);
    let configuration =
        config(vec![step("Processor", &[], true), step("Validator", &["Processor"], true)]);
    assert!(ConfigurationValidator::new(&configuration, &provider).validate().is_ok());
}

#[test]
fn parallel_processors_are_rejected() -> TestResult {
    let provider = ListProvider::new(&["P1", "P2", "V"], &["P1", "P2"]);
    let configuration =
        config(vec![step("V", &[], true), step("P1", &["V"], true), step("P2", &["V"], true)]);
    assert_invalid(
        ConfigurationValidator::new(&configuration, &provider).validate(),
        "processors may run in parallel: P1/P2",
    )
}

#[test]
fn validator_names_are_case_sensitive() -> TestResult {
    let configuration = config(vec![step("vcsvalidator", &[], true)]);
    assert_invalid(
        ConfigurationValidator::new(&configuration, &ValidatorCatalog).validate(),
        "unknown validators: vcsvalidator",
    )
}

#[test]
fn every_duplicate_in_a_category_is_reported() -> TestResult {
    let provider = ListProvider::new(&["A", "B"], &[]);
    let configuration = config(vec![
        step("A", &[], true),
        step("A", &[], true),
        step("B", &[], true),
        step("B", &[], true),
    ]);
    assert_invalid(
        ConfigurationValidator::new(&configuration, &provider).validate(),
        "duplicate validation steps: NuGet/A, NuGet/B",
    )
}

#[test]
fn zero_track_after_is_rejected() -> TestResult {
    let provider = ListProvider::new(&["A"], &[]);
    let configuration = config(vec![ValidationConfigurationItem::new("A", &[], true, 0)]);
    assert_invalid(
        ConfigurationValidator::new(&configuration, &provider).validate(),
        "NuGet/A: track_after_ms must be positive",
    )
}

#[test]
fn content_type_without_steps_is_rejected() -> TestResult {
    let provider = ListProvider::new(&[], &[]);
    let configuration = config(Vec::new());
    assert_invalid(
        ConfigurationValidator::new(&configuration, &provider).validate(),
        "content types without validation steps: NuGet",
    )
}

#[test]
fn empty_configuration_is_rejected() {
    let provider = ListProvider::new(&[], &[]);
    let configuration = ValidationConfiguration::default();
    assert_eq!(
        ConfigurationValidator::new(&configuration, &provider).validate(),
        Err(GraphError::NoContentTypes)
    );
}

// ============================================================================
// SECTION: Property Tests
// ============================================================================

/// Builds a DAG where step `i` may only require steps with a lower index.
fn dag_steps(edges: &[Vec<bool>]) -> Vec<ValidationConfigurationItem> {
    edges
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let requires: Vec<String> = row
                .iter()
                .take(index)
                .enumerate()
                .filter(|(_, present)| **present)
                .map(|(prereq, _)| format!("S{prereq}"))
                .collect();
            let requires: Vec<&str> = requires.iter().map(String::as_str).collect();
            ValidationConfigurationItem::new(&format!("S{index}"), &requires, true, 1_000)
        })
        .collect()
}

fn edge_matrix() -> impl Strategy<Value = Vec<Vec<bool>>> {
    (2usize .. 8).prop_flat_map(|size| {
        prop::collection::vec(prop::collection::vec(any::<bool>(), size), size)
    })
}

proptest! {
    #[test]
    fn generated_dags_have_a_consistent_order(edges in edge_matrix()) {
        let steps = dag_steps(&edges);
        let order = TopologicalSort::order(&steps).unwrap();
        prop_assert_eq!(order.len(), steps.len());
        for step in &steps {
            let position = order.iter().position(|name| name == &step.name).unwrap();
            for required in &step.required_validations {
                let before = order.iter().position(|name| name == required).unwrap();
                prop_assert!(before < position);
            }
        }
    }

    #[test]
    fn back_edge_on_a_chain_is_a_cycle(size in 2usize .. 8, target in 0usize .. 8) {
        let target = target % size;
        let mut steps: Vec<ValidationConfigurationItem> = (0 .. size)
            .map(|index| {
                let previous = index.checked_sub(1).map(|prev| format!("S{prev}"));
                let requires: Vec<&str> = previous.iter().map(String::as_str).collect();
                ValidationConfigurationItem::new(&format!("S{index}"), &requires, true, 1_000)
            })
            .collect();
        steps[target].required_validations.push(ValidatorName::new(format!("S{}", size - 1)));
        let result = TopologicalSort::order(&steps);
        prop_assert!(matches!(result, Err(gallery_validation_core::TopologyError::Cycle(_))));
    }
}
