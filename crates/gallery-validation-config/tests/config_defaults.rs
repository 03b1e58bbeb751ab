//! Config defaults and graph validation tests for gallery-validation-config.
// crates/gallery-validation-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults and Graph Validation Tests
// Description: Validate default behavior and step graph verification.
// Purpose: Ensure the minimal config is valid and broken graphs abort startup.
// =============================================================================

use gallery_validation_config::ConfigError;
use gallery_validation_config::LogSinkType;
use gallery_validation_config::StateStoreType;
use gallery_validation_core::ContentType;
use gallery_validation_core::GraphError;
use gallery_validation_core::ValidatorName;

mod common;

use crate::common::TestResult;
use crate::common::assert_invalid;

#[test]
fn minimal_config_validates() -> TestResult {
    let config = common::minimal_config()?;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn section_defaults_are_applied() -> TestResult {
    let config = common::minimal_config()?;
    if config.signing.repository_signing_enabled {
        return Err("repository signing should default to disabled".to_string());
    }
    if config.state_store.store_type != StateStoreType::Memory {
        return Err("state_store should default to memory".to_string());
    }
    if config.logging.sink != LogSinkType::Stderr {
        return Err("logging should default to stderr".to_string());
    }
    let audit = config.audit.auditor_settings();
    if audit.container_prefix != "validation"
        || audit.lease_ms != 30_000
        || audit.max_lease_attempts != 10
        || audit.lease_retry_delay_ms != 50
    {
        return Err("unexpected audit defaults".to_string());
    }
    if config.state_store.sqlite_config().is_some() {
        return Err("memory store must not produce sqlite config".to_string());
    }
    Ok(())
}

#[test]
fn empty_config_declares_no_content_types() -> TestResult {
    let config = common::config_from_toml("").map_err(|err| err.to_string())?;
    match config.validate() {
        Err(ConfigError::Graph(GraphError::NoContentTypes)) => Ok(()),
        other => Err(format!("expected NoContentTypes, got {}", describe(other))),
    }
}

#[test]
fn unknown_validator_is_a_graph_error() -> TestResult {
    let mut config = common::minimal_config()?;
    config.validation.content_types[0].steps[3].name = ValidatorName::new("SymbolsValidator");
    match config.validate() {
        Err(ConfigError::Graph(GraphError::UnknownValidators(names))) => {
            if names == vec!["SymbolsValidator".to_string()] {
                Ok(())
            } else {
                Err(format!("unexpected unknown validators: {}", names.join(",")))
            }
        }
        other => Err(format!("expected UnknownValidators, got {}", describe(other))),
    }
}

#[test]
fn enabled_step_requiring_disabled_step_is_rejected() -> TestResult {
    let mut config = common::minimal_config()?;
    config.validation.content_types[0].steps[0].should_start = false;
    assert_invalid(config.validate(), "enabled steps require disabled steps")
}

#[test]
fn processors_in_separate_content_types_are_independent() -> TestResult {
    let config = common::config_from_toml(
        r#"
[[validation.content_types]]
name = "NuGet"

[[validation.content_types.steps]]
name = "PackageSigningProcessor"
should_start = true
track_after_ms = 1000

[[validation.content_types]]
name = "Symbols"

[[validation.content_types.steps]]
name = "SymbolValidator"
should_start = true
track_after_ms = 1000
"#,
    )
    .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn execution_plan_respects_prerequisites() -> TestResult {
    let config = common::minimal_config()?;
    let plans = config.execution_plan().map_err(|err| err.to_string())?;
    if plans.len() != 1 || plans[0].content_type != ContentType::new("NuGet") {
        return Err("expected a single NuGet plan".to_string());
    }
    let position = |name: &str| {
        plans[0].steps.iter().position(|step| step.as_str() == name).ok_or_else(|| name.to_string())
    };
    let vcs = position("VcsValidator")?;
    let signing = position("PackageSigningProcessor")?;
    let signature = position("PackageSignatureValidator")?;
    position("SymbolValidator")?;
    if !(vcs < signing && signing < signature) {
        return Err("execution plan violates prerequisites".to_string());
    }
    Ok(())
}

#[test]
fn validator_settings_reflect_sections() -> TestResult {
    let mut config = common::minimal_config()?;
    config.signing.repository_signing_enabled = true;
    config.vcs.exclude_owners = vec!["Microsoft".to_string()];
    let settings = config.validator_settings();
    if !settings.repository_signing_enabled {
        return Err("repository signing flag not carried".to_string());
    }
    if settings.vcs_criteria.exclude_owners != vec!["Microsoft".to_string()] {
        return Err("excluded owners not carried".to_string());
    }
    Ok(())
}

/// Renders a validation outcome for failure messages.
fn describe(result: Result<(), ConfigError>) -> String {
    match result {
        Ok(()) => "ok".to_string(),
        Err(error) => error.to_string(),
    }
}
