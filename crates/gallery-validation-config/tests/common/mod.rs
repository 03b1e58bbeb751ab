// crates/gallery-validation-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for gallery-validation-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use gallery_validation_config::ConfigError;
use gallery_validation_config::OrchestratorConfig;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// The production NuGet pipeline: legacy scan, then signing, then the
/// repository signature check, with symbols validated independently.
pub const MINIMAL_TOML: &str = r#"
[[validation.content_types]]
name = "NuGet"

[[validation.content_types.steps]]
name = "VcsValidator"
should_start = true
track_after_ms = 600000

[[validation.content_types.steps]]
name = "PackageSigningProcessor"
required_validations = ["VcsValidator"]
should_start = true
track_after_ms = 600000

[[validation.content_types.steps]]
name = "PackageSignatureValidator"
required_validations = ["PackageSigningProcessor"]
should_start = true
track_after_ms = 600000

[[validation.content_types.steps]]
name = "SymbolValidator"
should_start = false
track_after_ms = 600000
"#;

/// Parses a TOML string into an `OrchestratorConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<OrchestratorConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns the minimal valid config with all section defaults applied.
pub fn minimal_config() -> Result<OrchestratorConfig, String> {
    config_from_toml(MINIMAL_TOML).map_err(|err| err.to_string())
}

/// Asserts that `result` failed with a message containing `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
