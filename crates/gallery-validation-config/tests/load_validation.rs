//! Config file loading tests for gallery-validation-config.
// crates/gallery-validation-config/tests/load_validation.rs
// =============================================================================
// Module: Config Loading Tests
// Description: Validate file size, encoding, and parse failures.
// Purpose: Ensure unreadable configuration never reaches validation.
// =============================================================================

use std::fs;

use gallery_validation_config::ConfigError;
use gallery_validation_config::MAX_CONFIG_FILE_SIZE;
use gallery_validation_config::OrchestratorConfig;
use tempfile::TempDir;

mod common;

use crate::common::TestResult;

#[test]
fn load_reads_and_validates_explicit_path() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let path = temp.path().join("gallery-validation.toml");
    fs::write(&path, common::MINIMAL_TOML).map_err(|err| err.to_string())?;
    let config = OrchestratorConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if config.validation.content_types.len() != 1 {
        return Err("expected one content type".to_string());
    }
    Ok(())
}

#[test]
fn load_rejects_missing_file() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    match OrchestratorConfig::load(Some(&temp.path().join("missing.toml"))) {
        Err(ConfigError::Io(_)) => Ok(()),
        Err(other) => Err(format!("expected io error, got {other}")),
        Ok(_) => Err("expected missing file to fail".to_string()),
    }
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let path = temp.path().join("big.toml");
    let padding = "#".repeat(MAX_CONFIG_FILE_SIZE + 1);
    fs::write(&path, padding).map_err(|err| err.to_string())?;
    common::assert_invalid(
        OrchestratorConfig::load(Some(&path)).map(|_| ()),
        "config file exceeds size limit",
    )
}

#[test]
fn load_rejects_non_utf8() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let path = temp.path().join("binary.toml");
    fs::write(&path, [0xff_u8, 0xfe, 0xfd]).map_err(|err| err.to_string())?;
    common::assert_invalid(
        OrchestratorConfig::load(Some(&path)).map(|_| ()),
        "config file must be utf-8",
    )
}

#[test]
fn load_reports_parse_errors() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let path = temp.path().join("broken.toml");
    fs::write(&path, "[[validation.content_types]\nname = ").map_err(|err| err.to_string())?;
    match OrchestratorConfig::load(Some(&path)) {
        Err(ConfigError::Parse(_)) => Ok(()),
        Err(other) => Err(format!("expected parse error, got {other}")),
        Ok(_) => Err("expected parse failure".to_string()),
    }
}

#[test]
fn load_rejects_graph_errors() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let path = temp.path().join("cycle.toml");
    let toml_str = r#"
[[validation.content_types]]
name = "NuGet"

[[validation.content_types.steps]]
name = "VcsValidator"
required_validations = ["SymbolValidator"]
should_start = true
track_after_ms = 1000

[[validation.content_types.steps]]
name = "SymbolValidator"
required_validations = ["VcsValidator"]
should_start = true
track_after_ms = 1000
"#;
    fs::write(&path, toml_str).map_err(|err| err.to_string())?;
    match OrchestratorConfig::load(Some(&path)) {
        Err(ConfigError::Graph(_)) => Ok(()),
        Err(other) => Err(format!("expected graph error, got {other}")),
        Ok(_) => Err("expected cycle to fail".to_string()),
    }
}
