// crates/gallery-validation-config/src/config.rs
// ============================================================================
// Module: Orchestrator Configuration
// Description: Configuration loading and validation for the validation pipeline.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: gallery-validation-core, gallery-validation-validators, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is checked before the declared step graphs are verified
//! against the static validator catalog. Missing or invalid configuration
//! fails closed: the orchestrator never starts with a pipeline it cannot run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use gallery_validation_core::AuditorSettings;
use gallery_validation_core::ConfigurationValidator;
use gallery_validation_core::ContentType;
use gallery_validation_core::FileLogSink;
use gallery_validation_core::GraphError;
use gallery_validation_core::MAX_AUDIT_LEASE_MS;
use gallery_validation_core::NoopLogSink;
use gallery_validation_core::SharedLogSink;
use gallery_validation_core::StderrLogSink;
use gallery_validation_core::TopologicalSort;
use gallery_validation_core::ValidationConfiguration;
use gallery_validation_core::ValidatorCatalog;
use gallery_validation_core::ValidatorName;
use gallery_validation_store_sqlite::SqliteStoreConfig;
use gallery_validation_store_sqlite::SqliteStoreMode;
use gallery_validation_store_sqlite::SqliteSyncMode;
use gallery_validation_validators::PackageCriteria;
use gallery_validation_validators::PackageCriteriaEvaluator;
use gallery_validation_validators::ValidatorSettings;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "gallery-validation.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "GALLERY_VALIDATION_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum audit container prefix length; the `-audit` suffix must still fit
/// a 63 character container name.
pub const MAX_CONTAINER_PREFIX_LENGTH: usize = 57;
/// Default audit lease attempts.
pub(crate) const DEFAULT_MAX_LEASE_ATTEMPTS: u32 = 10;
/// Maximum audit lease attempts.
pub(crate) const MAX_LEASE_ATTEMPTS: u32 = 1_000;
/// Default delay between audit lease attempts in milliseconds.
pub(crate) const DEFAULT_LEASE_RETRY_DELAY_MS: u64 = 50;
/// Maximum delay between audit lease attempts in milliseconds.
pub(crate) const MAX_LEASE_RETRY_DELAY_MS: u64 = 10_000;
/// Default `SQLite` busy timeout in milliseconds.
pub(crate) const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum `SQLite` busy timeout in milliseconds.
pub(crate) const MAX_STORE_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Maximum number of excluded owners.
pub(crate) const MAX_EXCLUDED_OWNERS: usize = 1_024;
/// Maximum number of package id patterns.
pub(crate) const MAX_ID_PATTERNS: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Package validation orchestrator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Step graphs per content type.
    #[serde(default)]
    pub validation: ValidationConfiguration,
    /// Repository signing configuration.
    #[serde(default)]
    pub signing: SigningConfig,
    /// Legacy virus scan eligibility criteria.
    #[serde(default)]
    pub vcs: VcsConfig,
    /// Validation audit configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Validator status store configuration.
    #[serde(default)]
    pub state_store: StateStoreConfig,
    /// Structured log sink configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OrchestratorConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section, then the declared step graphs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.vcs.validate()?;
        self.audit.validate()?;
        self.state_store.validate()?;
        self.logging.validate()?;
        ConfigurationValidator::new(&self.validation, &ValidatorCatalog).validate()?;
        Ok(())
    }

    /// Returns a legal execution order for each declared content type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a step graph cannot be ordered.
    pub fn execution_plan(&self) -> Result<Vec<ExecutionPlan>, ConfigError> {
        self.validation
            .content_types
            .iter()
            .map(|entry| {
                let steps = TopologicalSort::order(&entry.steps).map_err(|err| {
                    ConfigError::Invalid(format!("content type {}: {err}", entry.content_type))
                })?;
                Ok(ExecutionPlan {
                    content_type: entry.content_type.clone(),
                    steps,
                })
            })
            .collect()
    }

    /// Returns the settings consumed by the validator factory.
    #[must_use]
    pub fn validator_settings(&self) -> ValidatorSettings {
        ValidatorSettings {
            repository_signing_enabled: self.signing.repository_signing_enabled,
            vcs_criteria: self.vcs.criteria(),
        }
    }
}

/// Execution order for one content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Content type label.
    pub content_type: ContentType,
    /// Step names in a legal start order.
    pub steps: Vec<ValidatorName>,
}

/// Repository signing configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SigningConfig {
    /// Whether repository signatures are enforced; when disabled, repository
    /// signature failures are tolerated.
    #[serde(default)]
    pub repository_signing_enabled: bool,
}

/// Legacy virus scan eligibility configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VcsConfig {
    /// Owners whose packages skip the scan.
    #[serde(default)]
    pub exclude_owners: Vec<String>,
    /// Glob patterns of scanned package ids; empty scans every id.
    #[serde(default)]
    pub include_id_patterns: Vec<String>,
}

impl VcsConfig {
    /// Returns the criteria declaration.
    #[must_use]
    pub fn criteria(&self) -> PackageCriteria {
        PackageCriteria {
            exclude_owners: self.exclude_owners.clone(),
            include_id_patterns: self.include_id_patterns.clone(),
        }
    }

    /// Validates owner names and compiles the id patterns.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.exclude_owners.len() > MAX_EXCLUDED_OWNERS {
            return Err(ConfigError::Invalid("vcs.exclude_owners exceeds max entries".to_string()));
        }
        if self.include_id_patterns.len() > MAX_ID_PATTERNS {
            return Err(ConfigError::Invalid(
                "vcs.include_id_patterns exceeds max entries".to_string(),
            ));
        }
        if self.exclude_owners.iter().any(|owner| owner.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "vcs.exclude_owners entries must be non-empty".to_string(),
            ));
        }
        if self.include_id_patterns.iter().any(|pattern| pattern.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "vcs.include_id_patterns entries must be non-empty".to_string(),
            ));
        }
        PackageCriteriaEvaluator::new(&self.criteria())
            .map_err(|err| ConfigError::Invalid(format!("vcs.include_id_patterns: {err}")))?;
        Ok(())
    }
}

/// Validation audit configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Container name prefix; audits live in `{prefix}-audit`.
    #[serde(default = "default_container_prefix")]
    pub container_prefix: String,
    /// Audit blob lease duration in milliseconds.
    #[serde(default = "default_lease_ms")]
    pub lease_ms: u64,
    /// Lease acquisition attempts per update.
    #[serde(default = "default_max_lease_attempts")]
    pub max_lease_attempts: u32,
    /// Delay between lease attempts in milliseconds.
    #[serde(default = "default_lease_retry_delay_ms")]
    pub lease_retry_delay_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            container_prefix: default_container_prefix(),
            lease_ms: default_lease_ms(),
            max_lease_attempts: default_max_lease_attempts(),
            lease_retry_delay_ms: default_lease_retry_delay_ms(),
        }
    }
}

impl AuditConfig {
    /// Returns the auditor tuning for this section.
    #[must_use]
    pub fn auditor_settings(&self) -> AuditorSettings {
        AuditorSettings {
            container_prefix: self.container_prefix.clone(),
            lease_ms: self.lease_ms,
            max_lease_attempts: self.max_lease_attempts,
            lease_retry_delay_ms: self.lease_retry_delay_ms,
        }
    }

    /// Validates the container prefix and lease tuning.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_container_prefix(&self.container_prefix)?;
        if self.lease_ms == 0 || self.lease_ms > MAX_AUDIT_LEASE_MS {
            return Err(ConfigError::Invalid(format!(
                "audit.lease_ms must be between 1 and {MAX_AUDIT_LEASE_MS}"
            )));
        }
        if self.max_lease_attempts == 0 {
            return Err(ConfigError::Invalid(
                "audit.max_lease_attempts must be greater than zero".to_string(),
            ));
        }
        if self.max_lease_attempts > MAX_LEASE_ATTEMPTS {
            return Err(ConfigError::Invalid("audit.max_lease_attempts exceeds max".to_string()));
        }
        if self.lease_retry_delay_ms > MAX_LEASE_RETRY_DELAY_MS {
            return Err(ConfigError::Invalid("audit.lease_retry_delay_ms exceeds max".to_string()));
        }
        Ok(())
    }
}

/// Validator status store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StateStoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StateStoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            store_type: StateStoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StateStoreConfig {
    /// Returns the `SQLite` store config when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match self.store_type {
            StateStoreType::Memory => None,
            StateStoreType::Sqlite => self.path.as_ref().map(|path| SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
        }
    }

    /// Validates backend selection against the path setting.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StateStoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory state_store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StateStoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite state_store requires path".to_string())
                })?;
                validate_path_string("state_store.path", &path.to_string_lossy())?;
                if self.busy_timeout_ms > MAX_STORE_BUSY_TIMEOUT_MS {
                    return Err(ConfigError::Invalid(
                        "state_store.busy_timeout_ms exceeds max".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Validator status store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StateStoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Structured log sink configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Sink type.
    #[serde(default)]
    pub sink: LogSinkType,
    /// Log file path when using the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Opens the configured sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file sink cannot be opened.
    pub fn build_sink(&self) -> Result<SharedLogSink, ConfigError> {
        match self.sink {
            LogSinkType::Stderr => Ok(Arc::new(StderrLogSink)),
            LogSinkType::Disabled => Ok(Arc::new(NoopLogSink)),
            LogSinkType::File => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("file logging sink requires path".to_string())
                })?;
                let sink = FileLogSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }

    /// Validates sink selection against the path setting.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.sink {
            LogSinkType::Stderr | LogSinkType::Disabled => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "logging.path is only valid for the file sink".to_string(),
                    ));
                }
                Ok(())
            }
            LogSinkType::File => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("file logging sink requires path".to_string())
                })?;
                validate_path_string("logging.path", &path.to_string_lossy())
            }
        }
    }
}

/// Structured log sink type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkType {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard log events.
    #[serde(rename = "none")]
    Disabled,
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default audit container prefix.
fn default_container_prefix() -> String {
    AuditorSettings::default().container_prefix
}

/// Returns the default audit lease duration.
const fn default_lease_ms() -> u64 {
    MAX_AUDIT_LEASE_MS
}

/// Returns the default audit lease attempts.
const fn default_max_lease_attempts() -> u32 {
    DEFAULT_MAX_LEASE_ATTEMPTS
}

/// Returns the default audit lease retry delay.
const fn default_lease_retry_delay_ms() -> u64 {
    DEFAULT_LEASE_RETRY_DELAY_MS
}

/// Returns the default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Declared step graphs cannot execute.
    #[error("invalid validation graph: {0}")]
    Graph(#[from] GraphError),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates the audit container prefix against blob container naming rules.
fn validate_container_prefix(value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Invalid("audit.container_prefix must be non-empty".to_string()));
    }
    if value.len() > MAX_CONTAINER_PREFIX_LENGTH {
        return Err(ConfigError::Invalid("audit.container_prefix exceeds max length".to_string()));
    }
    if !value.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-') {
        return Err(ConfigError::Invalid(
            "audit.container_prefix must be lowercase alphanumeric or '-'".to_string(),
        ));
    }
    if value.starts_with('-') {
        return Err(ConfigError::Invalid(
            "audit.container_prefix must start with a letter or digit".to_string(),
        ));
    }
    if value.contains("--") {
        return Err(ConfigError::Invalid(
            "audit.container_prefix must not contain consecutive '-'".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::MAX_TOTAL_PATH_LENGTH;
    use super::validate_container_prefix;
    use super::validate_path_string;

    #[test]
    fn container_prefix_accepts_storage_safe_names() {
        for prefix in ["validation", "nuget-prod", "v2"] {
            validate_container_prefix(prefix).unwrap();
        }
    }

    #[test]
    fn container_prefix_rejects_unsafe_names() {
        for prefix in ["", "Validation", "val_idation", "-validation", "val--idation"] {
            assert!(validate_container_prefix(prefix).is_err(), "{prefix} should be rejected");
        }
        assert!(validate_container_prefix(&"a".repeat(58)).is_err());
    }

    #[test]
    fn path_string_rejects_whitespace_only() {
        let result = validate_path_string("state_store.path", "   ");
        assert!(result.unwrap_err().to_string().contains("non-empty"));
    }

    #[test]
    fn path_string_rejects_exceeding_max_length() {
        let long_path = "a".repeat(MAX_TOTAL_PATH_LENGTH + 1);
        let result = validate_path_string("state_store.path", &long_path);
        assert!(result.unwrap_err().to_string().contains("max length"));
    }
}
