// crates/gallery-validation-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Validation Store
// Description: Durable validator status and validation set store backed by SQLite.
// Purpose: Persist status transitions atomically across workers and restarts.
// Dependencies: gallery-validation-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Validator statuses live in one row per `(validator, validation id)`.
//! Conditional writes read the row and write the successor inside one
//! `BEGIN IMMEDIATE` transaction, which takes the database write lock before
//! the read. The legality and conflict rules come from
//! [`compare_and_transition`], shared with the in-memory store. Validation
//! sets are stored as JSON snapshots keyed by set id. Stored rows are
//! untrusted: unknown state labels or mismatched keys fail closed. Schema
//! version 1 files are upgraded in place with the audit blob tables used by
//! [`crate::blob::SqliteAuditBlobStore`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use gallery_validation_core::PackageKey;
use gallery_validation_core::PackageValidationSet;
use gallery_validation_core::StatusTransition;
use gallery_validation_core::StoreError;
use gallery_validation_core::ValidationIssue;
use gallery_validation_core::ValidationRequest;
use gallery_validation_core::ValidationResult;
use gallery_validation_core::ValidationSetId;
use gallery_validation_core::ValidationSetStore;
use gallery_validation_core::ValidationStatus;
use gallery_validation_core::ValidatorName;
use gallery_validation_core::ValidatorStateService;
use gallery_validation_core::ValidatorStatus;
use gallery_validation_core::compare_and_transition;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 2;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum validation set snapshot size accepted by the store.
pub const MAX_SET_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` validation store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config for `path` with default tuning.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw snapshot payloads.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row cannot be interpreted.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Payload exceeded the size limit.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
    /// Requested transition violates the status state machine.
    #[error("illegal validator status transition from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        /// Stored state.
        from: ValidationStatus,
        /// Requested state.
        to: ValidationStatus,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "set_json exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
            SqliteStoreError::InvalidTransition {
                from,
                to,
            } => Self::InvalidTransition {
                from,
                to,
            },
        }
    }
}

/// Maps a rusqlite error into a store error.
#[allow(clippy::needless_pass_by_value, reason = "Used as a map_err adapter.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed validator status and validation set store.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Conditional writes run inside immediate transactions.
#[derive(Clone)]
pub struct SqliteValidationStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteValidationStore {
    /// Opens an `SQLite`-backed validation store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Verifies the store can execute a simple SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query fails.
    pub fn readiness(&self) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard.query_row("SELECT 1", [], |_| Ok(())).map_err(db_error)
    }

    /// Returns the shared connection for sibling stores on the same file.
    pub(crate) fn shared_connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.connection)
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))
    }

    /// Reads the status row for `validator`, defaulting to `NotStarted`.
    fn read_status(
        connection: &Connection,
        validator: &ValidatorName,
        request: &ValidationRequest,
    ) -> Result<ValidatorStatus, SqliteStoreError> {
        let row: Option<StatusRow> = connection
            .query_row(
                "SELECT package_key, state, nupkg_url, issues_json FROM validator_statuses WHERE \
                 validator_name = ?1 AND validation_id = ?2",
                params![validator.as_str(), request.validation_id.to_string()],
                |row| {
                    Ok(StatusRow {
                        package_key: row.get(0)?,
                        state: row.get(1)?,
                        nupkg_url: row.get(2)?,
                        issues_json: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(db_error)?;
        let Some(row) = row else {
            return Ok(ValidatorStatus::not_started(validator, request));
        };
        row.into_status(validator, request)
    }

    /// Applies a conditional write inside an immediate transaction.
    fn transition(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
        previous: ValidationStatus,
        result: &ValidationResult,
    ) -> Result<StatusTransition, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
        let current = Self::read_status(&tx, validator, request)?;
        let transition = compare_and_transition(&current, previous, result).map_err(|err| match err {
            StoreError::InvalidTransition {
                from,
                to,
            } => SqliteStoreError::InvalidTransition {
                from,
                to,
            },
            other => SqliteStoreError::Invalid(other.to_string()),
        })?;
        if transition.applied {
            let status = &transition.current;
            let issues_json = serde_json::to_vec(&status.issues)
                .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
            tx.execute(
                "INSERT INTO validator_statuses (validator_name, validation_id, package_key, \
                 state, nupkg_url, issues_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6) ON \
                 CONFLICT(validator_name, validation_id) DO UPDATE SET state = excluded.state, \
                 nupkg_url = excluded.nupkg_url, issues_json = excluded.issues_json",
                params![
                    validator.as_str(),
                    request.validation_id.to_string(),
                    package_key_to_sql(status.package_key)?,
                    status.state.as_str(),
                    status.nupkg_url.as_deref(),
                    issues_json,
                ],
            )
            .map_err(db_error)?;
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(transition)
    }

    /// Loads a validation set snapshot.
    fn load_set(&self, set_id: &ValidationSetId) -> Result<Option<PackageValidationSet>, SqliteStoreError> {
        let guard = self.lock()?;
        let bytes: Option<Vec<u8>> = guard
            .query_row(
                "SELECT set_json FROM validation_sets WHERE set_id = ?1",
                params![set_id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        drop(guard);
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        if bytes.len() > MAX_SET_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_SET_BYTES,
                actual_bytes: bytes.len(),
            });
        }
        let set: PackageValidationSet =
            serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if set.set_id != *set_id {
            return Err(SqliteStoreError::Invalid(
                "set_id mismatch between key and payload".to_string(),
            ));
        }
        Ok(Some(set))
    }

    /// Saves a validation set snapshot.
    fn save_set(&self, set: &PackageValidationSet) -> Result<(), SqliteStoreError> {
        let bytes =
            serde_json::to_vec(set).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if bytes.len() > MAX_SET_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_SET_BYTES,
                actual_bytes: bytes.len(),
            });
        }
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO validation_sets (set_id, set_json) VALUES (?1, ?2) ON \
                 CONFLICT(set_id) DO UPDATE SET set_json = excluded.set_json",
                params![set.set_id.to_string(), bytes],
            )
            .map_err(db_error)?;
        Ok(())
    }
}

#[async_trait]
impl ValidatorStateService for SqliteValidationStore {
    async fn get_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
    ) -> Result<ValidatorStatus, StoreError> {
        let guard = self.lock()?;
        Ok(Self::read_status(&guard, validator, request)?)
    }

    async fn try_add_validator_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
        previous: ValidationStatus,
        new_status: ValidationStatus,
    ) -> Result<StatusTransition, StoreError> {
        Ok(self.transition(validator, request, previous, &ValidationResult::from_status(new_status))?)
    }

    async fn try_update_validator_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
        previous: ValidationStatus,
        result: &ValidationResult,
    ) -> Result<StatusTransition, StoreError> {
        Ok(self.transition(validator, request, previous, result)?)
    }
}

#[async_trait]
impl ValidationSetStore for SqliteValidationStore {
    async fn load(
        &self,
        set_id: &ValidationSetId,
    ) -> Result<Option<PackageValidationSet>, StoreError> {
        Ok(self.load_set(set_id)?)
    }

    async fn save(&self, set: &PackageValidationSet) -> Result<(), StoreError> {
        Ok(self.save_set(set)?)
    }
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// Raw status row.
struct StatusRow {
    /// Stored package key.
    package_key: i64,
    /// Stored state label.
    state: String,
    /// Stored replacement URL.
    nupkg_url: Option<String>,
    /// Stored issues as JSON.
    issues_json: Vec<u8>,
}

impl StatusRow {
    /// Validates the row and converts it into a status record.
    fn into_status(
        self,
        validator: &ValidatorName,
        request: &ValidationRequest,
    ) -> Result<ValidatorStatus, SqliteStoreError> {
        let state = ValidationStatus::parse(&self.state).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("unknown status label {}", self.state))
        })?;
        let package_key = u64::try_from(self.package_key)
            .ok()
            .and_then(PackageKey::from_raw)
            .ok_or_else(|| SqliteStoreError::Corrupt("invalid package_key".to_string()))?;
        if package_key != request.package_key {
            return Err(SqliteStoreError::Invalid(
                "package_key mismatch between row and request".to_string(),
            ));
        }
        let issues: Vec<ValidationIssue> = serde_json::from_slice(&self.issues_json)
            .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
        Ok(ValidatorStatus {
            validation_id: request.validation_id,
            validator_name: validator.clone(),
            package_key,
            state,
            nupkg_url: self.nupkg_url,
            issues,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a package key into its SQL integer form.
fn package_key_to_sql(key: PackageKey) -> Result<i64, SqliteStoreError> {
    i64::try_from(key.get())
        .map_err(|_| SqliteStoreError::Invalid("package_key exceeds sqlite range".to_string()))
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(())
}

/// Status and set tables created with schema version 1.
const STATUS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS validator_statuses (
        validator_name TEXT NOT NULL,
        validation_id TEXT NOT NULL,
        package_key INTEGER NOT NULL,
        state TEXT NOT NULL,
        nupkg_url TEXT,
        issues_json BLOB NOT NULL,
        PRIMARY KEY (validator_name, validation_id)
    );
    CREATE INDEX IF NOT EXISTS idx_validator_statuses_package
        ON validator_statuses (package_key);
    CREATE TABLE IF NOT EXISTS validation_sets (
        set_id TEXT NOT NULL PRIMARY KEY,
        set_json BLOB NOT NULL
    );";

/// Audit blob tables added in schema version 2.
const AUDIT_BLOB_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS blob_containers (
        name TEXT NOT NULL PRIMARY KEY,
        access TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS audit_blobs (
        container TEXT NOT NULL,
        path TEXT NOT NULL,
        content_type TEXT NOT NULL,
        etag TEXT NOT NULL,
        bytes BLOB NOT NULL,
        PRIMARY KEY (container, path)
    );
    CREATE TABLE IF NOT EXISTS blob_leases (
        container TEXT NOT NULL,
        path TEXT NOT NULL,
        lease_id TEXT NOT NULL,
        expires_ms INTEGER NOT NULL,
        PRIMARY KEY (container, path)
    );";

/// Initializes the `SQLite` schema, upgrades version 1 stores, or validates
/// the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(STATUS_SCHEMA).map_err(db_error)?;
            tx.execute_batch(AUDIT_BLOB_SCHEMA).map_err(db_error)?;
        }
        Some(1) => {
            tx.execute_batch(STATUS_SCHEMA).map_err(db_error)?;
            tx.execute_batch(AUDIT_BLOB_SCHEMA).map_err(db_error)?;
            tx.execute("UPDATE store_meta SET version = ?1", params![SCHEMA_VERSION])
                .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}
