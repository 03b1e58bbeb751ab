// crates/gallery-validation-core/src/runtime/log.rs
// ============================================================================
// Module: Validation Log Events
// Description: Structured JSON-line log events for validators and orchestration.
// Purpose: Record tolerated anomalies and failures without a logging framework.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Validators and the orchestrator report noteworthy conditions as
//! [`ValidationLogEvent`] values routed through a [`ValidationLogSink`].
//! Sinks serialize one JSON object per line; write failures are ignored so
//! logging never changes validation behavior.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::identifiers::ValidatorName;
use crate::core::status::ValidationRequest;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Expected but noteworthy condition.
    Info,
    /// Tolerated anomaly.
    Warn,
    /// Failure that affects the outcome.
    Error,
}

/// Structured log event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationLogEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Severity.
    pub level: LogLevel,
    /// Validator name when the event concerns one step.
    pub validator: Option<String>,
    /// Validation attempt identifier.
    pub validation_id: Option<String>,
    /// Package identifier.
    pub package_id: Option<String>,
    /// Package version.
    pub package_version: Option<String>,
    /// Stable error code for failure classification.
    pub error_code: Option<&'static str>,
    /// Human-readable message.
    pub message: String,
}

impl ValidationLogEvent {
    /// Creates an event without request context.
    #[must_use]
    pub fn new(
        event: &'static str,
        level: LogLevel,
        timestamp: Timestamp,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event,
            timestamp_ms: timestamp.as_unix_millis(),
            level,
            validator: None,
            validation_id: None,
            package_id: None,
            package_version: None,
            error_code: None,
            message: message.into(),
        }
    }

    /// Attaches validator and request identity.
    #[must_use]
    pub fn for_request(mut self, validator: &ValidatorName, request: &ValidationRequest) -> Self {
        self.validator = Some(validator.to_string());
        self.validation_id = Some(request.validation_id.to_string());
        self.package_id = Some(request.package_id.to_string());
        self.package_version = Some(request.package_version.to_string());
        self
    }

    /// Attaches an error code.
    #[must_use]
    pub const fn with_error_code(mut self, code: &'static str) -> Self {
        self.error_code = Some(code);
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Log sink for validation events.
pub trait ValidationLogSink: Send + Sync {
    /// Records a log event.
    fn record(&self, event: &ValidationLogEvent);
}

/// Shared log sink handle.
pub type SharedLogSink = Arc<dyn ValidationLogSink>;

/// Log sink that writes JSON lines to stderr.
pub struct StderrLogSink;

impl ValidationLogSink for StderrLogSink {
    fn record(&self, event: &ValidationLogEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Log sink that appends JSON lines to a file.
pub struct FileLogSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileLogSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ValidationLogSink for FileLogSink {
    fn record(&self, event: &ValidationLogEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op log sink.
pub struct NoopLogSink;

impl ValidationLogSink for NoopLogSink {
    fn record(&self, _event: &ValidationLogEvent) {}
}

/// Log sink that keeps events in memory for inspection.
#[derive(Debug, Default, Clone)]
pub struct MemoryLogSink {
    /// Captured events.
    events: Arc<Mutex<Vec<ValidationLogEvent>>>,
}

impl MemoryLogSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ValidationLogEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Returns true when an event named `event` was captured.
    #[must_use]
    pub fn contains(&self, event: &str) -> bool {
        self.events().iter().any(|captured| captured.event == event)
    }
}

impl ValidationLogSink for MemoryLogSink {
    fn record(&self, event: &ValidationLogEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}
