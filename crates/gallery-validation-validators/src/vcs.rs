// crates/gallery-validation-validators/src/vcs.rs
// ============================================================================
// Module: VCS Validator
// Description: Bridge to the legacy audit-driven virus scanning service.
// Purpose: Derive a validation status from the scanner's audit trail.
// Dependencies: gallery-validation-core, async-trait
// ============================================================================

//! ## Overview
//! The legacy scanner reports progress only by appending entries to the
//! package's validation audit document under its own validator name. `start`
//! submits the scan and opens the audit. `get_result` reduces every entry the
//! scanner wrote to one status: any failure wins over any success, which wins
//! over the default of `Incomplete`. Packages that do not meet the configured
//! criteria are never scanned and succeed immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use gallery_validation_core::AuditTarget;
use gallery_validation_core::Clock;
use gallery_validation_core::LogLevel;
use gallery_validation_core::MessageEnqueuer;
use gallery_validation_core::MessageTopic;
use gallery_validation_core::MetadataError;
use gallery_validation_core::PackageMetadataSource;
use gallery_validation_core::PackageValidationAudit;
use gallery_validation_core::PackageValidationAuditor;
use gallery_validation_core::SharedLogSink;
use gallery_validation_core::ValidationEvent;
use gallery_validation_core::ValidationLogEvent;
use gallery_validation_core::ValidationMessage;
use gallery_validation_core::ValidationRequest;
use gallery_validation_core::ValidationResult;
use gallery_validation_core::ValidationStatus;
use gallery_validation_core::Validator;
use gallery_validation_core::ValidatorError;
use gallery_validation_core::ValidatorKind;
use gallery_validation_core::ValidatorName;

use crate::criteria::PackageCriteriaEvaluator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Validator name the legacy scanner writes its audit entries under.
pub const LEGACY_SCAN_VALIDATOR: &str = "vcs-legacy-scan";

/// Error code for scanner verdicts that explain a failure.
pub const VCS_KNOWN_FAILURE: &str = "vcs_known_failure";

/// Error code for audit events this reader does not recognize.
pub const VCS_UNEXPECTED_EVENT: &str = "vcs_unexpected_event";

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Collaborators of [`VcsValidator`].
#[derive(Clone)]
pub struct VcsServices {
    /// Audit document access.
    pub auditor: PackageValidationAuditor,
    /// Outbound scan submissions.
    pub queue: Arc<dyn MessageEnqueuer>,
    /// Package owner lookups for the criteria.
    pub metadata: Arc<dyn PackageMetadataSource>,
    /// Time source for log events.
    pub clock: Arc<dyn Clock>,
    /// Structured log sink.
    pub log: SharedLogSink,
}

/// Legacy virus scan validator.
#[derive(Clone)]
pub struct VcsValidator {
    /// Registered name.
    name: ValidatorName,
    /// Eligibility criteria.
    criteria: PackageCriteriaEvaluator,
    /// Collaborators.
    services: VcsServices,
}

impl VcsValidator {
    /// Creates the validator.
    #[must_use]
    pub fn new(criteria: PackageCriteriaEvaluator, services: VcsServices) -> Self {
        Self {
            name: ValidatorName::new(ValidatorKind::VcsValidator.as_str()),
            criteria,
            services,
        }
    }

    /// Emits a log event tagged with this validator and `request`.
    fn log(&self, entry: ValidationLogEvent, request: &ValidationRequest) {
        self.services.log.record(&entry.for_request(&self.name, request));
    }

    /// Builds an untagged log event at the current time.
    fn event(&self, event: &'static str, level: LogLevel, message: impl Into<String>) -> ValidationLogEvent {
        ValidationLogEvent::new(event, level, self.services.clock.now(), message)
    }

    /// Returns true when the package must be scanned.
    async fn should_scan(&self, request: &ValidationRequest) -> Result<bool, ValidatorError> {
        let package = self
            .services
            .metadata
            .find_package(request.package_key)
            .await?
            .ok_or_else(|| MetadataError::NotFound(request.package_key.to_string()))?;
        Ok(self.criteria.is_match(&package))
    }

    /// Reduces the scanner's audit entries to one status.
    fn reduce(&self, request: &ValidationRequest, audit: &PackageValidationAudit) -> ValidationStatus {
        let mut failed = false;
        let mut succeeded = false;
        for entry in audit.entries_for(LEGACY_SCAN_VALIDATOR) {
            match entry.event {
                ValidationEvent::ValidatorException
                | ValidationEvent::BeforeVirusScanRequest
                | ValidationEvent::VirusScanRequestSent
                | ValidationEvent::VirusScanRequestFailed => {}
                ValidationEvent::PackageClean => succeeded = true,
                ValidationEvent::PackageNotClean
                | ValidationEvent::NotCleanReason
                | ValidationEvent::ScanFailed => {
                    failed = true;
                    let detail = entry.event_details.as_deref().unwrap_or("no details");
                    self.log(
                        self.event(
                            "vcs_scan_failed",
                            LogLevel::Error,
                            format!("scanner reported {}: {detail}", entry.event.as_str()),
                        )
                        .with_error_code(VCS_KNOWN_FAILURE),
                        request,
                    );
                }
                ValidationEvent::Unrecognized => {
                    failed = true;
                    self.log(
                        self.event(
                            "vcs_scan_failed",
                            LogLevel::Error,
                            "scanner wrote an unrecognized audit event",
                        )
                        .with_error_code(VCS_UNEXPECTED_EVENT),
                        request,
                    );
                }
            }
        }
        if failed {
            ValidationStatus::Failed
        } else if succeeded {
            ValidationStatus::Succeeded
        } else {
            ValidationStatus::Incomplete
        }
    }
}

#[async_trait]
impl Validator for VcsValidator {
    fn name(&self) -> &ValidatorName {
        &self.name
    }

    async fn start(&self, request: &ValidationRequest) -> Result<ValidationResult, ValidatorError> {
        if !self.should_scan(request).await? {
            return Ok(ValidationResult::succeeded());
        }
        let target = AuditTarget::from(request);
        if self.services.auditor.read_audit(&target).await?.is_some() {
            self.log(
                self.event("duplicate_start", LogLevel::Warn, "scan already submitted"),
                request,
            );
            return self.get_result(request).await;
        }

        let message = ValidationMessage::for_request(MessageTopic::LegacyVirusScan, request);
        self.services.queue.enqueue(message).await?;
        self.services
            .auditor
            .start_audit(&target, &[LEGACY_SCAN_VALIDATOR.to_string()])
            .await?;
        Ok(ValidationResult::incomplete())
    }

    async fn get_result(
        &self,
        request: &ValidationRequest,
    ) -> Result<ValidationResult, ValidatorError> {
        if !self.should_scan(request).await? {
            return Ok(ValidationResult::succeeded());
        }
        let target = AuditTarget::from(request);
        let Some(audit) = self.services.auditor.read_audit(&target).await? else {
            return Ok(ValidationResult::not_started());
        };
        let status = self.reduce(request, &audit);
        if status.is_terminal() && audit.completed.is_none() {
            self.services.auditor.complete_audit(&target).await?;
        }
        Ok(ValidationResult::from_status(status))
    }
}
