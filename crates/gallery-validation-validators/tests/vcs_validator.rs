// crates/gallery-validation-validators/tests/vcs_validator.rs
// ============================================================================
// Module: VCS Validator Tests
// Description: Status reduction over the legacy scanner's audit trail.
// Purpose: Ensure failures take precedence and criteria exempt packages.
// ============================================================================

//! Legacy virus scan validator tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use gallery_validation_core::AuditTarget;
use gallery_validation_core::Clock;
use gallery_validation_core::LogLevel;
use gallery_validation_core::MessageTopic;
use gallery_validation_core::PackageValidationAuditEntry;
use gallery_validation_core::ValidationEvent;
use gallery_validation_core::ValidationRequest;
use gallery_validation_core::ValidationStatus;
use gallery_validation_core::Validator;
use gallery_validation_validators::LEGACY_SCAN_VALIDATOR;
use gallery_validation_validators::PackageCriteria;
use gallery_validation_validators::PackageCriteriaEvaluator;
use gallery_validation_validators::VCS_KNOWN_FAILURE;
use gallery_validation_validators::VCS_UNEXPECTED_EVENT;
use gallery_validation_validators::VcsValidator;

use crate::common::Fixture;
use crate::common::request;

fn validator(fixture: &Fixture, criteria: &PackageCriteria) -> VcsValidator {
    VcsValidator::new(PackageCriteriaEvaluator::new(criteria).unwrap(), fixture.vcs())
}

async fn record(fixture: &Fixture, request: &ValidationRequest, events: &[ValidationEvent]) {
    let now = fixture.clock.now();
    let entries = events
        .iter()
        .map(|event| PackageValidationAuditEntry::new(now, LEGACY_SCAN_VALIDATOR, *event))
        .collect();
    fixture.auditor.write_audit_entries(&AuditTarget::from(request), entries).await.unwrap();
}

#[tokio::test]
async fn not_clean_wins_over_clean_in_either_order() {
    for events in [
        [ValidationEvent::PackageNotClean, ValidationEvent::PackageClean],
        [ValidationEvent::PackageClean, ValidationEvent::PackageNotClean],
    ] {
        let fixture = Fixture::new();
        let validator = validator(&fixture, &PackageCriteria::default());
        let request = request("Contoso.Lib");
        fixture.add_package(&request, &["contoso"]);
        validator.start(&request).await.unwrap();
        record(&fixture, &request, &events).await;

        let result = validator.get_result(&request).await.unwrap();

        assert_eq!(result.status, ValidationStatus::Failed);
        assert!(fixture.log.events().iter().any(|event| {
            event.level == LogLevel::Error && event.error_code == Some(VCS_KNOWN_FAILURE)
        }));
    }
}

#[tokio::test]
async fn not_clean_reason_details_are_logged() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, &PackageCriteria::default());
    let request = request("Contoso.Lib");
    fixture.add_package(&request, &["contoso"]);
    validator.start(&request).await.unwrap();
    let entry = PackageValidationAuditEntry::new(
        fixture.clock.now(),
        LEGACY_SCAN_VALIDATOR,
        ValidationEvent::NotCleanReason,
    )
    .with_details("Eicar-Test-Signature");
    fixture.auditor.write_audit_entry(&AuditTarget::from(&request), entry).await.unwrap();

    let result = validator.get_result(&request).await.unwrap();

    assert_eq!(result.status, ValidationStatus::Failed);
    let failure = fixture
        .log
        .events()
        .into_iter()
        .find(|event| event.error_code == Some(VCS_KNOWN_FAILURE))
        .unwrap();
    assert!(failure.message.contains("Eicar-Test-Signature"), "message: {}", failure.message);
}

#[tokio::test]
async fn unrecognized_event_fails_under_its_own_error_code() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, &PackageCriteria::default());
    let request = request("Contoso.Lib");
    fixture.add_package(&request, &["contoso"]);
    validator.start(&request).await.unwrap();
    record(&fixture, &request, &[ValidationEvent::Unrecognized]).await;

    let result = validator.get_result(&request).await.unwrap();

    assert_eq!(result.status, ValidationStatus::Failed);
    let codes: Vec<_> = fixture.log.events().into_iter().filter_map(|event| event.error_code).collect();
    assert_eq!(codes, vec![VCS_UNEXPECTED_EVENT]);
}

#[tokio::test]
async fn progress_events_keep_the_scan_incomplete() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, &PackageCriteria::default());
    let request = request("Contoso.Lib");
    fixture.add_package(&request, &["contoso"]);

    let started = validator.start(&request).await.unwrap();
    assert_eq!(started.status, ValidationStatus::Incomplete);
    record(
        &fixture,
        &request,
        &[
            ValidationEvent::BeforeVirusScanRequest,
            ValidationEvent::VirusScanRequestSent,
            ValidationEvent::ValidatorException,
        ],
    )
    .await;

    let result = validator.get_result(&request).await.unwrap();
    assert_eq!(result.status, ValidationStatus::Incomplete);
    let audit = fixture.auditor.read_audit(&AuditTarget::from(&request)).await.unwrap().unwrap();
    assert!(audit.completed.is_none());
}

#[tokio::test]
async fn clean_scan_succeeds_and_completes_the_audit() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, &PackageCriteria::default());
    let request = request("Contoso.Lib");
    fixture.add_package(&request, &["contoso"]);
    validator.start(&request).await.unwrap();
    record(&fixture, &request, &[ValidationEvent::PackageClean]).await;

    let result = validator.get_result(&request).await.unwrap();

    assert_eq!(result.status, ValidationStatus::Succeeded);
    let audit = fixture.auditor.read_audit(&AuditTarget::from(&request)).await.unwrap().unwrap();
    assert!(audit.started.is_some());
    assert!(audit.completed.is_some());
    assert_eq!(audit.validators, vec![LEGACY_SCAN_VALIDATOR.to_string()]);
}

#[tokio::test]
async fn entries_from_other_validators_are_ignored() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, &PackageCriteria::default());
    let request = request("Contoso.Lib");
    fixture.add_package(&request, &["contoso"]);
    validator.start(&request).await.unwrap();
    let entry = PackageValidationAuditEntry::new(
        fixture.clock.now(),
        "some-other-validator",
        ValidationEvent::PackageNotClean,
    );
    fixture.auditor.write_audit_entry(&AuditTarget::from(&request), entry).await.unwrap();

    let result = validator.get_result(&request).await.unwrap();
    assert_eq!(result.status, ValidationStatus::Incomplete);
}

#[tokio::test]
async fn start_submits_one_scan() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, &PackageCriteria::default());
    let request = request("Contoso.Lib");
    fixture.add_package(&request, &["contoso"]);

    validator.start(&request).await.unwrap();
    let again = validator.start(&request).await.unwrap();

    assert_eq!(again.status, ValidationStatus::Incomplete);
    assert_eq!(fixture.queue.messages_for(MessageTopic::LegacyVirusScan).len(), 1);
    assert!(fixture.log.contains("duplicate_start"));
}

#[tokio::test]
async fn unscanned_package_reports_not_started() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, &PackageCriteria::default());
    let request = request("Contoso.Lib");
    fixture.add_package(&request, &["contoso"]);

    let result = validator.get_result(&request).await.unwrap();
    assert_eq!(result.status, ValidationStatus::NotStarted);
}

#[tokio::test]
async fn packages_outside_criteria_succeed_without_scanning() {
    let fixture = Fixture::new();
    let criteria = PackageCriteria {
        exclude_owners: vec!["Microsoft".to_string()],
        include_id_patterns: Vec::new(),
    };
    let validator = validator(&fixture, &criteria);
    let request = request("Microsoft.Extensions.Logging");
    fixture.add_package(&request, &["microsoft"]);

    let started = validator.start(&request).await.unwrap();
    let polled = validator.get_result(&request).await.unwrap();

    assert_eq!(started.status, ValidationStatus::Succeeded);
    assert_eq!(polled.status, ValidationStatus::Succeeded);
    assert!(fixture.queue.messages().is_empty());
    assert!(fixture.auditor.read_audit(&AuditTarget::from(&request)).await.unwrap().is_none());
}
