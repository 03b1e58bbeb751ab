// crates/gallery-validation-validators/tests/signature_validator.rs
// ============================================================================
// Module: Signature Validator Tests
// Description: Suppression of tolerated repository signature anomalies.
// Purpose: Ensure known-broken input succeeds and integration defects surface.
// ============================================================================

//! Repository signature validator tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use gallery_validation_core::IssueCode;
use gallery_validation_core::MessageTopic;
use gallery_validation_core::ValidationIssue;
use gallery_validation_core::ValidationResult;
use gallery_validation_core::ValidationStatus;
use gallery_validation_core::Validator;
use gallery_validation_core::ValidatorError;
use gallery_validation_core::ValidatorStateService;
use gallery_validation_validators::PackageSignatureValidator;
use gallery_validation_validators::UsernameRule;

use crate::common::Fixture;
use crate::common::request;

fn validator(fixture: &Fixture, repository_signing_enabled: bool) -> PackageSignatureValidator {
    PackageSignatureValidator::new(
        fixture.queued(),
        std::sync::Arc::new(fixture.metadata.clone()),
        UsernameRule::new().unwrap(),
        repository_signing_enabled,
    )
}

fn failed() -> ValidationResult {
    ValidationResult::failed(vec![ValidationIssue::new(IssueCode::PackageIsZip64)])
}

#[tokio::test]
async fn failure_is_suppressed_when_repository_signing_is_disabled() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, false);
    let request = request("Contoso.Lib");

    let result = validator.validate(&request, failed()).await.unwrap();

    assert_eq!(result, ValidationResult::succeeded());
    assert!(fixture.log.contains("repository_signing_disabled"));
}

#[tokio::test]
async fn failure_with_valid_owners_is_an_integration_defect() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, true);
    let request = request("Contoso.Lib");
    fixture.add_package(&request, &["contoso", "build.bot"]);

    let error = validator.validate(&request, failed()).await.unwrap_err();

    assert!(matches!(error, ValidatorError::UnexpectedResult(_)));
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn failure_is_suppressed_for_invalid_owner_username() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, true);
    let request = request("Contoso.Lib");
    fixture.add_package(&request, &["contoso", "legacy owner"]);

    let result = validator.validate(&request, failed()).await.unwrap();

    assert_eq!(result, ValidationResult::succeeded());
    assert!(fixture.log.contains("invalid_owner_username"));
}

#[tokio::test]
async fn replaced_artifact_is_treated_like_a_failure() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, true);
    let request = request("Contoso.Lib");
    fixture.add_package(&request, &["contoso"]);
    let mut replaced = ValidationResult::succeeded();
    replaced.nupkg_url = Some("https://packages.test/resigned.nupkg".to_string());

    let error = validator.validate(&request, replaced).await.unwrap_err();
    assert!(matches!(error, ValidatorError::UnexpectedResult(_)));
}

#[tokio::test]
async fn missing_package_is_reported_when_owners_are_needed() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, true);
    let request = request("Contoso.Lib");

    let error = validator.validate(&request, failed()).await.unwrap_err();
    assert!(matches!(error, ValidatorError::Metadata(_)));
}

#[tokio::test]
async fn issues_are_never_surfaced() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, true);
    let request = request("Contoso.Lib");
    let mut result = ValidationResult::succeeded();
    result.issues.push(ValidationIssue::new(IssueCode::PackageIsZip64));

    let validated = validator.validate(&request, result).await.unwrap();
    assert_eq!(validated, ValidationResult::succeeded());
}

#[tokio::test]
async fn start_requires_repository_signature_and_applies_rule_on_poll() {
    let fixture = Fixture::new();
    let validator = validator(&fixture, false);
    let request = request("Contoso.Lib");

    let started = validator.start(&request).await.unwrap();
    assert_eq!(started.status, ValidationStatus::Incomplete);
    let messages = fixture.queue.messages_for(MessageTopic::SignatureValidation);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].require_repository_signature);

    fixture
        .state
        .try_update_validator_status(validator.name(), &request, ValidationStatus::Incomplete, &failed())
        .await
        .unwrap();
    let polled = validator.get_result(&request).await.unwrap();
    assert_eq!(polled, ValidationResult::succeeded());
}
