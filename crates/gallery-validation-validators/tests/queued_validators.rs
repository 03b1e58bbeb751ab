// crates/gallery-validation-validators/tests/queued_validators.rs
// ============================================================================
// Module: Queued Validator Tests
// Description: Start idempotency and race handling for message-driven steps.
// Purpose: Ensure external work is enqueued once per validation attempt.
// ============================================================================

//! Queued validator tests over the in-memory status store and queue.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use gallery_validation_core::InMemoryValidatorStateStore;
use gallery_validation_core::LogLevel;
use gallery_validation_core::MessageTopic;
use gallery_validation_core::StatusTransition;
use gallery_validation_core::StoreError;
use gallery_validation_core::ValidationRequest;
use gallery_validation_core::ValidationResult;
use gallery_validation_core::ValidationStatus;
use gallery_validation_core::Validator;
use gallery_validation_core::ValidatorName;
use gallery_validation_core::ValidatorStateService;
use gallery_validation_core::ValidatorStatus;
use gallery_validation_validators::PackageSigningProcessor;
use gallery_validation_validators::QueuedServices;
use gallery_validation_validators::SymbolValidator;

use crate::common::Fixture;
use crate::common::request;

/// Store whose reads always look fresh, as if a concurrent start had not landed yet.
struct StaleReadStore {
    inner: InMemoryValidatorStateStore,
}

#[async_trait]
impl ValidatorStateService for StaleReadStore {
    async fn get_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
    ) -> Result<ValidatorStatus, StoreError> {
        Ok(ValidatorStatus::not_started(validator, request))
    }

    async fn try_add_validator_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
        previous: ValidationStatus,
        new_status: ValidationStatus,
    ) -> Result<StatusTransition, StoreError> {
        self.inner.try_add_validator_status(validator, request, previous, new_status).await
    }

    async fn try_update_validator_status(
        &self,
        validator: &ValidatorName,
        request: &ValidationRequest,
        previous: ValidationStatus,
        result: &ValidationResult,
    ) -> Result<StatusTransition, StoreError> {
        self.inner.try_update_validator_status(validator, request, previous, result).await
    }
}

#[tokio::test]
async fn second_start_does_not_enqueue_again() {
    let fixture = Fixture::new();
    let processor = PackageSigningProcessor::new(fixture.queued());
    let request = request("Contoso.Lib");

    let first = processor.start(&request).await.unwrap();
    let second = processor.start(&request).await.unwrap();

    assert_eq!(first.status, ValidationStatus::Incomplete);
    assert_eq!(second.status, ValidationStatus::Incomplete);
    let messages = fixture.queue.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].topic, MessageTopic::SignatureValidation);
    assert!(!messages[0].require_repository_signature);
    assert_eq!(messages[0].nupkg_url, request.nupkg_url);
    assert!(fixture.log.events().iter().any(|event| {
        event.event == "duplicate_start" && event.level == LogLevel::Warn
    }));
}

#[tokio::test]
async fn start_after_completion_returns_terminal_result() {
    let fixture = Fixture::new();
    let symbols = SymbolValidator::new(fixture.queued());
    let request = request("Contoso.Lib.Symbols");
    symbols.start(&request).await.unwrap();
    fixture
        .state
        .try_update_validator_status(
            symbols.name(),
            &request,
            ValidationStatus::Incomplete,
            &ValidationResult::succeeded(),
        )
        .await
        .unwrap();

    let again = symbols.start(&request).await.unwrap();
    assert_eq!(again.status, ValidationStatus::Succeeded);
    assert_eq!(fixture.queue.messages_for(MessageTopic::SymbolValidation).len(), 1);
}

#[tokio::test]
async fn lost_status_race_is_logged_not_raised() {
    let fixture = Fixture::new();
    let services = QueuedServices {
        state: Arc::new(StaleReadStore {
            inner: fixture.state.clone(),
        }),
        ..fixture.queued()
    };
    let symbols = SymbolValidator::new(services);
    let request = request("Contoso.Lib.Symbols");

    symbols.start(&request).await.unwrap();
    let loser = symbols.start(&request).await.unwrap();

    assert_eq!(loser.status, ValidationStatus::Incomplete);
    assert_eq!(fixture.queue.messages().len(), 2);
    assert!(fixture.log.events().iter().any(|event| {
        event.event == "lost_status_race" && event.level == LogLevel::Info
    }));
}

#[tokio::test]
async fn enqueue_failure_leaves_status_not_started() {
    let fixture = Fixture::new();
    let processor = PackageSigningProcessor::new(fixture.queued());
    let request = request("Contoso.Lib");
    fixture.queue.set_failing(true);

    let error = processor.start(&request).await.unwrap_err();
    assert!(error.is_retryable());
    let result = processor.get_result(&request).await.unwrap();
    assert_eq!(result.status, ValidationStatus::NotStarted);

    fixture.queue.set_failing(false);
    let retried = processor.start(&request).await.unwrap();
    assert_eq!(retried.status, ValidationStatus::Incomplete);
    assert_eq!(fixture.queue.messages().len(), 1);
}

#[tokio::test]
async fn processor_result_carries_replacement_url() {
    let fixture = Fixture::new();
    let processor = PackageSigningProcessor::new(fixture.queued());
    let request = request("Contoso.Lib");
    processor.start(&request).await.unwrap();
    let mut signed = ValidationResult::succeeded();
    signed.nupkg_url = Some("https://packages.test/signed.nupkg".to_string());
    fixture
        .state
        .try_update_validator_status(processor.name(), &request, ValidationStatus::Incomplete, &signed)
        .await
        .unwrap();

    let result = processor.get_result(&request).await.unwrap();
    assert_eq!(result.nupkg_url.as_deref(), Some("https://packages.test/signed.nupkg"));
}
