// crates/gallery-validation-core/tests/status_store.rs
// ============================================================================
// Module: Validator Status Store Tests
// Description: Conditional status writes under contention.
// Purpose: Ensure exactly one transition wins and losers observe the winner.
// ============================================================================

//! Optimistic status transition tests for the in-memory status store.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::num::NonZeroU64;
use std::sync::Arc;

use gallery_validation_core::InMemoryValidatorStateStore;
use gallery_validation_core::IssueCode;
use gallery_validation_core::PackageId;
use gallery_validation_core::PackageKey;
use gallery_validation_core::PackageVersion;
use gallery_validation_core::StoreError;
use gallery_validation_core::ValidationId;
use gallery_validation_core::ValidationIssue;
use gallery_validation_core::ValidationRequest;
use gallery_validation_core::ValidationResult;
use gallery_validation_core::ValidationStatus;
use gallery_validation_core::ValidatorName;
use gallery_validation_core::ValidatorStateService;

fn request() -> ValidationRequest {
    ValidationRequest {
        validation_id: ValidationId::generate(),
        package_key: PackageKey::new(NonZeroU64::MIN),
        package_id: PackageId::new("Contoso.Lib"),
        package_version: PackageVersion::new("1.0.0"),
        nupkg_url: "https://packages.test/contoso.lib.1.0.0.nupkg".to_string(),
    }
}

#[tokio::test]
async fn missing_record_reads_as_not_started() {
    let store = InMemoryValidatorStateStore::new();
    let status = store.get_status(&ValidatorName::new("V"), &request()).await.unwrap();
    assert_eq!(status.state, ValidationStatus::NotStarted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_start_has_exactly_one_winner() {
    for _ in 0 .. 50 {
        let store = Arc::new(InMemoryValidatorStateStore::new());
        let request = Arc::new(request());
        let name = ValidatorName::new("SymbolValidator");
        let mut handles = Vec::new();
        for _ in 0 .. 2 {
            let store = Arc::clone(&store);
            let request = Arc::clone(&request);
            let name = name.clone();
            handles.push(tokio::spawn(async move {
                store
                    .try_add_validator_status(
                        &name,
                        &request,
                        ValidationStatus::NotStarted,
                        ValidationStatus::Incomplete,
                    )
                    .await
            }));
        }
        let mut applied = 0;
        for handle in handles {
            let transition = handle.await.unwrap().unwrap();
            if transition.applied {
                applied += 1;
            }
            assert_eq!(transition.current.state, ValidationStatus::Incomplete);
        }
        assert_eq!(applied, 1);
    }
}

#[tokio::test]
async fn terminal_update_records_issues_and_artifact() {
    let store = InMemoryValidatorStateStore::new();
    let request = request();
    let name = ValidatorName::new("PackageSigningProcessor");
    store
        .try_add_validator_status(
            &name,
            &request,
            ValidationStatus::NotStarted,
            ValidationStatus::Incomplete,
        )
        .await
        .unwrap();
    let mut result = ValidationResult::failed(vec![ValidationIssue::new(IssueCode::PackageIsZip64)]);
    result.nupkg_url = Some("https://packages.test/signed.nupkg".to_string());
    let transition = store
        .try_update_validator_status(&name, &request, ValidationStatus::Incomplete, &result)
        .await
        .unwrap();
    assert!(transition.applied);
    let stored = store.get_status(&name, &request).await.unwrap();
    assert_eq!(stored.to_result(), result);
}

#[tokio::test]
async fn terminal_state_cannot_be_left() {
    let store = InMemoryValidatorStateStore::new();
    let request = request();
    let name = ValidatorName::new("V");
    store
        .try_add_validator_status(
            &name,
            &request,
            ValidationStatus::NotStarted,
            ValidationStatus::Succeeded,
        )
        .await
        .unwrap();
    let error = store
        .try_add_validator_status(
            &name,
            &request,
            ValidationStatus::Succeeded,
            ValidationStatus::Incomplete,
        )
        .await
        .unwrap_err();
    assert!(matches!(error, StoreError::InvalidTransition { .. }));
    let stale = store
        .try_add_validator_status(
            &name,
            &request,
            ValidationStatus::NotStarted,
            ValidationStatus::Incomplete,
        )
        .await
        .unwrap();
    assert!(!stale.applied);
    assert_eq!(stale.current.state, ValidationStatus::Succeeded);
}
