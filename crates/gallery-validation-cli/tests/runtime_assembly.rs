// crates/gallery-validation-cli/tests/runtime_assembly.rs
// ============================================================================
// Module: Runtime Assembly Tests
// Description: Orchestrator construction from configuration.
// Purpose: Ensure configured stores and validators drive a real pass.
// ============================================================================

//! Runtime assembly tests for the CLI.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::num::NonZeroU64;
use std::path::Path;
use std::sync::Arc;

use gallery_validation_cli::runtime::RuntimeError;
use gallery_validation_cli::runtime::RuntimeServices;
use gallery_validation_cli::runtime::build_orchestrator;
use gallery_validation_cli::runtime::verify_wiring;
use gallery_validation_config::OrchestratorConfig;
use gallery_validation_config::StateStoreType;
use gallery_validation_core::AuditTarget;
use gallery_validation_core::ContentType;
use gallery_validation_core::FixedClock;
use gallery_validation_core::MemoryLogSink;
use gallery_validation_core::MessageTopic;
use gallery_validation_core::PackageId;
use gallery_validation_core::PackageKey;
use gallery_validation_core::PackageMetadata;
use gallery_validation_core::PackageValidationAuditEntry;
use gallery_validation_core::PackageValidationAuditor;
use gallery_validation_core::PackageValidationInput;
use gallery_validation_core::PackageVersion;
use gallery_validation_core::SetOutcome;
use gallery_validation_core::SharedLogSink;
use gallery_validation_core::Timestamp;
use gallery_validation_core::ValidationEvent;
use gallery_validation_core::ValidationResult;
use gallery_validation_core::ValidationStatus;
use gallery_validation_core::ValidatorName;
use gallery_validation_core::ValidatorStateService;
use gallery_validation_store_sqlite::SqliteAuditBlobStore;
use gallery_validation_store_sqlite::SqliteStoreConfig;
use gallery_validation_store_sqlite::SqliteValidationStore;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const NUGET_PIPELINE: &str = r#"
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
"#;

const SIGNING_ONLY: &str = r#"
[[validation.content_types]]
name = "NuGet"

[[validation.content_types.steps]]
name = "PackageSigningProcessor"
should_start = true
track_after_ms = 600000
"#;

fn services(log: &Arc<MemoryLogSink>) -> RuntimeServices {
    let sink: SharedLogSink = Arc::<MemoryLogSink>::clone(log);
    RuntimeServices::new(
        sink,
        Arc::new(FixedClock::new(Timestamp::from_unix_millis(1_700_000_000_000))),
    )
}

fn sqlite_config(toml_str: &str, path: &Path) -> OrchestratorConfig {
    let mut config: OrchestratorConfig = toml::from_str(toml_str).unwrap();
    config.state_store.store_type = StateStoreType::Sqlite;
    config.state_store.path = Some(path.to_path_buf());
    config.validate().unwrap();
    config
}

fn input() -> PackageValidationInput {
    PackageValidationInput {
        content_type: ContentType::new("NuGet"),
        package_key: PackageKey::new(NonZeroU64::MIN),
        package_id: PackageId::new("Contoso.Lib"),
        package_version: PackageVersion::new("1.0.0"),
        nupkg_url: "https://packages.test/contoso.lib.1.0.0.nupkg".to_string(),
    }
}

fn seed_package(services: &RuntimeServices) {
    let input = input();
    services
        .metadata
        .insert(PackageMetadata {
            key: input.package_key,
            id: input.package_id,
            version: input.package_version,
            owners: vec!["contoso".to_string()],
        })
        .unwrap();
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn memory_runtime_starts_only_unblocked_steps() {
    let config: OrchestratorConfig = toml::from_str(NUGET_PIPELINE).unwrap();
    config.validate().unwrap();
    let log = Arc::new(MemoryLogSink::new());
    let services = services(&log);
    seed_package(&services);
    let orchestrator = build_orchestrator(&config, &services).unwrap();

    let set = orchestrator.create_set(input()).await.unwrap();
    let report = orchestrator.process(&set.set_id).await.unwrap();

    assert_eq!(report.outcome, SetOutcome::InProgress);
    assert_eq!(report.started, vec![ValidatorName::new("VcsValidator")]);
    assert_eq!(services.queue.messages_for(MessageTopic::LegacyVirusScan).len(), 1);
    assert!(services.queue.messages_for(MessageTopic::SignatureValidation).is_empty());
    assert!(log.contains("step_started"));
}

#[tokio::test]
async fn sqlite_runtime_completes_and_notifies_once() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state").join("validation.db");
    let config = sqlite_config(SIGNING_ONLY, &path);
    let log = Arc::new(MemoryLogSink::new());
    let services = services(&log);
    let orchestrator = build_orchestrator(&config, &services).unwrap();

    let set = orchestrator.create_set(input()).await.unwrap();
    let first = orchestrator.process(&set.set_id).await.unwrap();
    assert_eq!(first.outcome, SetOutcome::InProgress);
    assert_eq!(services.queue.messages_for(MessageTopic::SignatureValidation).len(), 1);

    let completion = SqliteValidationStore::new(&SqliteStoreConfig::new(&path)).unwrap();
    let mut signed = ValidationResult::succeeded();
    signed.nupkg_url = Some("https://packages.test/signed.nupkg".to_string());
    completion
        .try_update_validator_status(
            &ValidatorName::new("PackageSigningProcessor"),
            &set.request(),
            ValidationStatus::Incomplete,
            &signed,
        )
        .await
        .unwrap();

    let second = orchestrator.process(&set.set_id).await.unwrap();
    let third = orchestrator.process(&set.set_id).await.unwrap();

    assert_eq!(second.outcome, SetOutcome::Succeeded);
    assert!(second.notified);
    assert!(!third.notified);
    let notifications = log.events().into_iter().filter(|event| event.event == "set_outcome").count();
    assert_eq!(notifications, 1);
}

#[tokio::test]
async fn sqlite_runtime_resumes_scan_after_rebuild() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("validation.db");
    let config = sqlite_config(NUGET_PIPELINE, &path);
    let set = {
        let log = Arc::new(MemoryLogSink::new());
        let services = services(&log);
        seed_package(&services);
        let orchestrator = build_orchestrator(&config, &services).unwrap();
        let set = orchestrator.create_set(input()).await.unwrap();
        let first = orchestrator.process(&set.set_id).await.unwrap();
        assert_eq!(first.started, vec![ValidatorName::new("VcsValidator")]);
        set
    };

    let log = Arc::new(MemoryLogSink::new());
    let services = services(&log);
    seed_package(&services);
    let orchestrator = build_orchestrator(&config, &services).unwrap();
    let second = orchestrator.process(&set.set_id).await.unwrap();
    assert_eq!(second.outcome, SetOutcome::InProgress);
    assert!(second.started.is_empty());
    assert!(services.queue.messages().is_empty());

    let scanner_clock = Arc::new(FixedClock::new(Timestamp::from_unix_millis(1_700_000_000_500)));
    let scanner_store = SqliteValidationStore::new(&SqliteStoreConfig::new(&path)).unwrap();
    let scanner = PackageValidationAuditor::new(
        Arc::new(SqliteAuditBlobStore::new(&scanner_store, scanner_clock.clone())),
        scanner_clock,
        config.audit.auditor_settings(),
    );
    scanner
        .write_audit_entry(
            &AuditTarget::from(&set.request()),
            PackageValidationAuditEntry::new(
                Timestamp::from_unix_millis(1_700_000_000_500),
                "vcs-legacy-scan",
                ValidationEvent::PackageClean,
            ),
        )
        .await
        .unwrap();

    let third = orchestrator.process(&set.set_id).await.unwrap();
    assert_eq!(third.outcome, SetOutcome::InProgress);
    assert_eq!(third.started, vec![ValidatorName::new("PackageSigningProcessor")]);
    assert_eq!(services.queue.messages_for(MessageTopic::SignatureValidation).len(), 1);
}

#[test]
fn sqlite_runtime_reports_unusable_store_path() {
    let temp = TempDir::new().unwrap();
    let config = sqlite_config(SIGNING_ONLY, temp.path());
    let log = Arc::new(MemoryLogSink::new());

    let result = build_orchestrator(&config, &services(&log));

    assert!(matches!(result, Err(RuntimeError::Store(_))));
}

#[test]
fn wiring_check_leaves_sqlite_store_unopened() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state").join("validation.db");
    let config = sqlite_config(NUGET_PIPELINE, &path);
    let log = Arc::new(MemoryLogSink::new());

    verify_wiring(&config, &services(&log)).unwrap();

    assert!(!path.exists());
    assert!(!temp.path().join("state").exists());
}
