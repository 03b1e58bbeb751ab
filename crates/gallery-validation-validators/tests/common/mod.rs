// crates/gallery-validation-validators/tests/common/mod.rs
// ============================================================================
// Module: Validator Test Fixtures
// Description: In-memory collaborators shared by validator suites.
// Purpose: Build validators against deterministic stores, queues, and clocks.
// ============================================================================

//! Shared fixtures for validator integration tests.

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::num::NonZeroU64;
use std::sync::Arc;

use gallery_validation_core::AuditorSettings;
use gallery_validation_core::FixedClock;
use gallery_validation_core::InMemoryBlobStore;
use gallery_validation_core::InMemoryValidatorStateStore;
use gallery_validation_core::MemoryLogSink;
use gallery_validation_core::PackageId;
use gallery_validation_core::PackageKey;
use gallery_validation_core::PackageMetadata;
use gallery_validation_core::PackageValidationAuditor;
use gallery_validation_core::PackageVersion;
use gallery_validation_core::Timestamp;
use gallery_validation_core::ValidationId;
use gallery_validation_core::ValidationRequest;
use gallery_validation_validators::InMemoryMessageQueue;
use gallery_validation_validators::InMemoryPackageMetadataSource;
use gallery_validation_validators::QueuedServices;
use gallery_validation_validators::ValidatorDependencies;
use gallery_validation_validators::VcsServices;

/// In-memory collaborators plus handles for assertions.
pub struct Fixture {
    pub state: InMemoryValidatorStateStore,
    pub queue: InMemoryMessageQueue,
    pub metadata: InMemoryPackageMetadataSource,
    pub auditor: PackageValidationAuditor,
    pub clock: Arc<FixedClock>,
    pub log: MemoryLogSink,
}

impl Fixture {
    pub fn new() -> Self {
        let clock = Arc::new(FixedClock::new(Timestamp::from_unix_millis(5_000)));
        let blobs = InMemoryBlobStore::new(clock.clone());
        let auditor = PackageValidationAuditor::new(
            Arc::new(blobs),
            clock.clone(),
            AuditorSettings {
                container_prefix: "validation".to_string(),
                lease_ms: 30_000,
                max_lease_attempts: 10,
                lease_retry_delay_ms: 1,
            },
        );
        Self {
            state: InMemoryValidatorStateStore::new(),
            queue: InMemoryMessageQueue::new(),
            metadata: InMemoryPackageMetadataSource::new(),
            auditor,
            clock,
            log: MemoryLogSink::new(),
        }
    }

    pub fn queued(&self) -> QueuedServices {
        QueuedServices {
            state: Arc::new(self.state.clone()),
            queue: Arc::new(self.queue.clone()),
            clock: self.clock.clone(),
            log: Arc::new(self.log.clone()),
        }
    }

    pub fn vcs(&self) -> VcsServices {
        VcsServices {
            auditor: self.auditor.clone(),
            queue: Arc::new(self.queue.clone()),
            metadata: Arc::new(self.metadata.clone()),
            clock: self.clock.clone(),
            log: Arc::new(self.log.clone()),
        }
    }

    pub fn dependencies(&self) -> ValidatorDependencies {
        ValidatorDependencies {
            state: Arc::new(self.state.clone()),
            queue: Arc::new(self.queue.clone()),
            metadata: Arc::new(self.metadata.clone()),
            auditor: self.auditor.clone(),
            clock: self.clock.clone(),
            log: Arc::new(self.log.clone()),
        }
    }

    /// Registers the request's package with `owners`.
    pub fn add_package(&self, request: &ValidationRequest, owners: &[&str]) {
        self.metadata
            .insert(PackageMetadata {
                key: request.package_key,
                id: request.package_id.clone(),
                version: request.package_version.clone(),
                owners: owners.iter().map(ToString::to_string).collect(),
            })
            .unwrap();
    }
}

pub fn request(id: &str) -> ValidationRequest {
    ValidationRequest {
        validation_id: ValidationId::generate(),
        package_key: PackageKey::new(NonZeroU64::MIN),
        package_id: PackageId::new(id),
        package_version: PackageVersion::new("1.0.0"),
        nupkg_url: "https://packages.test/contoso.lib.1.0.0.nupkg".to_string(),
    }
}
