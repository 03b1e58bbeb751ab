// crates/gallery-validation-cli/src/runtime.rs
// ============================================================================
// Module: Orchestrator Runtime Assembly
// Description: Store selection, validator wiring, and outcome notification.
// Purpose: Turn a validated configuration into a ready orchestrator.
// Dependencies: gallery-validation-{config, core, store-sqlite, validators}
// ============================================================================

//! ## Overview
//! [`build_orchestrator`] opens the configured status, set, and audit blob
//! stores, builds the audit pipeline over them, registers every validator
//! kind, and validates the step graphs against the resulting registry. The
//! message queue and package metadata source are supplied by the caller so a
//! local run can seed packages and inspect the messages sent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use gallery_validation_config::ConfigError;
use gallery_validation_config::OrchestratorConfig;
use gallery_validation_config::StateStoreType;
use gallery_validation_core::AuditBlobStore;
use gallery_validation_core::Clock;
use gallery_validation_core::InMemoryBlobStore;
use gallery_validation_core::InMemoryValidationSetStore;
use gallery_validation_core::InMemoryValidatorStateStore;
use gallery_validation_core::LogLevel;
use gallery_validation_core::NotifyError;
use gallery_validation_core::OrchestratorError;
use gallery_validation_core::OutcomeNotifier;
use gallery_validation_core::PackageValidationAuditor;
use gallery_validation_core::PackageValidationSet;
use gallery_validation_core::SetOutcome;
use gallery_validation_core::SharedLogSink;
use gallery_validation_core::StoreError;
use gallery_validation_core::ValidationLogEvent;
use gallery_validation_core::ValidationOrchestrator;
use gallery_validation_core::ValidationSetId;
use gallery_validation_core::ValidationSetStore;
use gallery_validation_core::ValidatorStateService;
use gallery_validation_store_sqlite::SqliteAuditBlobStore;
use gallery_validation_store_sqlite::SqliteStoreError;
use gallery_validation_store_sqlite::SqliteValidationStore;
use gallery_validation_validators::FactoryError;
use gallery_validation_validators::InMemoryMessageQueue;
use gallery_validation_validators::InMemoryPackageMetadataSource;
use gallery_validation_validators::ValidatorDependencies;
use gallery_validation_validators::build_registry;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Orchestrator assembled by [`build_orchestrator`].
pub type Orchestrator = ValidationOrchestrator<SharedSetStore, LogOutcomeNotifier>;

/// Caller-owned collaborators.
#[derive(Clone)]
pub struct RuntimeServices {
    /// Outbound message queue.
    pub queue: InMemoryMessageQueue,
    /// Package metadata lookups.
    pub metadata: InMemoryPackageMetadataSource,
    /// Structured log sink.
    pub log: SharedLogSink,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl RuntimeServices {
    /// Creates services with an empty queue and metadata source.
    #[must_use]
    pub fn new(log: SharedLogSink, clock: Arc<dyn Clock>) -> Self {
        Self {
            queue: InMemoryMessageQueue::new(),
            metadata: InMemoryPackageMetadataSource::new(),
            log,
            clock,
        }
    }
}

/// Runtime assembly errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration could not be applied.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The `SQLite` store could not be opened.
    #[error("state store unavailable: {0}")]
    Store(#[from] SqliteStoreError),
    /// Validators could not be constructed.
    #[error(transparent)]
    Factory(#[from] FactoryError),
    /// The orchestrator rejected the configuration.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Builds an orchestrator for `config`.
///
/// # Errors
///
/// Returns [`RuntimeError`] when a store cannot be opened, a validator cannot
/// be constructed, or the step graphs do not match the registry.
pub fn build_orchestrator(
    config: &OrchestratorConfig,
    services: &RuntimeServices,
) -> Result<Orchestrator, RuntimeError> {
    let stores = open_stores(config, &services.clock)?;
    assemble(config, services, stores)
}

/// Checks that every configured validator can be constructed and that the
/// step graphs match the registry, using in-memory stores in place of the
/// configured backend so no state store file is opened or created.
///
/// # Errors
///
/// Returns [`RuntimeError`] when a validator cannot be constructed or the
/// step graphs do not match the registry.
pub fn verify_wiring(
    config: &OrchestratorConfig,
    services: &RuntimeServices,
) -> Result<(), RuntimeError> {
    assemble(config, services, memory_stores(&services.clock))?;
    Ok(())
}

/// Wires validators and the orchestrator over `stores`.
fn assemble(
    config: &OrchestratorConfig,
    services: &RuntimeServices,
    stores: RuntimeStores,
) -> Result<Orchestrator, RuntimeError> {
    let RuntimeStores {
        state,
        sets,
        blobs,
    } = stores;
    let auditor = PackageValidationAuditor::new(
        blobs,
        Arc::clone(&services.clock),
        config.audit.auditor_settings(),
    );
    let dependencies = ValidatorDependencies {
        state,
        queue: Arc::new(services.queue.clone()),
        metadata: Arc::new(services.metadata.clone()),
        auditor,
        clock: Arc::clone(&services.clock),
        log: Arc::clone(&services.log),
    };
    let registry = build_registry(&dependencies, &config.validator_settings())?;
    let notifier = LogOutcomeNotifier {
        log: Arc::clone(&services.log),
        clock: Arc::clone(&services.clock),
    };
    let orchestrator = ValidationOrchestrator::new(
        config.validation.clone(),
        registry,
        sets,
        notifier,
        Arc::clone(&services.clock),
        Arc::clone(&services.log),
    )?;
    Ok(orchestrator)
}

/// Stores selected by the `state_store` section.
struct RuntimeStores {
    /// Validator status store.
    state: Arc<dyn ValidatorStateService>,
    /// Validation set store.
    sets: SharedSetStore,
    /// Audit blob store.
    blobs: Arc<dyn AuditBlobStore>,
}

/// Opens the status, set, and audit blob stores for the configured backend.
fn open_stores(
    config: &OrchestratorConfig,
    clock: &Arc<dyn Clock>,
) -> Result<RuntimeStores, RuntimeError> {
    match config.state_store.store_type {
        StateStoreType::Memory => Ok(memory_stores(clock)),
        StateStoreType::Sqlite => {
            let store_config = config.state_store.sqlite_config().ok_or_else(|| {
                ConfigError::Invalid("sqlite state_store requires path".to_string())
            })?;
            let store = SqliteValidationStore::new(&store_config)?;
            Ok(RuntimeStores {
                blobs: Arc::new(SqliteAuditBlobStore::new(&store, Arc::clone(clock))),
                state: Arc::new(store.clone()),
                sets: SharedSetStore {
                    inner: Arc::new(store),
                },
            })
        }
    }
}

/// Returns process-local stores.
fn memory_stores(clock: &Arc<dyn Clock>) -> RuntimeStores {
    RuntimeStores {
        state: Arc::new(InMemoryValidatorStateStore::new()),
        sets: SharedSetStore {
            inner: Arc::new(InMemoryValidationSetStore::new()),
        },
        blobs: Arc::new(InMemoryBlobStore::new(Arc::clone(clock))),
    }
}

// ============================================================================
// SECTION: Set Store
// ============================================================================

/// Type-erased validation set store.
#[derive(Clone)]
pub struct SharedSetStore {
    /// Wrapped backend.
    inner: Arc<dyn ValidationSetStore>,
}

#[async_trait]
impl ValidationSetStore for SharedSetStore {
    async fn load(
        &self,
        set_id: &ValidationSetId,
    ) -> Result<Option<PackageValidationSet>, StoreError> {
        self.inner.load(set_id).await
    }

    async fn save(&self, set: &PackageValidationSet) -> Result<(), StoreError> {
        self.inner.save(set).await
    }
}

// ============================================================================
// SECTION: Outcome Notifier
// ============================================================================

/// Outcome notifier that records terminal outcomes as log events.
pub struct LogOutcomeNotifier {
    /// Destination sink.
    log: SharedLogSink,
    /// Time source.
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl OutcomeNotifier for LogOutcomeNotifier {
    async fn notify(
        &self,
        set: &PackageValidationSet,
        outcome: SetOutcome,
    ) -> Result<(), NotifyError> {
        let level = match outcome {
            SetOutcome::Failed => LogLevel::Warn,
            SetOutcome::Succeeded | SetOutcome::InProgress => LogLevel::Info,
        };
        let mut event = ValidationLogEvent::new(
            "set_outcome",
            level,
            self.clock.now(),
            format!("validation set {} {}", set.set_id, outcome.as_str()),
        );
        event.validation_id = Some(set.validation_id.to_string());
        event.package_id = Some(set.package_id.to_string());
        event.package_version = Some(set.package_version.to_string());
        self.log.record(&event);
        Ok(())
    }
}
