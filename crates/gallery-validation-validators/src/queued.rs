// crates/gallery-validation-validators/src/queued.rs
// ============================================================================
// Module: Queued Validator Engine
// Description: Shared start/poll logic for message-driven validators.
// Purpose: Enqueue external work once per validation and track it by status.
// Dependencies: gallery-validation-core
// ============================================================================

//! ## Overview
//! A queued validator hands work to an external worker through a message
//! topic and learns the outcome from the status store, which the worker
//! updates when it finishes. `start` is idempotent: it only enqueues while the
//! stored status is `NotStarted`, then records `Incomplete` with a
//! compare-and-swap. Two concurrent starts can both enqueue; the loser of the
//! status race logs the duplicate and reports the winner's state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use gallery_validation_core::Clock;
use gallery_validation_core::LogLevel;
use gallery_validation_core::MessageEnqueuer;
use gallery_validation_core::MessageTopic;
use gallery_validation_core::SharedLogSink;
use gallery_validation_core::ValidationLogEvent;
use gallery_validation_core::ValidationMessage;
use gallery_validation_core::ValidationRequest;
use gallery_validation_core::ValidationResult;
use gallery_validation_core::ValidationStatus;
use gallery_validation_core::ValidatorError;
use gallery_validation_core::ValidatorName;
use gallery_validation_core::ValidatorStateService;

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Collaborators shared by queued validators.
#[derive(Clone)]
pub struct QueuedServices {
    /// Authoritative status store.
    pub state: Arc<dyn ValidatorStateService>,
    /// Outbound message sender.
    pub queue: Arc<dyn MessageEnqueuer>,
    /// Time source for log events.
    pub clock: Arc<dyn Clock>,
    /// Structured log sink.
    pub log: SharedLogSink,
}

/// Start/poll engine bound to one validator name and topic.
#[derive(Clone)]
pub struct QueuedValidator {
    /// Validator name used as the status key.
    name: ValidatorName,
    /// Destination topic.
    topic: MessageTopic,
    /// Repository-signature flag placed on outgoing messages.
    require_repository_signature: bool,
    /// Collaborators.
    services: QueuedServices,
}

impl QueuedValidator {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        name: impl Into<ValidatorName>,
        topic: MessageTopic,
        require_repository_signature: bool,
        services: QueuedServices,
    ) -> Self {
        Self {
            name: name.into(),
            topic,
            require_repository_signature,
            services,
        }
    }

    /// Returns the validator name.
    #[must_use]
    pub const fn name(&self) -> &ValidatorName {
        &self.name
    }

    /// Emits a log event tagged with this validator and `request`.
    pub fn log(
        &self,
        event: &'static str,
        level: LogLevel,
        request: &ValidationRequest,
        message: impl Into<String>,
    ) {
        let entry = ValidationLogEvent::new(event, level, self.services.clock.now(), message)
            .for_request(&self.name, request);
        self.services.log.record(&entry);
    }

    /// Enqueues work and records `Incomplete`, unless already started.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`] when the store or the queue fails.
    pub async fn start(&self, request: &ValidationRequest) -> Result<ValidationResult, ValidatorError> {
        let current = self.services.state.get_status(&self.name, request).await?;
        if current.state != ValidationStatus::NotStarted {
            self.log(
                "duplicate_start",
                LogLevel::Warn,
                request,
                format!("start requested while status is {}", current.state.as_str()),
            );
            return Ok(current.to_result());
        }

        let message = ValidationMessage::for_request(self.topic, request)
            .requiring_repository_signature(self.require_repository_signature);
        self.services.queue.enqueue(message).await?;

        let transition = self
            .services
            .state
            .try_add_validator_status(
                &self.name,
                request,
                ValidationStatus::NotStarted,
                ValidationStatus::Incomplete,
            )
            .await?;
        if !transition.applied {
            self.log(
                "lost_status_race",
                LogLevel::Info,
                request,
                format!(
                    "another start won the status race; message may be duplicated (status {})",
                    transition.current.state.as_str()
                ),
            );
        }
        Ok(transition.current.to_result())
    }

    /// Maps the stored status to a result.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::Store`] when the store cannot be read.
    pub async fn get_result(
        &self,
        request: &ValidationRequest,
    ) -> Result<ValidationResult, ValidatorError> {
        Ok(self.services.state.get_status(&self.name, request).await?.to_result())
    }
}
