// crates/gallery-validation-validators/src/memory.rs
// ============================================================================
// Module: In-Memory Collaborators
// Description: Message queue and package metadata held in process memory.
// Purpose: Back validators in tests and local runs without a broker or database.
// Dependencies: gallery-validation-core, async-trait
// ============================================================================

//! ## Overview
//! [`InMemoryMessageQueue`] records every enqueued message in order and can be
//! switched into a failing mode to exercise transient send errors.
//! [`InMemoryPackageMetadataSource`] serves package lookups from a map.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use gallery_validation_core::EnqueueError;
use gallery_validation_core::MessageEnqueuer;
use gallery_validation_core::MessageTopic;
use gallery_validation_core::MetadataError;
use gallery_validation_core::PackageKey;
use gallery_validation_core::PackageMetadata;
use gallery_validation_core::PackageMetadataSource;
use gallery_validation_core::ValidationMessage;

// ============================================================================
// SECTION: Message Queue
// ============================================================================

/// In-memory message queue.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMessageQueue {
    /// Messages in send order.
    messages: Arc<Mutex<Vec<ValidationMessage>>>,
    /// When set, sends fail.
    failing: Arc<AtomicBool>,
}

impl InMemoryMessageQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns every message sent so far.
    #[must_use]
    pub fn messages(&self) -> Vec<ValidationMessage> {
        self.messages.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Returns messages sent to `topic`.
    #[must_use]
    pub fn messages_for(&self, topic: MessageTopic) -> Vec<ValidationMessage> {
        self.messages().into_iter().filter(|message| message.topic == topic).collect()
    }
}

#[async_trait]
impl MessageEnqueuer for InMemoryMessageQueue {
    async fn enqueue(&self, message: ValidationMessage) -> Result<(), EnqueueError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EnqueueError::Send(format!("{} queue unavailable", message.topic.as_str())));
        }
        self.messages
            .lock()
            .map_err(|_| EnqueueError::Send("message queue mutex poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}

// ============================================================================
// SECTION: Package Metadata
// ============================================================================

/// In-memory package metadata source.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPackageMetadataSource {
    /// Packages keyed by database key.
    packages: Arc<Mutex<BTreeMap<PackageKey, PackageMetadata>>>,
}

impl InMemoryPackageMetadataSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a package.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Lookup`] if the source mutex is poisoned.
    pub fn insert(&self, package: PackageMetadata) -> Result<(), MetadataError> {
        self.packages
            .lock()
            .map_err(|_| MetadataError::Lookup("package metadata mutex poisoned".to_string()))?
            .insert(package.key, package);
        Ok(())
    }
}

#[async_trait]
impl PackageMetadataSource for InMemoryPackageMetadataSource {
    async fn find_package(&self, key: PackageKey) -> Result<Option<PackageMetadata>, MetadataError> {
        let guard = self
            .packages
            .lock()
            .map_err(|_| MetadataError::Lookup("package metadata mutex poisoned".to_string()))?;
        Ok(guard.get(&key).cloned())
    }
}
