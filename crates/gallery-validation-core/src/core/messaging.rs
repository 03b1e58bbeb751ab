// crates/gallery-validation-core/src/core/messaging.rs
// ============================================================================
// Module: Validation Messages
// Description: Payloads enqueued to external validation workers.
// Purpose: Carry attempt and package identity to asynchronous processors.
// Dependencies: crate::core::{identifiers, status}, serde
// ============================================================================

//! ## Overview
//! Enqueue is at-least-once. Workers must treat duplicate messages for the
//! same [`ValidationId`] as the same unit of work.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PackageId;
use crate::core::identifiers::PackageKey;
use crate::core::identifiers::PackageVersion;
use crate::core::identifiers::ValidationId;
use crate::core::status::ValidationRequest;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Destination of a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageTopic {
    /// Package signature processing queue.
    SignatureValidation,
    /// Symbol processing topic.
    SymbolValidation,
    /// Legacy virus-scanning job queue.
    LegacyVirusScan,
}

impl MessageTopic {
    /// Returns the stable topic label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignatureValidation => "signature_validation",
            Self::SymbolValidation => "symbol_validation",
            Self::LegacyVirusScan => "legacy_virus_scan",
        }
    }
}

/// Message sent to an external validation worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    /// Destination topic.
    pub topic: MessageTopic,
    /// Attempt identifier.
    pub validation_id: ValidationId,
    /// Package database key.
    pub package_key: PackageKey,
    /// Package identifier.
    pub package_id: PackageId,
    /// Package version.
    pub package_version: PackageVersion,
    /// Artifact URL to process.
    pub nupkg_url: String,
    /// Whether the worker must insist on a repository signature.
    pub require_repository_signature: bool,
}

impl ValidationMessage {
    /// Builds a message for `request` on `topic`.
    #[must_use]
    pub fn for_request(topic: MessageTopic, request: &ValidationRequest) -> Self {
        Self {
            topic,
            validation_id: request.validation_id,
            package_key: request.package_key,
            package_id: request.package_id.clone(),
            package_version: request.package_version.clone(),
            nupkg_url: request.nupkg_url.clone(),
            require_repository_signature: false,
        }
    }

    /// Sets the repository-signature requirement.
    #[must_use]
    pub const fn requiring_repository_signature(mut self, required: bool) -> Self {
        self.require_repository_signature = required;
        self
    }
}
