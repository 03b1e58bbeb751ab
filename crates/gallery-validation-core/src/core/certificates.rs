// crates/gallery-validation-core/src/core/certificates.rs
// ============================================================================
// Module: End Certificate Status
// Description: Revocation status of signing end certificates.
// Purpose: Recompute certificate status from online checks with bounded caching.
// Dependencies: crate::core::time, serde
// ============================================================================

//! ## Overview
//! Each end certificate carries the status observed by its most recent online
//! verification. Status is never trusted beyond the configured cache window:
//! once the window elapses, [`EndCertificate::needs_online_check`] reports
//! true and the caller must verify again before relying on it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Revocation status of an end certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCertificateStatus {
    /// Certificate is valid and not revoked.
    Good,
    /// Certificate failed chain building or is otherwise unusable.
    Invalid,
    /// Certificate was revoked.
    Revoked,
    /// Status could not be determined.
    Unknown,
}

/// Result of one online verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateVerification {
    /// Observed status.
    pub status: EndCertificateStatus,
    /// Revocation time reported by the responder, if revoked.
    pub revocation_time: Option<Timestamp>,
    /// Responder's status update time.
    pub status_update_time: Option<Timestamp>,
}

/// End certificate tracked by the revocation checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndCertificate {
    /// Hex-encoded SHA-256 thumbprint.
    pub thumbprint: String,
    /// Current status.
    pub status: EndCertificateStatus,
    /// Responder's status update time from the last check.
    pub status_update_time: Option<Timestamp>,
    /// Revocation time, when revoked.
    pub revocation_time: Option<Timestamp>,
    /// Time of the last online check.
    pub last_verification_time: Option<Timestamp>,
}

impl EndCertificate {
    /// Creates a never-verified certificate record.
    #[must_use]
    pub fn unverified(thumbprint: impl Into<String>) -> Self {
        Self {
            thumbprint: thumbprint.into(),
            status: EndCertificateStatus::Unknown,
            status_update_time: None,
            revocation_time: None,
            last_verification_time: None,
        }
    }

    /// Returns true when the cached status is missing or older than `max_cache_age_ms`.
    #[must_use]
    pub fn needs_online_check(&self, now: Timestamp, max_cache_age_ms: u64) -> bool {
        self.last_verification_time
            .is_none_or(|verified| now.millis_since(verified) > max_cache_age_ms)
    }

    /// Returns a new record reflecting `verification` performed at `now`.
    #[must_use]
    pub fn apply_verification(&self, verification: CertificateVerification, now: Timestamp) -> Self {
        let revocation_time = match verification.status {
            EndCertificateStatus::Revoked => verification.revocation_time,
            EndCertificateStatus::Good => None,
            EndCertificateStatus::Invalid | EndCertificateStatus::Unknown => self.revocation_time,
        };
        Self {
            thumbprint: self.thumbprint.clone(),
            status: verification.status,
            status_update_time: verification.status_update_time,
            revocation_time,
            last_verification_time: Some(now),
        }
    }
}
