// crates/gallery-validation-core/src/core/package.rs
// ============================================================================
// Module: Package Metadata
// Description: Gallery package facts consumed by validators.
// Purpose: Describe package identity and ownership without ORM types.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Validators consult package ownership for eligibility criteria and for
//! tolerating known-broken owner data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PackageId;
use crate::core::identifiers::PackageKey;
use crate::core::identifiers::PackageVersion;

// ============================================================================
// SECTION: Package Metadata
// ============================================================================

/// Package version and its owners as recorded by the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package database key.
    pub key: PackageKey,
    /// Package identifier.
    pub id: PackageId,
    /// Package version.
    pub version: PackageVersion,
    /// Owner usernames.
    #[serde(default)]
    pub owners: Vec<String>,
}
