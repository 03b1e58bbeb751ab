// crates/gallery-validation-core/src/core/kinds.rs
// ============================================================================
// Module: Validator Kinds
// Description: Closed set of validator implementations known to the pipeline.
// Purpose: Map configuration names to validator kinds without reflection.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! Every validator the orchestrator can run is a [`ValidatorKind`]. Its
//! string name is the graph node identifier used in configuration and is
//! matched case-sensitively. [`ValidatorCatalog`] answers name queries for
//! startup validation before any validator instance exists.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::interfaces::ValidatorProvider;

// ============================================================================
// SECTION: Validator Kinds
// ============================================================================

/// Registered validator implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidatorKind {
    /// Repository-signs packages; may replace the artifact.
    PackageSigningProcessor,
    /// Verifies the repository signature produced by the processor.
    PackageSignatureValidator,
    /// Validates symbol packages against their assemblies.
    SymbolValidator,
    /// Bridges the legacy audit-driven virus scan.
    VcsValidator,
}

impl ValidatorKind {
    /// All kinds in registration order.
    pub const ALL: [Self; 4] = [
        Self::PackageSigningProcessor,
        Self::PackageSignatureValidator,
        Self::SymbolValidator,
        Self::VcsValidator,
    ];

    /// Returns the configuration name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PackageSigningProcessor => "PackageSigningProcessor",
            Self::PackageSignatureValidator => "PackageSignatureValidator",
            Self::SymbolValidator => "SymbolValidator",
            Self::VcsValidator => "VcsValidator",
        }
    }

    /// Resolves a configuration name (case-sensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Returns true when the kind may mutate the package artifact.
    #[must_use]
    pub const fn is_processor(self) -> bool {
        matches!(self, Self::PackageSigningProcessor)
    }
}

/// Static catalog over [`ValidatorKind::ALL`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidatorCatalog;

impl ValidatorProvider for ValidatorCatalog {
    fn is_validator(&self, name: &str) -> bool {
        ValidatorKind::from_name(name).is_some()
    }

    fn is_processor(&self, name: &str) -> bool {
        ValidatorKind::from_name(name).is_some_and(ValidatorKind::is_processor)
    }
}
