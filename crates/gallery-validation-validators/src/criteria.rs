// crates/gallery-validation-validators/src/criteria.rs
// ============================================================================
// Module: Package Criteria
// Description: Eligibility rules selecting packages for legacy scanning.
// Purpose: Exempt configured owners and id patterns from a validator.
// Dependencies: gallery-validation-core, glob, thiserror
// ============================================================================

//! ## Overview
//! A package is eligible unless one of its owners is excluded or, when id
//! patterns are configured, its id matches none of them. Owner names and id
//! patterns compare case-insensitively. An empty pattern list includes every
//! id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use gallery_validation_core::PackageMetadata;
use glob::MatchOptions;
use glob::Pattern;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Criteria declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCriteria {
    /// Owners whose packages are exempt.
    #[serde(default)]
    pub exclude_owners: Vec<String>,
    /// Glob patterns of included package ids; empty includes all.
    #[serde(default)]
    pub include_id_patterns: Vec<String>,
}

/// Criteria compilation errors.
#[derive(Debug, Error)]
pub enum CriteriaError {
    /// An id pattern is not a valid glob.
    #[error("invalid package id pattern {pattern}: {reason}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Parser message.
        reason: String,
    },
}

/// Compiled criteria.
#[derive(Debug, Clone)]
pub struct PackageCriteriaEvaluator {
    /// Lowercased excluded owners.
    exclude_owners: Vec<String>,
    /// Compiled id patterns.
    include_id_patterns: Vec<Pattern>,
}

impl PackageCriteriaEvaluator {
    /// Compiles `criteria`.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::InvalidPattern`] for malformed globs.
    pub fn new(criteria: &PackageCriteria) -> Result<Self, CriteriaError> {
        let include_id_patterns = criteria
            .include_id_patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|err| CriteriaError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            exclude_owners: criteria.exclude_owners.iter().map(|owner| owner.to_lowercase()).collect(),
            include_id_patterns,
        })
    }

    /// Returns true when `package` is eligible.
    #[must_use]
    pub fn is_match(&self, package: &PackageMetadata) -> bool {
        let excluded = package
            .owners
            .iter()
            .any(|owner| self.exclude_owners.contains(&owner.to_lowercase()));
        if excluded {
            return false;
        }
        if self.include_id_patterns.is_empty() {
            return true;
        }
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.include_id_patterns
            .iter()
            .any(|pattern| pattern.matches_with(package.id.as_str(), options))
    }
}
