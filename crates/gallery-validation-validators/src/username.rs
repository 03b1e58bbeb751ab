// crates/gallery-validation-validators/src/username.rs
// ============================================================================
// Module: Owner Username Rule
// Description: Structural validity check for gallery account usernames.
// Purpose: Detect legacy owners whose names predate the current rules.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! A valid username is 1 to 64 characters long, starts and ends with an ASCII
//! letter or digit, and otherwise contains only letters, digits, `_`, `.`,
//! or `-`. Packages owned by accounts that violate the rule are known-broken
//! input for repository signature checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;

// ============================================================================
// SECTION: Rule
// ============================================================================

/// Username pattern.
const USERNAME_PATTERN: &str = r"^[A-Za-z0-9](?:[A-Za-z0-9_.\-]{0,62}[A-Za-z0-9])?$";

/// Compiled username rule.
#[derive(Debug, Clone)]
pub struct UsernameRule {
    /// Compiled pattern.
    pattern: Regex,
}

impl UsernameRule {
    /// Compiles the rule.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if the pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(USERNAME_PATTERN)?,
        })
    }

    /// Returns true when `username` is structurally valid.
    #[must_use]
    pub fn is_valid(&self, username: &str) -> bool {
        self.pattern.is_match(username)
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::UsernameRule;

    #[test]
    fn accepts_conventional_names() {
        let rule = UsernameRule::new().unwrap();
        for name in ["a", "contoso", "Contoso.Build_Bot-2", &"x".repeat(64)] {
            assert!(rule.is_valid(name), "{name}");
        }
    }

    #[test]
    fn rejects_malformed_names() {
        let rule = UsernameRule::new().unwrap();
        for name in ["", "-lead", "trail.", "has space", "ümlaut", &"x".repeat(65)] {
            assert!(!rule.is_valid(name), "{name}");
        }
    }
}
