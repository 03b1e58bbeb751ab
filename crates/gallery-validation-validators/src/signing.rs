// crates/gallery-validation-validators/src/signing.rs
// ============================================================================
// Module: Package Signing Validators
// Description: Repository signing processor and repository signature check.
// Purpose: Sign packages, then verify the signature without blocking on known-broken input.
// Dependencies: gallery-validation-core, async-trait
// ============================================================================

//! ## Overview
//! [`PackageSigningProcessor`] asks the signing worker to repository-sign a
//! package and may finish with a replacement artifact URL.
//! [`PackageSignatureValidator`] runs afterwards and asks the same worker to
//! verify that a repository signature is present. At that point a failure or
//! a replaced artifact is only acceptable when repository signing is switched
//! off, or when an owner's username predates the current naming rules. Any
//! other occurrence means the check itself misbehaved and is surfaced as
//! [`ValidatorError::UnexpectedResult`] so the message dead-letters.
//! Issues from the signature check are never surfaced: author-signature
//! problems were already reported by the processor step.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use gallery_validation_core::LogLevel;
use gallery_validation_core::MessageTopic;
use gallery_validation_core::MetadataError;
use gallery_validation_core::PackageMetadataSource;
use gallery_validation_core::ValidationRequest;
use gallery_validation_core::ValidationResult;
use gallery_validation_core::ValidationStatus;
use gallery_validation_core::Validator;
use gallery_validation_core::ValidatorError;
use gallery_validation_core::ValidatorKind;
use gallery_validation_core::ValidatorName;

use crate::queued::QueuedServices;
use crate::queued::QueuedValidator;
use crate::username::UsernameRule;

// ============================================================================
// SECTION: Signing Processor
// ============================================================================

/// Repository-signs packages; the only step allowed to replace the artifact.
#[derive(Clone)]
pub struct PackageSigningProcessor {
    /// Queue-backed engine.
    engine: QueuedValidator,
}

impl PackageSigningProcessor {
    /// Creates the processor.
    #[must_use]
    pub fn new(services: QueuedServices) -> Self {
        Self {
            engine: QueuedValidator::new(
                ValidatorKind::PackageSigningProcessor.as_str(),
                MessageTopic::SignatureValidation,
                false,
                services,
            ),
        }
    }
}

#[async_trait]
impl Validator for PackageSigningProcessor {
    fn name(&self) -> &ValidatorName {
        self.engine.name()
    }

    async fn start(&self, request: &ValidationRequest) -> Result<ValidationResult, ValidatorError> {
        self.engine.start(request).await
    }

    async fn get_result(
        &self,
        request: &ValidationRequest,
    ) -> Result<ValidationResult, ValidatorError> {
        self.engine.get_result(request).await
    }
}

// ============================================================================
// SECTION: Signature Validator
// ============================================================================

/// Verifies the repository signature produced by the processor.
#[derive(Clone)]
pub struct PackageSignatureValidator {
    /// Queue-backed engine.
    engine: QueuedValidator,
    /// Package owner lookups.
    metadata: Arc<dyn PackageMetadataSource>,
    /// Owner username rule.
    usernames: UsernameRule,
    /// Whether the environment repository-signs packages.
    repository_signing_enabled: bool,
}

impl PackageSignatureValidator {
    /// Creates the validator.
    #[must_use]
    pub fn new(
        services: QueuedServices,
        metadata: Arc<dyn PackageMetadataSource>,
        usernames: UsernameRule,
        repository_signing_enabled: bool,
    ) -> Self {
        Self {
            engine: QueuedValidator::new(
                ValidatorKind::PackageSignatureValidator.as_str(),
                MessageTopic::SignatureValidation,
                true,
                services,
            ),
            metadata,
            usernames,
            repository_signing_enabled,
        }
    }

    /// Applies the suppression rule to a result from the signature worker.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::UnexpectedResult`] when the result failed or
    /// replaced the artifact and neither tolerated condition holds, or
    /// [`ValidatorError::Metadata`] when the package cannot be looked up.
    pub async fn validate(
        &self,
        request: &ValidationRequest,
        result: ValidationResult,
    ) -> Result<ValidationResult, ValidatorError> {
        let anomalous = result.status == ValidationStatus::Failed || result.nupkg_url.is_some();
        if !anomalous {
            return Ok(ValidationResult::from_status(result.status));
        }

        if !self.repository_signing_enabled {
            self.engine.log(
                "repository_signing_disabled",
                LogLevel::Warn,
                request,
                format!(
                    "ignoring {} result because repository signing is disabled",
                    result.status.as_str()
                ),
            );
            return Ok(ValidationResult::succeeded());
        }

        if let Some(owner) = self.invalid_owner(request).await? {
            self.engine.log(
                "invalid_owner_username",
                LogLevel::Warn,
                request,
                format!(
                    "ignoring {} result because owner {owner} has an invalid username",
                    result.status.as_str()
                ),
            );
            return Ok(ValidationResult::succeeded());
        }

        Err(ValidatorError::UnexpectedResult(format!(
            "repository signature check for {} {} returned {} (artifact replaced: {})",
            request.package_id,
            request.package_version,
            result.status.as_str(),
            result.nupkg_url.is_some()
        )))
    }

    /// Returns the first owner whose username breaks the naming rule.
    async fn invalid_owner(&self, request: &ValidationRequest) -> Result<Option<String>, ValidatorError> {
        let package = self
            .metadata
            .find_package(request.package_key)
            .await?
            .ok_or_else(|| MetadataError::NotFound(request.package_key.to_string()))?;
        Ok(package.owners.into_iter().find(|owner| !self.usernames.is_valid(owner)))
    }
}

#[async_trait]
impl Validator for PackageSignatureValidator {
    fn name(&self) -> &ValidatorName {
        self.engine.name()
    }

    async fn start(&self, request: &ValidationRequest) -> Result<ValidationResult, ValidatorError> {
        let result = self.engine.start(request).await?;
        self.validate(request, result).await
    }

    async fn get_result(
        &self,
        request: &ValidationRequest,
    ) -> Result<ValidationResult, ValidatorError> {
        let result = self.engine.get_result(request).await?;
        self.validate(request, result).await
    }
}
