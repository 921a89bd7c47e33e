// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Issuance of temporary credentials for the configured role.

use std::sync::Arc;

use arc_swap::ArcSwap;
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_credential_types::provider::ProvideCredentials;

use crate::bootstrap::EndpointOverrides;
use crate::constants::{ASSUME_ROLE_SESSION_NAME, STS_SERVICE};
use crate::errors::AppError;

#[async_trait::async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// Issues a new temporary credential. The expiry is carried on the
    /// returned [`Credentials`].
    async fn issue(&self) -> Result<Credentials, AppError>;
}

/// Assumes a role through STS.
///
/// The first request is signed with the seed credentials. Every successful
/// issuance becomes the signing credential of the next request, so the chain
/// keeps going after the seed itself has expired.
pub struct StsIssuer {
    role_arn: String,
    config: SdkConfig,
    base: ArcSwap<Credentials>,
}

impl StsIssuer {
    #[tracing::instrument(skip(base, overrides))]
    pub async fn new(
        region: String,
        role_arn: String,
        base: Credentials,
        overrides: &EndpointOverrides,
    ) -> Self {
        tracing::info!("[imds] AWS region: {}", region);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(base.clone());
        // an explicit override wins, otherwise the SDK resolves the endpoint
        if let Some(url) = overrides.resolve(STS_SERVICE) {
            tracing::info!("[imds] using {} endpoint override {}", STS_SERVICE, url);
            loader = loader.endpoint_url(url);
        }
        let config = loader.load().await;

        Self {
            role_arn,
            config,
            base: ArcSwap::from_pointee(base),
        }
    }
}

#[async_trait::async_trait]
impl CredentialIssuer for StsIssuer {
    #[tracing::instrument(skip(self), fields(role_arn = %self.role_arn))]
    async fn issue(&self) -> Result<Credentials, AppError> {
        let base = self.base.load_full();
        let provider = AssumeRoleProvider::builder(self.role_arn.clone())
            .session_name(ASSUME_ROLE_SESSION_NAME)
            .configure(&self.config)
            .build_from_provider(Credentials::clone(&base))
            .await;

        let credentials = provider.provide_credentials().await?;
        self.base.store(Arc::new(credentials.clone()));

        Ok(credentials)
    }
}
