// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Startup reads of the data-source namespace: the IAM role with its seed
//! credentials, and the per-service endpoint overrides.
//!
//! ```json
//! "iam": {
//!   "role-arn": "arn:aws:iam::123456789012:role/guest",
//!   "role-name": "guest",
//!   "credentials": {"AccessKeyId": "...", "SecretAccessKey": "...", "Token": "...",
//!                   "Code": "Success", "Expiration": "...", "LastUpdated": "...",
//!                   "Type": "AWS-HMAC"}
//! },
//! "services": {"domain": "amazonaws.com", "endpoints": {"sts": "https://sts.example"}}
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

use crate::metadata::{FieldError, FieldMap, Fields, MetadataDocument};
use crate::models::{CredentialSnapshot, RoleIdentity};

/// Outcome of reading the `iam` section.
///
/// No role means no credential subsystem at all. A role without credentials
/// is served by the IAM endpoints but never refreshed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bootstrap {
    pub role: Option<RoleIdentity>,
    pub credentials: Option<CredentialSnapshot>,
}

/// Reads the IAM role and initial credentials from the seed document.
///
/// # Errors
///
/// Fails when the data-source namespace is missing, when `iam` is present
/// without `role-arn`, or when any credential field is missing or not a string.
#[tracing::instrument(skip(document))]
pub fn bootstrap(document: &MetadataDocument) -> Result<Bootstrap, FieldError> {
    let ds = document.data_source()?;

    let iam = ds.map("iam", Some(FieldMap::new()))?;
    if iam.is_empty() {
        tracing::info!("[imds] no IAM role configured in metadata");
        return Ok(Bootstrap::default());
    }
    let iam = Fields::new(&iam);

    let arn = iam.scalar("role-arn", None)?;
    let role = RoleIdentity::new(arn, iam.optional_scalar("role-name")?);

    let credentials = iam.map("credentials", Some(FieldMap::new()))?;
    if credentials.is_empty() {
        tracing::warn!("[imds] IAM role {} has no credentials in metadata", role.name);
        return Ok(Bootstrap {
            role: Some(role),
            credentials: None,
        });
    }

    let credentials = CredentialSnapshot::from_seed(&Fields::new(&credentials))?;
    tracing::info!("[imds] loaded IAM credentials from metadata");

    Ok(Bootstrap {
        role: Some(role),
        credentials: Some(credentials),
    })
}

/// Service name to base URL, from `services.endpoints`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointOverrides {
    endpoints: BTreeMap<String, String>,
}

impl EndpointOverrides {
    pub fn new(endpoints: BTreeMap<String, String>) -> Self {
        Self { endpoints }
    }

    /// The overriding URL for `service`, or `None` to fall through to the
    /// default endpoint resolution.
    pub fn resolve(&self, service: &str) -> Option<&str> {
        self.endpoints.get(service).map(String::as_str)
    }
}

/// Reads `services.endpoints`. Absence of either level is an empty override set.
///
/// # Errors
///
/// Fails when either level is not a map or an endpoint URL is not a string.
pub fn resolve_endpoint_overrides(
    document: &MetadataDocument,
) -> Result<EndpointOverrides, FieldError> {
    let ds = document.data_source()?;
    let services = ds.map("services", Some(FieldMap::new()))?;
    let endpoints = Fields::new(&services).map("endpoints", Some(FieldMap::new()))?;

    let endpoints = endpoints
        .into_iter()
        .map(|(service, url)| match url {
            Value::String(url) => {
                tracing::info!("[imds] AWS endpoint for {}: {}", service, url);
                Ok((service, url))
            }
            _ => Err(FieldError::WrongType {
                name: format!("services.endpoints.{service}"),
                expected: "string",
            }),
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(EndpointOverrides::new(endpoints))
}
