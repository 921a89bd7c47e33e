// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;
use std::time::SystemTime;

use aws_credential_types::Credentials;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use zeroize::ZeroizeOnDrop;

use crate::constants::{
    DEFAULT_CREDENTIAL_CODE, DEFAULT_CREDENTIAL_TYPE, SEED_CREDENTIALS_PROVIDER,
};
use crate::metadata::{FieldError, Fields};

/// The role the refresher assumes and the credential endpoints advertise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleIdentity {
    pub arn: String,
    pub name: String,
}

impl RoleIdentity {
    /// Builds the identity from an ARN, naming it after the ARN's last path
    /// segment unless an explicit name is given.
    pub fn new(arn: String, name: Option<String>) -> Self {
        let name = name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| arn.rsplit('/').next().unwrap_or_default().to_string());
        Self { arn, name }
    }
}

/// One fully-formed temporary credential, in the field order the instance
/// metadata service serializes it.
#[derive(Clone, PartialEq, Eq, Serialize, ZeroizeOnDrop)]
pub struct CredentialSnapshot {
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,

    #[serde(rename = "Code")]
    pub code: String,

    #[serde(rename = "Expiration")]
    pub expiration: String,

    #[serde(rename = "LastUpdated")]
    pub last_updated: String,

    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,

    #[serde(rename = "Token")]
    pub session_token: String,

    #[serde(rename = "Type")]
    pub credential_type: String,
}

// Custom Debug implementation to prevent accidental logging of sensitive data
impl fmt::Debug for CredentialSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSnapshot")
            .field("access_key_id", &"[REDACTED]")
            .field("code", &self.code)
            .field("expiration", &self.expiration)
            .field("last_updated", &self.last_updated)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("credential_type", &self.credential_type)
            .finish()
    }
}

impl CredentialSnapshot {
    /// Reads the seed's `iam.credentials` map. Every field is required.
    pub fn from_seed(credentials: &Fields<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            access_key_id: credentials.scalar("AccessKeyId", None)?,
            code: credentials.scalar("Code", None)?,
            expiration: credentials.scalar("Expiration", None)?,
            last_updated: credentials.scalar("LastUpdated", None)?,
            secret_access_key: credentials.scalar("SecretAccessKey", None)?,
            session_token: credentials.scalar("Token", None)?,
            credential_type: credentials.scalar("Type", None)?,
        })
    }

    /// Builds the snapshot for a freshly issued credential. `Code` and `Type`
    /// carry over from the snapshot being replaced.
    pub fn issued(
        credentials: &Credentials,
        expires_at: SystemTime,
        issued_at: SystemTime,
        previous: Option<&CredentialSnapshot>,
    ) -> Self {
        let (code, credential_type) = match previous {
            Some(previous) => (previous.code.clone(), previous.credential_type.clone()),
            None => (
                DEFAULT_CREDENTIAL_CODE.to_string(),
                DEFAULT_CREDENTIAL_TYPE.to_string(),
            ),
        };

        Self {
            access_key_id: credentials.access_key_id().to_string(),
            code,
            expiration: format_timestamp(expires_at),
            last_updated: format_timestamp(issued_at),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().unwrap_or_default().to_string(),
            credential_type,
        }
    }

    /// Base credentials for the issuer, without an expiry.
    pub fn to_credentials(&self) -> Credentials {
        Credentials::new(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            Some(self.session_token.clone()),
            None,
            SEED_CREDENTIALS_PROVIDER,
        )
    }
}

/// RFC 3339 in UTC with second precision, e.g. `2024-01-01T00:00:00Z`.
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceIdentityDocument {
    pub account_id: String,
    pub architecture: String,
    pub availability_zone: String,
    pub billing_products: Option<Vec<String>>,
    pub devpay_product_codes: Vec<String>,
    pub image_id: String,
    pub instance_id: String,
    pub instance_type: String,
    pub kernel_id: Option<String>,
    pub marketplace_product_codes: Vec<String>,
    pub pending_time: Option<String>,
    pub private_ip: String,
    pub ramdisk_id: Option<String>,
    pub region: String,
    pub version: String,
}
