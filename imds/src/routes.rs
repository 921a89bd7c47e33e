// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP route handlers for the instance metadata API.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET, PUT | `/latest/api/token` | [`token`] |
//! | GET | `/latest/meta-data/ami-id` | [`ami_id`] |
//! | GET | `/latest/meta-data/instance-id` | [`instance_id`] |
//! | GET | `/latest/meta-data/instance-type` | [`instance_type`] |
//! | GET | `/latest/meta-data/{local-,public-,}hostname` | [`local_hostname`] |
//! | GET | `/latest/meta-data/{local,public}-ipv4` | [`local_ipv4`] |
//! | GET | `/latest/meta-data/mac` | [`mac`] |
//! | GET | `/latest/meta-data/network/interfaces/macs` | [`macs`] |
//! | GET | `/latest/meta-data/block-device-mapping[/{name}]` | [`block_device_mapping_list`], [`block_device_mapping`] |
//! | GET | `/latest/meta-data/iam/info` | [`iam_info`] |
//! | GET | `/latest/meta-data/iam/security-credentials[/{role}]` | [`security_credentials_list`], [`security_credentials`] |
//! | GET | `/latest/meta-data/placement/availability-zone` | [`availability_zone`] |
//! | GET | `/latest/meta-data/services/domain` | [`services_domain`] |
//! | GET | `/latest/meta-data/services/endpoints` | [`services_endpoints`] |
//! | GET | `/latest/dynamic/instance-identity/document` | [`instance_identity_document`] |
//!
//! Bodies are plain text, byte-for-byte what the EC2 metadata service returns.
//! Resolver failures are `500` with the failure message, anything that does
//! not exist is `404`.

use std::sync::Arc;

use axum::extract::{Path, State};
use data_encoding::BASE64URL;

use crate::application::AppState;
use crate::constants::{
    DEFAULT_INSTANCE_TYPE, IDENTITY_ACCOUNT_ID, IDENTITY_DOCUMENT_VERSION, PLACEHOLDER_TOKEN,
};
use crate::errors::AppError;
use crate::metadata::Fields;
use crate::models::InstanceIdentityDocument;

/// Session token placeholder; any token is accepted on later requests.
pub async fn token() -> String {
    BASE64URL.encode(PLACEHOLDER_TOKEN)
}

pub async fn ami_id(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    Ok(state
        .document
        .standard()?
        .join(&["distro", "distro_release"], "-")?)
}

pub async fn instance_id(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    Ok(state.document.standard()?.scalar("instance_id", None)?)
}

pub async fn instance_type(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    Ok(state
        .document
        .data_source()?
        .scalar("instance_type", Some(DEFAULT_INSTANCE_TYPE))?)
}

pub async fn local_hostname(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    Ok(state.document.data_source()?.scalar("local_hostname", None)?)
}

pub async fn local_ipv4(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    let interface = state.interface()?;
    Ok(state.inspector.local_ipv4(interface)?.to_string())
}

pub async fn mac(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    let interface = state.interface()?;
    Ok(state.inspector.interface(interface)?.mac)
}

pub async fn macs(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    let macs: Vec<String> = state
        .inspector
        .interfaces()?
        .iter()
        .map(|iface| format!("{}/", iface.mac))
        .collect();

    Ok(macs.join("\n"))
}

pub async fn block_device_mapping_list(
    State(state): State<Arc<AppState>>,
) -> Result<String, AppError> {
    let devices = state.inspector.block_devices()?;
    let labels: Vec<&str> = devices.keys().map(String::as_str).collect();

    Ok(labels.join("\n"))
}

pub async fn block_device_mapping(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<String, AppError> {
    state
        .inspector
        .block_devices()?
        .remove(&name)
        .ok_or(AppError::DeviceNotFound)
}

/// Pretty-printed `iam.instance-profile` from the data-source namespace.
pub async fn iam_info(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    let ds = state.document.data_source()?;
    let iam = ds
        .optional_map("iam")?
        .filter(|iam| !iam.is_empty())
        .ok_or(AppError::NotFound)?;
    let profile = Fields::new(&iam)
        .optional_map("instance-profile")?
        .filter(|profile| !profile.is_empty())
        .ok_or(AppError::NotFound)?;

    Ok(serde_json::to_string_pretty(&profile)?)
}

pub async fn security_credentials_list(
    State(state): State<Arc<AppState>>,
) -> Result<String, AppError> {
    let role = state.role.as_ref().ok_or(AppError::NotFound)?;
    Ok(role.name.clone())
}

/// The live credential snapshot, when `role` names the configured role.
#[tracing::instrument(skip(state))]
pub async fn security_credentials(
    State(state): State<Arc<AppState>>,
    Path(role): Path<String>,
) -> Result<String, AppError> {
    let configured = state.role.as_ref().ok_or(AppError::NotFound)?;
    if configured.name != role {
        return Err(AppError::NotFound);
    }

    let snapshot = state.credentials.get().ok_or_else(|| {
        tracing::debug!("[imds] no credentials published yet");
        AppError::NotFound
    })?;

    Ok(serde_json::to_string_pretty(&*snapshot)?)
}

pub async fn availability_zone(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    Ok(state.document.standard()?.scalar("availability_zone", None)?)
}

pub async fn services_domain(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    let services = state
        .document
        .data_source()?
        .optional_map("services")?
        .ok_or(AppError::NotFound)?;

    Fields::new(&services)
        .optional_scalar("domain")?
        .filter(|domain| !domain.is_empty())
        .ok_or(AppError::NotFound)
}

pub async fn services_endpoints(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    let services = state
        .document
        .data_source()?
        .optional_map("services")?
        .ok_or(AppError::NotFound)?;
    let endpoints = Fields::new(&services)
        .optional_map("endpoints")?
        .ok_or(AppError::NotFound)?;

    Ok(serde_json::to_string(&endpoints)?)
}

/// Assembles the identity document from both namespaces and the local address.
#[tracing::instrument(skip(state))]
pub async fn instance_identity_document(
    State(state): State<Arc<AppState>>,
) -> Result<String, AppError> {
    let v1 = state.document.standard()?;
    let ds = state.document.data_source()?;
    let interface = state.interface()?;

    let document = InstanceIdentityDocument {
        account_id: IDENTITY_ACCOUNT_ID.to_string(),
        architecture: v1.scalar("machine", None)?,
        availability_zone: v1.scalar("availability_zone", None)?,
        billing_products: None,
        devpay_product_codes: Vec::new(),
        image_id: v1.join(&["distro", "distro_release"], " ")?,
        instance_id: v1.scalar("instance_id", None)?,
        instance_type: ds.scalar("instance_type", Some(DEFAULT_INSTANCE_TYPE))?,
        kernel_id: None,
        marketplace_product_codes: Vec::new(),
        pending_time: None,
        private_ip: state.inspector.local_ipv4(interface)?.to_string(),
        ramdisk_id: None,
        region: v1.scalar("region", None)?,
        version: IDENTITY_DOCUMENT_VERSION.to_string(),
    };

    Ok(serde_json::to_string(&document)?)
}
