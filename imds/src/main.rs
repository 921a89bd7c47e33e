// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use nocloud_imds::application::{AppState, Application};
use nocloud_imds::bootstrap::{bootstrap, resolve_endpoint_overrides};
use nocloud_imds::configuration::ImdsOptions;
use nocloud_imds::credentials::LiveCredentialStore;
use nocloud_imds::errors::AppError;
use nocloud_imds::inspector::{HostInspector, SystemInspector, select_default_interface};
use nocloud_imds::issuer::{CredentialIssuer, StsIssuer};
use nocloud_imds::metadata::MetadataDocument;
use nocloud_imds::refresher;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        // this needs to be set to remove duplicated information in the log.
        .with_current_span(false)
        // this needs to be set to false, otherwise ANSI color codes will
        // show up in a confusing manner in the serial console.
        .with_ansi(false)
        // the journal adds its own timestamp.
        .without_time()
        // remove the name of the function from every log entry
        .with_target(false)
        .init();

    // get configuration options from flags and environment variables
    let options = ImdsOptions::parse();

    tracing::info!("[imds] {:?}", &options);

    let document = Arc::new(MetadataDocument::load(&options.metadata_path)?);

    let iam = bootstrap(&document).context("could not fetch IAM credentials from metadata")?;
    let credentials = Arc::new(LiveCredentialStore::new());
    if let Some(initial) = iam.credentials.clone() {
        credentials.publish(initial);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let seed = document.clone();
    let refresh = refresher::start(
        &iam,
        credentials.clone(),
        options.refresh_floor(),
        shutdown_rx,
        |role_arn, base| async move {
            let region = seed.standard()?.scalar("region", None)?;
            let overrides = resolve_endpoint_overrides(&seed)?;
            let issuer = StsIssuer::new(region, role_arn, base, &overrides).await;
            Ok::<_, AppError>(Arc::new(issuer) as Arc<dyn CredentialIssuer>)
        },
    )
    .await
    .context("could not start credential refresh")?;

    let inspector = Arc::new(SystemInspector);
    let interface = match options.net_iface.clone() {
        Some(interface) => Some(interface),
        None => match inspector.interfaces() {
            Ok(interfaces) => select_default_interface(&interfaces),
            Err(e) => {
                tracing::error!("[imds] unable to list network interfaces: {}", e);
                None
            }
        },
    };
    match &interface {
        Some(interface) => tracing::info!("[imds] using network interface {}", interface),
        None => tracing::warn!("[imds] no network interface available"),
    }

    let state = AppState {
        document,
        role: iam.role,
        credentials,
        inspector,
        interface,
    };

    let application = Application::build(&options, state).await?;
    application.run_until_stopped(shutdown_signal()).await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = refresh {
        let _ = handle.await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[imds] unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("[imds] shutting down");
}
