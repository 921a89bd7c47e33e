// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::extract::{ConnectInfo, Request};
use axum::middleware::{self, AddExtension, Next};
use axum::response::Response;
use axum::routing::get;
use axum::serve::Serve;
use tokio::net::TcpListener;

use crate::configuration::ImdsOptions;
use crate::credentials::LiveCredentialStore;
use crate::errors::AppError;
use crate::inspector::HostInspector;
use crate::metadata::MetadataDocument;
use crate::models::RoleIdentity;
use crate::routes;

/// Everything the handlers read. Only `credentials` changes after startup.
#[derive(Clone)]
pub struct AppState {
    pub document: Arc<MetadataDocument>,
    pub role: Option<RoleIdentity>,
    pub credentials: Arc<LiveCredentialStore>,
    pub inspector: Arc<dyn HostInspector>,
    pub interface: Option<String>,
}

impl AppState {
    pub fn interface(&self) -> Result<&str, AppError> {
        self.interface
            .as_deref()
            .ok_or_else(|| AppError::Network("no network interface available".to_string()))
    }
}

pub type Server = Serve<
    TcpListener,
    IntoMakeServiceWithConnectInfo<Router, SocketAddr>,
    AddExtension<Router, ConnectInfo<SocketAddr>>,
>;

pub struct Application {
    server: Server,
}

impl Application {
    pub async fn build(options: &ImdsOptions, state: AppState) -> Result<Self, std::io::Error> {
        let address = format!("{}:{}", options.bind_to, options.port);
        let listener = TcpListener::bind(address).await?;
        let server = run(listener, state)?;
        let port = server.local_addr()?.port();

        tracing::info!("[imds] listening at http://{}:{}", options.bind_to, port);

        Ok(Self { server })
    }

    pub async fn run_until_stopped<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.server.with_graceful_shutdown(shutdown).await
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/latest/api/token", get(routes::token).put(routes::token))
        .route("/latest/meta-data/ami-id", get(routes::ami_id))
        .route("/latest/meta-data/instance-id", get(routes::instance_id))
        .route("/latest/meta-data/instance-type", get(routes::instance_type))
        .route("/latest/meta-data/local-hostname", get(routes::local_hostname))
        .route("/latest/meta-data/public-hostname", get(routes::local_hostname))
        .route("/latest/meta-data/hostname", get(routes::local_hostname))
        .route("/latest/meta-data/local-ipv4", get(routes::local_ipv4))
        .route("/latest/meta-data/public-ipv4", get(routes::local_ipv4))
        .route("/latest/meta-data/mac", get(routes::mac))
        .route("/latest/meta-data/network/interfaces/macs", get(routes::macs))
        .route(
            "/latest/meta-data/block-device-mapping",
            get(routes::block_device_mapping_list),
        )
        .route(
            "/latest/meta-data/block-device-mapping/{name}",
            get(routes::block_device_mapping),
        )
        .route("/latest/meta-data/iam/info", get(routes::iam_info))
        .route(
            "/latest/meta-data/iam/security-credentials",
            get(routes::security_credentials_list),
        )
        .route(
            "/latest/meta-data/iam/security-credentials/",
            get(routes::security_credentials_list),
        )
        .route(
            "/latest/meta-data/iam/security-credentials/{role}",
            get(routes::security_credentials),
        )
        .route(
            "/latest/meta-data/placement/availability-zone",
            get(routes::availability_zone),
        )
        .route("/latest/meta-data/services/domain", get(routes::services_domain))
        .route(
            "/latest/meta-data/services/endpoints",
            get(routes::services_endpoints),
        )
        .route(
            "/latest/dynamic/instance-identity/document",
            get(routes::instance_identity_document),
        )
        .layer(middleware::from_fn(log_request))
        .with_state(Arc::new(state))
}

#[tracing::instrument(skip(listener, state))]
pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let app = create_router(state);
    Ok(axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    ))
}

/// Peer address of the request, or `-` when the router is driven without a
/// socket.
fn remote_address(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.to_string())
        .unwrap_or_else(|| "-".to_string())
}

async fn log_request(request: Request, next: Next) -> Response {
    let remote = remote_address(&request);
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;

    tracing::debug!(
        "[imds] {} {} {} {}",
        remote,
        method,
        uri,
        response.status().as_u16()
    );

    response
}
