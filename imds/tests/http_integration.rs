// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP integration tests for the instance metadata API.
//!
//! These tests use `axum-test` to exercise the full request/response cycle
//! through the Axum router, with a fixed host instead of the real network
//! interfaces and block devices.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use nocloud_imds::application::{AppState, create_router, run};
use nocloud_imds::bootstrap::bootstrap;
use nocloud_imds::credentials::LiveCredentialStore;
use nocloud_imds::errors::AppError;
use nocloud_imds::inspector::{HostInspector, NetworkInterface};
use nocloud_imds::metadata::MetadataDocument;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct FixedHost;

impl HostInspector for FixedHost {
    fn interfaces(&self) -> Result<Vec<NetworkInterface>, AppError> {
        Ok(vec![
            NetworkInterface {
                name: "lo".to_string(),
                mac: "00:00:00:00:00:00".to_string(),
                ipv4: vec![Ipv4Addr::LOCALHOST],
            },
            NetworkInterface {
                name: "eth0".to_string(),
                mac: "52:54:00:12:34:56".to_string(),
                ipv4: vec![Ipv4Addr::new(10, 0, 2, 15)],
            },
        ])
    }

    fn block_devices(&self) -> Result<BTreeMap<String, String>, AppError> {
        Ok(BTreeMap::from([
            ("data".to_string(), "/dev/vdb1".to_string()),
            ("root".to_string(), "/dev/vda1".to_string()),
        ]))
    }
}

fn seed_credentials() -> Value {
    json!({
        "AccessKeyId": "AKIDSEED",
        "SecretAccessKey": "seed-secret",
        "Token": "seed-token",
        "Code": "Success",
        "Expiration": "2024-01-01T06:00:00Z",
        "LastUpdated": "2024-01-01T00:00:00Z",
        "Type": "AWS-HMAC"
    })
}

/// A seed with every section populated.
fn full_seed() -> Value {
    json!({
        "v1": {
            "instance_id": "i-abc123",
            "availability_zone": "us-east-1a",
            "region": "us-east-1",
            "machine": "x86_64",
            "distro": "ubuntu",
            "distro_release": "22.04"
        },
        "ds": {
            "meta_data": {
                "local-hostname": "guest.internal",
                "iam": {
                    "role-arn": "arn:aws:iam::123456789012:role/guest",
                    "instance-profile": {
                        "Code": "Success",
                        "InstanceProfileArn": "arn:aws:iam::123456789012:instance-profile/guest"
                    },
                    "credentials": seed_credentials()
                },
                "services": {
                    "domain": "amazonaws.com",
                    "endpoints": {"sts": "https://sts.internal"}
                }
            }
        }
    })
}

/// Builds the state the way `main` does: bootstrap, publish the seed
/// credentials, hand the store to the router.
fn create_test_state(seed: Value) -> AppState {
    let document = MetadataDocument::from_value(seed);
    let iam = bootstrap(&document).unwrap();

    let credentials = Arc::new(LiveCredentialStore::new());
    if let Some(initial) = iam.credentials.clone() {
        credentials.publish(initial);
    }

    AppState {
        document: Arc::new(document),
        role: iam.role,
        credentials,
        inspector: Arc::new(FixedHost),
        interface: Some("eth0".to_string()),
    }
}

fn create_test_server(seed: Value) -> TestServer {
    TestServer::new(create_router(create_test_state(seed))).unwrap()
}

// =============================================================================
// Token and identity fields
// =============================================================================

#[tokio::test]
async fn test_token_accepts_get_and_put() {
    let server = create_test_server(full_seed());
    server.put("/latest/api/token").await.assert_text("ZHVtbXl0b2tlbg==");
    server.get("/latest/api/token").await.assert_text("ZHVtbXl0b2tlbg==");
}

#[tokio::test]
async fn test_instance_id() {
    let server = create_test_server(full_seed());
    let response = server.get("/latest/meta-data/instance-id").await;
    response.assert_status_ok();
    response.assert_text("i-abc123");
}

#[tokio::test]
async fn test_ami_id() {
    let server = create_test_server(full_seed());
    server
        .get("/latest/meta-data/ami-id")
        .await
        .assert_text("ubuntu-22.04");
}

#[tokio::test]
async fn test_instance_type_defaults() {
    let server = create_test_server(full_seed());
    server
        .get("/latest/meta-data/instance-type")
        .await
        .assert_text("t2.micro");

    let mut seed = full_seed();
    seed["ds"]["meta_data"]["instance-type"] = json!("m5.large");
    let server = create_test_server(seed);
    server
        .get("/latest/meta-data/instance-type")
        .await
        .assert_text("m5.large");
}

#[tokio::test]
async fn test_hostnames() {
    let server = create_test_server(full_seed());
    for path in ["local-hostname", "public-hostname", "hostname"] {
        server
            .get(&format!("/latest/meta-data/{path}"))
            .await
            .assert_text("guest.internal");
    }
}

#[tokio::test]
async fn test_availability_zone() {
    let server = create_test_server(full_seed());
    server
        .get("/latest/meta-data/placement/availability-zone")
        .await
        .assert_text("us-east-1a");
}

#[tokio::test]
async fn test_missing_field_returns_500_with_message() {
    let mut seed = full_seed();
    seed["v1"].as_object_mut().unwrap().remove("instance_id");
    let server = create_test_server(seed);

    let response = server.get("/latest/meta-data/instance-id").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_text("instance_id is missing in metadata\n");
}

#[tokio::test]
async fn test_wrong_type_returns_500() {
    let mut seed = full_seed();
    seed["v1"]["availability_zone"] = json!(["us-east-1a"]);
    let server = create_test_server(seed);

    let response = server
        .get("/latest/meta-data/placement/availability-zone")
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_text("availability_zone value is not a string\n");
}

// =============================================================================
// Network and block devices
// =============================================================================

#[tokio::test]
async fn test_local_and_public_ipv4() {
    let server = create_test_server(full_seed());
    for path in ["local-ipv4", "public-ipv4"] {
        server
            .get(&format!("/latest/meta-data/{path}"))
            .await
            .assert_text("10.0.2.15");
    }
}

#[tokio::test]
async fn test_macs() {
    let server = create_test_server(full_seed());
    server
        .get("/latest/meta-data/mac")
        .await
        .assert_text("52:54:00:12:34:56");
    server
        .get("/latest/meta-data/network/interfaces/macs")
        .await
        .assert_text("00:00:00:00:00:00/\n52:54:00:12:34:56/");
}

#[tokio::test]
async fn test_block_device_mapping() {
    let server = create_test_server(full_seed());
    server
        .get("/latest/meta-data/block-device-mapping")
        .await
        .assert_text("data\nroot");
    server
        .get("/latest/meta-data/block-device-mapping/root")
        .await
        .assert_text("/dev/vda1");

    let response = server
        .get("/latest/meta-data/block-device-mapping/swap")
        .await;
    response.assert_status_not_found();
    response.assert_text("No such device\n");
}

// =============================================================================
// IAM
// =============================================================================

#[tokio::test]
async fn test_iam_info() {
    let server = create_test_server(full_seed());
    let response = server.get("/latest/meta-data/iam/info").await;
    response.assert_status_ok();
    response.assert_text(
        "{\n  \"Code\": \"Success\",\n  \"InstanceProfileArn\": \"arn:aws:iam::123456789012:instance-profile/guest\"\n}",
    );
}

#[tokio::test]
async fn test_iam_absent_returns_404() {
    let mut seed = full_seed();
    seed["ds"]["meta_data"].as_object_mut().unwrap().remove("iam");
    let server = create_test_server(seed);

    for path in [
        "/latest/meta-data/iam/info",
        "/latest/meta-data/iam/security-credentials",
        "/latest/meta-data/iam/security-credentials/guest",
    ] {
        server.get(path).await.assert_status_not_found();
    }
}

#[tokio::test]
async fn test_security_credentials_list() {
    let server = create_test_server(full_seed());
    server
        .get("/latest/meta-data/iam/security-credentials")
        .await
        .assert_text("guest");
    server
        .get("/latest/meta-data/iam/security-credentials/")
        .await
        .assert_text("guest");
}

#[tokio::test]
async fn test_security_credentials_for_configured_role() {
    let server = create_test_server(full_seed());
    let response = server
        .get("/latest/meta-data/iam/security-credentials/guest")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["AccessKeyId"], "AKIDSEED");
    assert_eq!(body["SecretAccessKey"], "seed-secret");
    assert_eq!(body["Token"], "seed-token");
    assert_eq!(body["Expiration"], "2024-01-01T06:00:00Z");
    assert_eq!(body["Type"], "AWS-HMAC");
}

#[tokio::test]
async fn test_security_credentials_for_other_role_returns_404() {
    let server = create_test_server(full_seed());
    let response = server
        .get("/latest/meta-data/iam/security-credentials/admin")
        .await;
    response.assert_status_not_found();
    response.assert_text("not found\n");
}

#[tokio::test]
async fn test_security_credentials_before_publication_returns_404() {
    let mut seed = full_seed();
    seed["ds"]["meta_data"]["iam"]["credentials"] = json!({});
    let server = create_test_server(seed);

    server
        .get("/latest/meta-data/iam/security-credentials")
        .await
        .assert_text("guest");
    server
        .get("/latest/meta-data/iam/security-credentials/guest")
        .await
        .assert_status_not_found();
}

// =============================================================================
// Services
// =============================================================================

#[tokio::test]
async fn test_services() {
    let server = create_test_server(full_seed());
    server
        .get("/latest/meta-data/services/domain")
        .await
        .assert_text("amazonaws.com");
    server
        .get("/latest/meta-data/services/endpoints")
        .await
        .assert_text(r#"{"sts":"https://sts.internal"}"#);
}

#[tokio::test]
async fn test_services_absent_returns_404() {
    let mut seed = full_seed();
    seed["ds"]["meta_data"]
        .as_object_mut()
        .unwrap()
        .remove("services");
    let server = create_test_server(seed);

    server
        .get("/latest/meta-data/services/domain")
        .await
        .assert_status_not_found();
    server
        .get("/latest/meta-data/services/endpoints")
        .await
        .assert_status_not_found();
}

// =============================================================================
// Instance identity document
// =============================================================================

#[tokio::test]
async fn test_instance_identity_document() {
    let server = create_test_server(full_seed());
    let response = server
        .get("/latest/dynamic/instance-identity/document")
        .await;
    response.assert_status_ok();
    response.assert_text(concat!(
        r#"{"accountId":"invalid","architecture":"x86_64","availabilityZone":"us-east-1a","#,
        r#""billingProducts":null,"devpayProductCodes":[],"imageId":"ubuntu 22.04","#,
        r#""instanceId":"i-abc123","instanceType":"t2.micro","kernelId":null,"#,
        r#""marketplaceProductCodes":[],"pendingTime":null,"privateIp":"10.0.2.15","#,
        r#""ramdiskId":null,"region":"us-east-1","version":"2017-09-30"}"#
    ));
}

#[tokio::test]
async fn test_instance_identity_document_requires_region() {
    let mut seed = full_seed();
    seed["v1"].as_object_mut().unwrap().remove("region");
    let server = create_test_server(seed);

    let response = server
        .get("/latest/dynamic/instance-identity/document")
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_text("region is missing in metadata\n");
}

#[tokio::test]
async fn test_unknown_path_returns_404() {
    let server = create_test_server(full_seed());
    server
        .get("/latest/meta-data/kernel-id")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_served_over_tcp_with_connect_info() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = run(listener, create_test_state(full_seed())).unwrap();
    tokio::spawn(async move { server.await.unwrap() });

    let mut stream = TcpStream::connect(address).await.unwrap();
    stream
        .write_all(
            b"GET /latest/meta-data/instance-id HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("\r\n\r\ni-abc123"));
}
