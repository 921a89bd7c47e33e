// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # NoCloud IMDS
//!
//! An EC2-compatible instance metadata endpoint for virtual machines
//! provisioned from a cloud-init NoCloud seed instead of EC2 itself.
//!
//! Software inside the guest (cloud-init, AWS SDKs, provisioning agents)
//! expects the metadata service at `169.254.169.254`. This crate answers that
//! API from the seed's `instance-data.json` and keeps a set of temporary IAM
//! credentials fresh for the role named in the seed.
//!
//! ## Architecture
//!
//! ```text
//! instance-data.json -> MetadataDocument -> Fields --+--> bootstrap -----+
//!                                                    |                   |
//!                                                    |   StsIssuer <-----+
//!                                                    |       |
//!                                                    |   CredentialRefresher
//!                                                    |       |
//!                                                    |   LiveCredentialStore
//!                                                    |       |
//!                                                    +--> HTTP routes <-- guest
//! ```
//!
//! ## Modules
//!
//! - [`application`]: Router, shared state and server lifecycle
//! - [`bootstrap`]: IAM role, seed credentials and endpoint overrides
//! - [`configuration`]: CLI argument parsing with clap
//! - [`constants`]: Defaults and fixed wire values
//! - [`credentials`]: The live credential snapshot shared with the handlers
//! - [`errors`]: Application error types with HTTP response mapping
//! - [`inspector`]: Network interfaces and block devices of the host
//! - [`issuer`]: STS assume-role credential issuance
//! - [`metadata`]: Seed document loading and field resolution
//! - [`models`]: Credential snapshot and identity document types
//! - [`refresher`]: Background credential refresh loop
//! - [`routes`]: HTTP route handlers
//!
//! ## Usage
//!
//! ```bash
//! nocloud-imds --bind-to 169.254.169.254 --port 80 --net-iface eth0
//! ```
//!
//! ## Security Considerations
//!
//! - Credential snapshots are zeroized on drop and redacted in `Debug` output
//! - The session token endpoint returns a fixed placeholder; there is no
//!   token handshake

pub mod application;
pub mod bootstrap;
pub mod configuration;
pub mod constants;
pub mod credentials;
pub mod errors;
pub mod inspector;
pub mod issuer;
pub mod metadata;
pub mod models;
pub mod refresher;
pub mod routes;
