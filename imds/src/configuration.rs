// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::constants::{DEFAULT_METADATA_PATH, MIN_REFRESH_INTERVAL};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct ImdsOptions {
    /// Address to bind to.
    #[arg(long, default_value = "169.254.169.254", env("IMDS_BIND_TO"))]
    pub bind_to: String,
    /// Port to bind to.
    #[arg(long, default_value = "80", env("IMDS_PORT"))]
    pub port: u16,
    /// Network interface used for traffic.
    #[arg(long, env("IMDS_NET_IFACE"))]
    pub net_iface: Option<String>,
    #[arg(long, default_value = DEFAULT_METADATA_PATH, env("IMDS_METADATA_PATH"))]
    pub metadata_path: PathBuf,
    /// Minimum seconds between credential refreshes.
    #[arg(
        long,
        default_value_t = MIN_REFRESH_INTERVAL.as_secs(),
        env("IMDS_MIN_REFRESH_INTERVAL")
    )]
    pub min_refresh_interval: u64,
}

impl ImdsOptions {
    pub fn refresh_floor(&self) -> Duration {
        Duration::from_secs(self.min_refresh_interval)
    }
}

impl Default for ImdsOptions {
    fn default() -> Self {
        ImdsOptions {
            bind_to: "127.0.0.1".to_string(),
            port: 0,
            net_iface: None,
            metadata_path: PathBuf::from(DEFAULT_METADATA_PATH),
            min_refresh_interval: MIN_REFRESH_INTERVAL.as_secs(),
        }
    }
}
