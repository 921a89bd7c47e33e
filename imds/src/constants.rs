// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

pub const DEFAULT_METADATA_PATH: &str = "/run/cloud-init/instance-data.json";
/// Top-level key of the provider-shaped namespace.
pub const STANDARD_NAMESPACE_KEY: &str = "v1";
/// `ds.meta_data` holds the fields specific to the seed data source.
pub const DATA_SOURCE_KEY: &str = "ds";
pub const DATA_SOURCE_METADATA_KEY: &str = "meta_data";

pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(300); // 5 minutes
pub const ASSUME_ROLE_SESSION_NAME: &str = "nocloud-imds";
pub const STS_SERVICE: &str = "sts";
pub const SEED_CREDENTIALS_PROVIDER: &str = "instance-data";

pub const PLACEHOLDER_TOKEN: &[u8] = b"dummytoken";
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";
pub const DEFAULT_CREDENTIAL_CODE: &str = "Success";
pub const DEFAULT_CREDENTIAL_TYPE: &str = "AWS-HMAC";

// Fixed values of the instance identity document
pub const IDENTITY_DOCUMENT_VERSION: &str = "2017-09-30";
pub const IDENTITY_ACCOUNT_ID: &str = "invalid";

pub const BLOCK_DEVICES_PATH: &str = "/dev/disk/by-label";
/// Labels that belong to the firmware and the seed image rather than the guest.
pub const IGNORED_BLOCK_DEVICE_LABELS: [&str; 2] = ["UEFI", "cidata"];
pub const SYS_CLASS_NET_PATH: &str = "/sys/class/net";
pub const IGNORED_INTERFACE_PREFIXES: [&str; 2] = ["lo", "docker"];
