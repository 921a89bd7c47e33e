// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Seed document access and field resolution.
//!
//! The seed document is the cloud-init `instance-data.json` file. It is read
//! once at startup into a [`MetadataDocument`] and never reloaded. Two
//! sub-mappings of it are exposed as [`Namespace`]s:
//!
//! - [`Namespace::Standard`]: `v1`, provider-shaped fields (`instance_id`,
//!   `region`, `machine`, `availability_zone`, `distro`, ...)
//! - [`Namespace::DataSource`]: `ds.meta_data`, fields specific to the seed
//!   (`local-hostname`, `instance-type`, `iam`, `services`, ...)
//!
//! Both namespaces mix `-` and `_` separated keys, so every lookup through
//! [`Fields`] tries the literal name, then the name with `-` replaced by `_`,
//! then the name with `_` replaced by `-`.

use std::fmt;
use std::path::Path;

use serde_json::{Map, Value};

use crate::constants::{DATA_SOURCE_KEY, DATA_SOURCE_METADATA_KEY, STANDARD_NAMESPACE_KEY};
use crate::errors::AppError;

pub type FieldMap = Map<String, Value>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("{namespace} metadata is missing or malformed")]
    MissingNamespace { namespace: Namespace },
    #[error("{name} is missing in metadata")]
    Missing { name: String },
    #[error("{name} value is not a {expected}")]
    WrongType { name: String, expected: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Standard,
    DataSource,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Standard => write!(f, "{STANDARD_NAMESPACE_KEY}"),
            Namespace::DataSource => write!(f, "{DATA_SOURCE_KEY}.{DATA_SOURCE_METADATA_KEY}"),
        }
    }
}

/// The parsed seed document. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDocument {
    root: Value,
}

impl MetadataDocument {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Reads and parses the seed document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Load`] if the file cannot be read or is not JSON.
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let load_error = |reason: String| AppError::Load {
            path: path.display().to_string(),
            reason,
        };

        let data = std::fs::read(path).map_err(|e| load_error(e.to_string()))?;
        let root: Value = serde_json::from_slice(&data).map_err(|e| load_error(e.to_string()))?;

        tracing::debug!("[imds] loaded {} bytes of metadata", data.len());

        Ok(Self::from_value(root))
    }

    pub fn namespace(&self, namespace: Namespace) -> Result<Fields<'_>, FieldError> {
        let map = match namespace {
            Namespace::Standard => self.root.get(STANDARD_NAMESPACE_KEY),
            Namespace::DataSource => self
                .root
                .get(DATA_SOURCE_KEY)
                .and_then(|ds| ds.get(DATA_SOURCE_METADATA_KEY)),
        }
        .and_then(Value::as_object);

        match map {
            Some(map) => Ok(Fields::new(map)),
            None => {
                tracing::error!("[imds] {} metadata is missing or malformed", namespace);
                Err(FieldError::MissingNamespace { namespace })
            }
        }
    }

    pub fn standard(&self) -> Result<Fields<'_>, FieldError> {
        self.namespace(Namespace::Standard)
    }

    pub fn data_source(&self) -> Result<Fields<'_>, FieldError> {
        self.namespace(Namespace::DataSource)
    }
}

/// Read-only view over one mapping of the seed document.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a FieldMap,
}

impl<'a> Fields<'a> {
    pub fn new(map: &'a FieldMap) -> Self {
        Self { map }
    }

    /// Finds `name` under its literal, underscored or hyphenated spelling.
    /// An explicit `null` counts as absent.
    fn lookup(&self, name: &str) -> Option<&'a Value> {
        [
            name.to_string(),
            name.replace('-', "_"),
            name.replace('_', "-"),
        ]
        .iter()
        .filter_map(|candidate| self.map.get(candidate))
        .find(|value| !value.is_null())
    }

    /// Resolves a string field. An empty or absent `default` makes the field required.
    pub fn scalar(&self, name: &str, default: Option<&str>) -> Result<String, FieldError> {
        match self.lookup(name) {
            Some(Value::String(value)) => Ok(value.clone()),
            Some(_) => {
                tracing::error!("[imds] '{}' metadata value is not a string", name);
                Err(FieldError::WrongType {
                    name: name.to_string(),
                    expected: "string",
                })
            }
            None => match default.filter(|d| !d.is_empty()) {
                Some(default) => Ok(default.to_string()),
                None => Err(missing(name)),
            },
        }
    }

    /// Resolves a nested mapping. `None` as `default` makes the field required.
    pub fn map(&self, name: &str, default: Option<FieldMap>) -> Result<FieldMap, FieldError> {
        match self.lookup(name) {
            Some(Value::Object(value)) => Ok(value.clone()),
            Some(_) => {
                tracing::error!("[imds] '{}' metadata value is not a map", name);
                Err(FieldError::WrongType {
                    name: name.to_string(),
                    expected: "map",
                })
            }
            None => default.ok_or_else(|| missing(name)),
        }
    }

    pub fn optional_scalar(&self, name: &str) -> Result<Option<String>, FieldError> {
        match self.lookup(name) {
            None => Ok(None),
            Some(_) => self.scalar(name, None).map(Some),
        }
    }

    pub fn optional_map(&self, name: &str) -> Result<Option<FieldMap>, FieldError> {
        match self.lookup(name) {
            None => Ok(None),
            Some(_) => self.map(name, None).map(Some),
        }
    }

    /// Resolves every name as a required string and joins them with `separator`.
    pub fn join(&self, names: &[&str], separator: &str) -> Result<String, FieldError> {
        let values = names
            .iter()
            .map(|name| self.scalar(name, None))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(values.join(separator))
    }
}

fn missing(name: &str) -> FieldError {
    tracing::error!("[imds] '{}' metadata value is missing", name);
    FieldError::Missing {
        name: name.to_string(),
    }
}
