// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use aws_credential_types::provider::error::CredentialsError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::metadata::FieldError;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AppError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("not found")]
    NotFound,
    #[error("No such device")]
    DeviceNotFound,
    #[error("{0}")]
    Network(String),
    #[error("could not refresh credentials: {0}")]
    Issuer(String),
    #[error("unable to load metadata from {path}: {reason}")]
    Load { path: String, reason: String },
    #[error("internal server error")]
    InternalServerError,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::DeviceNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("[imds] {}", self);
        }

        // same shape as a plain-text error written by the emulated service
        (status, format!("{self}\n")).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(_source: serde_json::Error) -> Self {
        tracing::error!("{:?}", _source);
        AppError::InternalServerError
    }
}

impl From<std::io::Error> for AppError {
    fn from(source: std::io::Error) -> Self {
        AppError::Network(source.to_string())
    }
}

impl From<CredentialsError> for AppError {
    fn from(source: CredentialsError) -> Self {
        tracing::debug!("{:?}", source);
        AppError::Issuer(source.to_string())
    }
}
