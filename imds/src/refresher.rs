// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Background re-issuance of the role's temporary credentials.
//!
//! The refresher alternates between issuing a credential and sleeping. After a
//! successful issuance it sleeps for half of the remaining validity, but never
//! less than the floor interval; after a failure it sleeps for the floor and
//! tries again, leaving the previously published snapshot in place. The loop
//! only stops when the shutdown channel fires.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use aws_credential_types::Credentials;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bootstrap::Bootstrap;
use crate::credentials::LiveCredentialStore;
use crate::errors::AppError;
use crate::issuer::CredentialIssuer;
use crate::models::CredentialSnapshot;

/// `max(floor, (expires_at - now) / 2)`; the floor when already expired.
pub fn next_refresh_interval(
    expires_at: SystemTime,
    now: SystemTime,
    floor: Duration,
) -> Duration {
    match expires_at.duration_since(now) {
        Ok(remaining) => (remaining / 2).max(floor),
        Err(_) => floor,
    }
}

pub struct CredentialRefresher {
    issuer: Arc<dyn CredentialIssuer>,
    store: Arc<LiveCredentialStore>,
    floor: Duration,
}

impl CredentialRefresher {
    pub fn new(
        issuer: Arc<dyn CredentialIssuer>,
        store: Arc<LiveCredentialStore>,
        floor: Duration,
    ) -> Self {
        Self {
            issuer,
            store,
            floor,
        }
    }

    /// Runs one issuance cycle and returns how long to sleep before the next.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> Duration {
        let credentials = match self.issuer.issue().await {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::error!("[imds] {}, retrying in {:?}", e, self.floor);
                return self.floor;
            }
        };

        let Some(expires_at) = credentials.expiry() else {
            tracing::error!(
                "[imds] could not obtain credentials expiry, retrying in {:?}",
                self.floor
            );
            return self.floor;
        };

        let now = SystemTime::now();
        let previous = self.store.get();
        let snapshot =
            CredentialSnapshot::issued(&credentials, expires_at, now, previous.as_deref());
        self.store.publish(snapshot);

        let next = next_refresh_interval(expires_at, now, self.floor);
        if expires_at <= now {
            tracing::warn!("[imds] credentials refreshed successfully, but are still expired");
        } else {
            tracing::info!(
                "[imds] credentials refreshed successfully, next refresh in {:?}",
                next
            );
        }

        next
    }

    /// Refreshes until `shutdown` changes or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let next = self.refresh().await;
            tokio::select! {
                _ = tokio::time::sleep(next) => {}
                _ = shutdown.changed() => {
                    tracing::info!("[imds] stopping credential refresher");
                    return;
                }
            }
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

/// Starts the refresher when the seed names a role and carries credentials
/// for it, otherwise returns `None` without building an issuer.
///
/// `build_issuer` receives the role ARN and the seed credentials.
///
/// # Errors
///
/// Propagates the failure of `build_issuer`.
pub async fn start<F, Fut>(
    iam: &Bootstrap,
    store: Arc<LiveCredentialStore>,
    floor: Duration,
    shutdown: watch::Receiver<bool>,
    build_issuer: F,
) -> Result<Option<JoinHandle<()>>, AppError>
where
    F: FnOnce(String, Credentials) -> Fut,
    Fut: Future<Output = Result<Arc<dyn CredentialIssuer>, AppError>>,
{
    let (role, seed) = match (&iam.role, &iam.credentials) {
        (Some(role), Some(seed)) => (role, seed),
        (Some(role), None) => {
            tracing::warn!(
                "[imds] no seed credentials for {}, skipping credential refresh",
                role.arn
            );
            return Ok(None);
        }
        (None, _) => return Ok(None),
    };

    let issuer = build_issuer(role.arn.clone(), seed.to_credentials()).await?;

    tracing::info!("[imds] refreshing credentials for {}", role.arn);
    let handle = CredentialRefresher::new(issuer, store, floor).spawn(shutdown);

    Ok(Some(handle))
}
