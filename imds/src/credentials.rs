// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::models::CredentialSnapshot;

/// Holds the credential snapshot served by the IAM endpoints.
///
/// Snapshots are immutable and swapped in whole, so readers never wait on the
/// refresher and never see fields from two different snapshots.
#[derive(Debug, Default)]
pub struct LiveCredentialStore {
    current: ArcSwapOption<CredentialSnapshot>,
}

impl LiveCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live snapshot, or `None` before the first publication.
    pub fn get(&self) -> Option<Arc<CredentialSnapshot>> {
        self.current.load_full()
    }

    pub fn publish(&self, snapshot: CredentialSnapshot) {
        self.current.store(Some(Arc::new(snapshot)));
    }
}
