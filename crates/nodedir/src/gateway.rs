// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serves the directory to recognized clients and counts pulls per country.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{ErrorCode, StoreError};
use crate::policy::AccessPolicy;
use crate::store::DirectoryStore;

/// Country recorded when the request carries none.
pub const UNKNOWN_COUNTRY: &str = "N/A";

/// Longest country value counted as given; longer values count as unknown.
pub const MAX_COUNTRY_LEN: usize = 16;

/// A successful pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Base64 of the directory's UTF-8 bytes.
    pub body: String,
    /// Polling hint for the client, in minutes.
    pub update_interval_min: u32,
    /// The caller's counter after this pull.
    pub pulls: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    Denied,
    Store(StoreError),
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Denied => ErrorCode::Denied,
            Self::Store(e) => e.code(),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denied => f.write_str("denied"),
            Self::Store(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

pub struct DistributionGateway {
    access: Arc<AccessPolicy>,
    store: DirectoryStore,
}

impl DistributionGateway {
    pub fn new(access: Arc<AccessPolicy>, store: DirectoryStore) -> Self {
        Self { access, store }
    }

    /// Authorize, count the pull against `country`, and return the encoded directory.
    ///
    /// Every successful call bumps exactly one counter by one. Pulls are not
    /// deduplicated, and concurrent pulls from one country may lose increments.
    pub async fn serve(
        &self,
        token: Option<&str>,
        client_identity: &str,
        country: Option<&str>,
    ) -> Result<Distribution, GatewayError> {
        if !self.access.authorize_distribution(token, client_identity).is_allowed() {
            return Err(GatewayError::Denied);
        }
        let country = country_bucket(country);

        let mut doc = self.store.read().await?;
        let pulls = self.store.record_pull(&mut doc, country).await?;

        Ok(Distribution {
            body: encode_nodes(&doc.nodes),
            update_interval_min: self.access.policy().update_interval_min,
            pulls,
        })
    }
}

/// Counter bucket for a presented country value.
///
/// Blank and over-long values share the unknown bucket, which bounds
/// the size of counter keys.
pub fn country_bucket(country: Option<&str>) -> &str {
    match country.map(str::trim) {
        Some(c) if !c.is_empty() && c.chars().count() <= MAX_COUNTRY_LEN => c,
        _ => UNKNOWN_COUNTRY,
    }
}

/// Transport encoding of the directory text.
pub fn encode_nodes(nodes: &str) -> String {
    STANDARD.encode(nodes.as_bytes())
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
