// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloudflare Workers KV over its REST API.
//!
//! Workers KV is eventually consistent: a write may take up to a minute to
//! be visible from other locations, which widens every lost-update window
//! described in [`crate::store`].

use std::sync::Once;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::error::StoreError;
use crate::store::{BoxFuture, KvBackend};

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// HTTP client for one KV namespace.
pub struct CloudflareKv {
    namespace_url: Url,
    api_token: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    result: Vec<ListedKey>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ListedKey {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    cursor: Option<String>,
}

impl CloudflareKv {
    pub fn new(
        api_base: &str,
        account_id: &str,
        namespace_id: &str,
        api_token: String,
    ) -> Result<Self, StoreError> {
        ensure_crypto();
        let mut namespace_url = Url::parse(api_base.trim_end_matches('/'))
            .map_err(|e| StoreError::Unavailable(format!("invalid api base: {e}")))?;
        namespace_url
            .path_segments_mut()
            .map_err(|()| StoreError::Unavailable("api base cannot hold a path".into()))?
            .pop_if_empty()
            .extend(["accounts", account_id, "storage", "kv", "namespaces", namespace_id]);
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { namespace_url, api_token, client })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.namespace_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Unavailable("api base cannot hold a path".into()))?
            .extend(segments);
        Ok(url)
    }

    async fn list_page(&self, prefix: &str, cursor: Option<&str>) -> Result<ListResponse, StoreError> {
        let mut url = self.url(&["keys"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("prefix", prefix);
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }
        let resp = self.client.get(url).bearer_auth(&self.api_token).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }
}

impl KvBackend for CloudflareKv {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        Box::pin(async move {
            let url = self.url(&["values", key])?;
            let resp = self.client.get(url).bearer_auth(&self.api_token).send().await?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            Ok(Some(resp.error_for_status()?.text().await?))
        })
    }

    fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let url = self.url(&["values", key])?;
            self.client
                .put(url)
                .bearer_auth(&self.api_token)
                .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(value)
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
        Box::pin(async move {
            let mut keys = Vec::new();
            let mut cursor: Option<String> = None;
            loop {
                let page = self.list_page(prefix, cursor.as_deref()).await?;
                keys.extend(page.result.into_iter().map(|k| k.name));
                cursor = page.result_info.and_then(|i| i.cursor).filter(|c| !c.is_empty());
                if cursor.is_none() {
                    break;
                }
            }
            Ok(keys)
        })
    }
}

#[cfg(test)]
#[path = "cloudflare_tests.rs"]
mod tests;
