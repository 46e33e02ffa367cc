// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory persistence over a plain key-value namespace.
//!
//! The backing store offers independent get/put per key and nothing else:
//! no transactions, no compare-and-swap, no atomic increment. Every
//! read-modify-write here can lose a concurrent update (last writer wins).
//! Keyed counters shrink that window to a single country's record.

pub mod cloudflare;
pub mod document;
pub mod file;
pub mod memory;

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::{Config, CounterLayout, StoreKind};
use crate::error::StoreError;

pub use document::{DirectoryDocument, FailureRecord};

/// Key holding the directory document.
pub const DOCUMENT_KEY: &str = "data";

/// Prefix of per-country counter records in the keyed layout.
pub const COUNTER_PREFIX: &str = "count:";

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Raw key-value namespace.
pub trait KvBackend: Send + Sync + 'static {
    /// Fetch a value. `Ok(None)` when the key is absent.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>>;

    /// Replace the value stored under `key`.
    fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>>;

    /// List keys starting with `prefix`.
    fn list<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StoreError>>;
}

/// Open the backend selected by the configuration.
pub fn open_backend(config: &Config) -> anyhow::Result<Arc<dyn KvBackend>> {
    let backend: Arc<dyn KvBackend> = match config.store_kind()? {
        StoreKind::Memory => Arc::new(memory::MemoryKv::new()),
        StoreKind::File => Arc::new(file::FileKv::open(config.state_dir())?),
        StoreKind::Cloudflare => {
            let (Some(account), Some(namespace), Some(token)) =
                (&config.cf_account_id, &config.cf_namespace_id, &config.cf_api_token)
            else {
                anyhow::bail!("cloudflare store requires account id, namespace id and api token");
            };
            Arc::new(cloudflare::CloudflareKv::new(
                &config.cf_api_base,
                account,
                namespace,
                token.clone(),
            )?)
        }
    };
    Ok(backend)
}

/// The directory document plus its pull counters.
#[derive(Clone)]
pub struct DirectoryStore {
    backend: Arc<dyn KvBackend>,
    layout: CounterLayout,
}

impl DirectoryStore {
    pub fn new(backend: Arc<dyn KvBackend>, layout: CounterLayout) -> Self {
        Self { backend, layout }
    }

    pub fn layout(&self) -> CounterLayout {
        self.layout
    }

    /// Read the document, defaulting when it is absent or unparsable.
    ///
    /// Only an unreachable store is an error; corrupt data heals on the
    /// next [`write`](Self::write).
    pub async fn read(&self) -> Result<DirectoryDocument, StoreError> {
        let Some(raw) = self.backend.get(DOCUMENT_KEY).await? else {
            return Ok(DirectoryDocument::default());
        };
        match DirectoryDocument::parse(&raw) {
            Some(doc) => Ok(doc),
            None => {
                tracing::warn!(key = DOCUMENT_KEY, len = raw.len(), "corrupt directory document, using default");
                Ok(DirectoryDocument::default())
            }
        }
    }

    /// Replace the whole document.
    pub async fn write(&self, doc: &DirectoryDocument) -> Result<(), StoreError> {
        let json = doc.to_json()?;
        self.backend.put(DOCUMENT_KEY, json).await
    }

    /// Bump the pull counter for `country` by one and return the new value.
    pub async fn increment_counter(&self, country: &str) -> Result<u64, StoreError> {
        let mut doc = match self.layout {
            CounterLayout::Embedded => self.read().await?,
            CounterLayout::Keyed => DirectoryDocument::default(),
        };
        self.record_pull(&mut doc, country).await
    }

    /// Like [`increment_counter`](Self::increment_counter), reusing an
    /// already-read document. In the embedded layout `doc` is updated and
    /// written back; in the keyed layout only the country's record is touched.
    pub async fn record_pull(
        &self,
        doc: &mut DirectoryDocument,
        country: &str,
    ) -> Result<u64, StoreError> {
        let count = match self.layout {
            CounterLayout::Embedded => {
                let entry = doc.country_counters.entry(country.to_owned()).or_insert(0);
                *entry = entry.saturating_add(1);
                let count = *entry;
                self.write(doc).await?;
                count
            }
            CounterLayout::Keyed => {
                let key = counter_key(country);
                let count = self.read_counter(&key).await?.saturating_add(1);
                self.backend.put(&key, count.to_string()).await?;
                count
            }
        };
        tracing::debug!(country, count, layout = %self.layout, "pull counter incremented");
        Ok(count)
    }

    /// Per-country pull counts, merging keyed records with any embedded ones.
    pub async fn counters(&self, doc: &DirectoryDocument) -> Result<BTreeMap<String, u64>, StoreError> {
        let mut counters = doc.country_counters.clone();
        if self.layout == CounterLayout::Embedded {
            return Ok(counters);
        }
        for key in self.backend.list(COUNTER_PREFIX).await? {
            let Some(country) = key.strip_prefix(COUNTER_PREFIX) else {
                continue;
            };
            let count = self.read_counter(&key).await?;
            let entry = counters.entry(country.to_owned()).or_insert(0);
            *entry = entry.saturating_add(count);
        }
        Ok(counters)
    }

    async fn read_counter(&self, key: &str) -> Result<u64, StoreError> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(0);
        };
        match raw.trim().parse::<u64>() {
            Ok(n) => Ok(n),
            Err(_) => {
                tracing::warn!(key, "corrupt counter record, counting from zero");
                Ok(0)
            }
        }
    }
}

/// Storage key for a country's counter. Country codes are not canonicalized.
pub fn counter_key(country: &str) -> String {
    format!("{COUNTER_PREFIX}{country}")
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
