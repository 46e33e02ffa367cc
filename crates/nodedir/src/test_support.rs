// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for unit tests.

use std::sync::Arc;

use crate::config::{Config, CounterLayout, Policy, DEFAULT_ALLOWED_CLIENTS};
use crate::error::StoreError;
use crate::policy::AccessPolicy;
use crate::store::memory::MemoryKv;
use crate::store::{BoxFuture, DirectoryStore, KvBackend};

pub const SUB_TOKEN: &str = "T1";
pub const ADMIN_TOKEN: &str = "admin-secret";

/// Backend whose every call fails as if the store were unreachable.
pub struct FailingKv;

impl KvBackend for FailingKv {
    fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        Box::pin(std::future::ready(Err(StoreError::Unavailable("connection refused".into()))))
    }

    fn put<'a>(&'a self, _key: &'a str, _value: String) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(std::future::ready(Err(StoreError::Unavailable("connection refused".into()))))
    }

    fn list<'a>(&'a self, _prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
        Box::pin(std::future::ready(Err(StoreError::Unavailable("connection refused".into()))))
    }
}

pub fn memory_store(layout: CounterLayout) -> (DirectoryStore, Arc<MemoryKv>) {
    let kv = Arc::new(MemoryKv::new());
    (DirectoryStore::new(Arc::clone(&kv) as Arc<dyn KvBackend>, layout), kv)
}

pub fn access_policy(policy: Policy) -> anyhow::Result<Arc<AccessPolicy>> {
    let clients: Vec<String> = DEFAULT_ALLOWED_CLIENTS.iter().map(|s| (*s).to_owned()).collect();
    Ok(Arc::new(AccessPolicy::new(Some(SUB_TOKEN.into()), &clients, policy)?))
}

pub fn test_config() -> Config {
    Config {
        sub_token: Some(SUB_TOKEN.into()),
        admin_token: Some(ADMIN_TOKEN.into()),
        ..Config::test()
    }
}

pub trait AnyhowExt<T> {
    fn anyhow(self) -> anyhow::Result<T>;
}

impl<T, E: std::fmt::Display> AnyhowExt<T> for Result<T, E> {
    fn anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{e}"))
    }
}
