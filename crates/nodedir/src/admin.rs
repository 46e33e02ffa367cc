// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-gated reads and writes of the directory text.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ErrorCode, StoreError};
use crate::guard::SessionGuard;
use crate::store::DirectoryStore;

/// What the management view shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminView {
    pub nodes: String,
    pub counters: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    Unauthorized,
    TooLarge { len: usize, max: usize },
    Empty,
    Store(StoreError),
}

impl AdminError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::TooLarge { .. } => ErrorCode::TooLarge,
            Self::Empty => ErrorCode::Empty,
            Self::Store(e) => e.code(),
        }
    }
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => f.write_str("unauthorized"),
            Self::TooLarge { len, max } => write!(f, "nodes too long ({len} > {max} characters)"),
            Self::Empty => f.write_str("nodes empty"),
            Self::Store(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for AdminError {}

impl From<StoreError> for AdminError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

pub struct AdminHandler {
    guard: Arc<SessionGuard>,
    store: DirectoryStore,
    max_nodes_len: usize,
}

impl AdminHandler {
    pub fn new(guard: Arc<SessionGuard>, store: DirectoryStore, max_nodes_len: usize) -> Self {
        Self { guard, store, max_nodes_len }
    }

    /// Current directory text and per-country pull counts.
    pub async fn view_state(&self, credential: Option<&str>) -> Result<AdminView, AdminError> {
        if !self.guard.validate_session(credential) {
            return Err(AdminError::Unauthorized);
        }
        let doc = self.store.read().await?;
        let counters = self.store.counters(&doc).await?;
        Ok(AdminView { nodes: doc.nodes, counters })
    }

    /// Replace the directory text, returning the refreshed view.
    ///
    /// Oversized or empty text is rejected before the store is touched.
    pub async fn update_nodes(
        &self,
        credential: Option<&str>,
        new_text: &str,
    ) -> Result<AdminView, AdminError> {
        if !self.guard.validate_session(credential) {
            return Err(AdminError::Unauthorized);
        }
        let text = new_text.trim();
        let len = text.chars().count();
        if len > self.max_nodes_len {
            return Err(AdminError::TooLarge { len, max: self.max_nodes_len });
        }
        if text.is_empty() {
            return Err(AdminError::Empty);
        }

        // Read-modify-write of the whole document: a login failure recorded
        // concurrently can be overwritten here, and vice versa.
        let mut doc = self.store.read().await?;
        doc.nodes = text.to_owned();
        self.store.write(&doc).await?;
        tracing::info!(len, "directory updated");

        let counters = self.store.counters(&doc).await?;
        Ok(AdminView { nodes: doc.nodes, counters })
    }
}

#[cfg(test)]
#[path = "admin_tests.rs"]
mod tests;
