// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use crate::admin::AdminHandler;
use crate::config::Config;
use crate::gateway::DistributionGateway;
use crate::guard::SessionGuard;
use crate::policy::AccessPolicy;
use crate::store::{DirectoryStore, KvBackend};

/// Shared application state passed to all handlers via axum `State` extractor.
///
/// Holds no per-request data: every durable fact lives in the store.
pub struct AppState {
    pub config: Config,
    pub store: DirectoryStore,
    pub access: Arc<AccessPolicy>,
    pub guard: Arc<SessionGuard>,
    pub gateway: DistributionGateway,
    pub admin: AdminHandler,
}

impl AppState {
    /// Wire the components over `backend` using the limits and secrets in `config`.
    pub fn new(config: Config, backend: Arc<dyn KvBackend>) -> anyhow::Result<Self> {
        let policy = config.policy();
        let store = DirectoryStore::new(backend, config.counter_layout()?);
        let access = Arc::new(AccessPolicy::new(
            config.sub_token().map(str::to_owned),
            &config.allowed_clients(),
            policy.clone(),
        )?);
        let guard = Arc::new(SessionGuard::new(
            config.admin_token().map(str::to_owned),
            Arc::clone(&access),
            store.clone(),
        ));
        let gateway = DistributionGateway::new(Arc::clone(&access), store.clone());
        let admin = AdminHandler::new(Arc::clone(&guard), store.clone(), policy.max_nodes_len);
        Ok(Self { config, store, access, guard, gateway, admin })
    }
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
