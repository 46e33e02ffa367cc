// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin login: brute-force lockout and the session credential.
//!
//! The session credential is the admin secret itself. Validation is a
//! stateless equality check; there is no server-side session table and
//! no server-enforced expiry (the cookie's Max-Age is only a client hint).

use std::sync::Arc;
use std::time::Duration;

use crate::config::Policy;
use crate::error::StoreError;
use crate::policy::{constant_time_eq, AccessPolicy};
use crate::store::{DirectoryStore, FailureRecord};

/// Credential handed to the browser after a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    value: String,
    max_age: Duration,
}

impl SessionCredential {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("value", &"<redacted>")
            .field("max_age", &self.max_age)
            .finish()
    }
}

/// Why a login attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    WrongPassword,
    /// Longer than the password limit; never compared.
    Overlong,
    /// Refused before the password was looked at.
    LockedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted(SessionCredential),
    Rejected(RejectReason),
}

pub struct SessionGuard {
    admin_token: Option<String>,
    access: Arc<AccessPolicy>,
    store: DirectoryStore,
    policy: Policy,
}

impl SessionGuard {
    pub fn new(admin_token: Option<String>, access: Arc<AccessPolicy>, store: DirectoryStore) -> Self {
        let policy = access.policy().clone();
        let admin_token = admin_token.filter(|t| !t.is_empty());
        Self { admin_token, access, store, policy }
    }

    /// Evaluate one login attempt from `source` at `now_ms` (epoch millis).
    ///
    /// At most one document read and one write.
    pub async fn attempt_login(
        &self,
        source: &str,
        password: &str,
        now_ms: u64,
    ) -> Result<LoginOutcome, StoreError> {
        let mut doc = self.store.read().await?;

        if self.access.is_locked_out(&doc, source, now_ms) {
            tracing::warn!(source, "login refused: source locked out");
            return Ok(LoginOutcome::Rejected(RejectReason::LockedOut));
        }

        let password = password.trim();
        let reason = if password.chars().count() > self.policy.max_password_len {
            RejectReason::Overlong
        } else if let Some(credential) = self.check_password(password) {
            if doc.login_failures.remove(source).is_some() {
                self.store.write(&doc).await?;
            }
            tracing::info!(source, "admin login accepted");
            return Ok(LoginOutcome::Accepted(credential));
        } else {
            RejectReason::WrongPassword
        };

        let record = doc.login_failures.entry(source.to_owned()).or_insert_with(FailureRecord::default);
        record.count = record.count.saturating_add(1);
        record.last_failure_at = now_ms;
        let failures = record.count;
        self.store.write(&doc).await?;

        tracing::warn!(source, failures, reason = ?reason, "admin login rejected");
        Ok(LoginOutcome::Rejected(reason))
    }

    fn check_password(&self, password: &str) -> Option<SessionCredential> {
        let expected = self.admin_token.as_deref()?;
        constant_time_eq(password, expected).then(|| SessionCredential {
            value: expected.to_owned(),
            max_age: self.policy.session_max_age,
        })
    }

    /// True iff the presented credential equals the admin secret.
    pub fn validate_session(&self, credential: Option<&str>) -> bool {
        match (self.admin_token.as_deref(), credential) {
            (Some(expected), Some(presented)) => constant_time_eq(presented, expected),
            _ => false,
        }
    }

    /// Current failure record for `source`, if any.
    pub async fn failures(&self, source: &str) -> Result<Option<FailureRecord>, StoreError> {
        Ok(self.store.read().await?.failures(source).copied())
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
