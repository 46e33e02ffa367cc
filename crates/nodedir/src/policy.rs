// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure authorization decisions: distribution access and login lockout.

use regex::Regex;

use crate::config::Policy;
use crate::store::DirectoryDocument;

/// Constant-time string comparison to prevent timing side-channel attacks.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Outcome of a distribution authorization check.
///
/// Deliberately carries no reason: token and client failures look the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

/// Shared-secret and client-identity checks, plus the lockout rule.
#[derive(Debug)]
pub struct AccessPolicy {
    sub_token: Option<String>,
    /// `None` when no client family is configured; every request is denied.
    clients: Option<Regex>,
    policy: Policy,
}

impl AccessPolicy {
    pub fn new(
        sub_token: Option<String>,
        allowed_clients: &[String],
        policy: Policy,
    ) -> anyhow::Result<Self> {
        let families: Vec<String> = allowed_clients
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(regex::escape)
            .collect();
        let clients = if families.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("(?i)({})", families.join("|")))?)
        };
        let sub_token = sub_token.filter(|t| !t.is_empty());
        Ok(Self { sub_token, clients, policy })
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Whether the user agent belongs to a recognized client family.
    pub fn client_allowed(&self, client_identity: &str) -> bool {
        self.clients.as_ref().is_some_and(|re| re.is_match(client_identity))
    }

    /// Allow iff the token matches the configured secret and the client is recognized.
    pub fn authorize_distribution(&self, token: Option<&str>, client_identity: &str) -> Decision {
        let token_ok = match (self.sub_token.as_deref(), token) {
            (Some(expected), Some(presented)) => constant_time_eq(presented, expected),
            _ => false,
        };
        // Evaluate both so timing does not hint at which one failed.
        let client_ok = self.client_allowed(client_identity);
        if token_ok && client_ok {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    /// True while `source` has hit the failure limit and its last failure
    /// is inside the lockout window.
    ///
    /// Window expiry does not reset the count; only a successful login does.
    /// A source failing once per window therefore stays one failure away
    /// from lockout indefinitely.
    pub fn is_locked_out(&self, doc: &DirectoryDocument, source: &str, now_ms: u64) -> bool {
        let Some(record) = doc.failures(source) else {
            return false;
        };
        let lockout_ms = u64::try_from(self.policy.lockout.as_millis()).unwrap_or(u64::MAX);
        record.count >= self.policy.fail_limit
            && now_ms.saturating_sub(record.last_failure_at) < lockout_ms
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
