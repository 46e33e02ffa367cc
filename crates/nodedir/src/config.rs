// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_NODES_LEN: usize = 10_000;
pub const DEFAULT_MAX_PASSWORD_LEN: usize = 64;
pub const DEFAULT_FAIL_LIMIT: u32 = 3;
pub const DEFAULT_LOCKOUT_SECS: u64 = 12 * 60 * 60;
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 10 * 60;
pub const DEFAULT_UPDATE_INTERVAL_MIN: u32 = 6;

/// Client families whose user agents may pull the directory.
pub const DEFAULT_ALLOWED_CLIENTS: &[&str] =
    &["clash", "sing-box", "singbox", "v2ray", "nekobox", "surge", "quantumult", "loon"];

/// Where per-country pull counters live.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterLayout {
    /// Inside the directory document's `logs` map.
    Embedded,
    /// One `count:<country>` record per country.
    #[default]
    Keyed,
}

impl std::fmt::Display for CounterLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded => f.write_str("embedded"),
            Self::Keyed => f.write_str("keyed"),
        }
    }
}

impl std::str::FromStr for CounterLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "embedded" => Ok(Self::Embedded),
            "keyed" => Ok(Self::Keyed),
            other => anyhow::bail!("invalid counter layout: {other}"),
        }
    }
}

/// Which key-value backend holds the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    File,
    Cloudflare,
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "cloudflare" | "cf" => Ok(Self::Cloudflare),
            other => anyhow::bail!("invalid store kind: {other}"),
        }
    }
}

/// Token-gated node directory with a password-protected admin panel.
#[derive(Debug, Clone, Parser)]
#[command(name = "nodedir", version, about)]
pub struct Config {
    /// Host address to bind to.
    #[arg(long, env = "NODEDIR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, env = "NODEDIR_PORT", default_value_t = 8787)]
    pub port: u16,

    /// Shared secret clients present as `?token=` on `/sub`. Unset denies every pull.
    #[arg(long, env = "NODEDIR_SUB_TOKEN", hide_env_values = true)]
    pub sub_token: Option<String>,

    /// Admin password, also used verbatim as the session cookie value.
    #[arg(long, env = "NODEDIR_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Maximum directory length in characters.
    #[arg(long, env = "NODEDIR_MAX_NODES_LEN", default_value_t = DEFAULT_MAX_NODES_LEN)]
    pub max_nodes_len: usize,

    /// Longer passwords are rejected without being compared.
    #[arg(long, env = "NODEDIR_MAX_PASSWORD_LEN", default_value_t = DEFAULT_MAX_PASSWORD_LEN)]
    pub max_password_len: usize,

    /// Failed logins from one source before it is locked out.
    #[arg(long, env = "NODEDIR_FAIL_LIMIT", default_value_t = DEFAULT_FAIL_LIMIT)]
    pub fail_limit: u32,

    /// Lockout window in seconds, measured from the last failure.
    #[arg(long, env = "NODEDIR_LOCKOUT_SECS", default_value_t = DEFAULT_LOCKOUT_SECS)]
    pub lockout_secs: u64,

    /// Max-Age of the admin session cookie in seconds.
    #[arg(long, env = "NODEDIR_SESSION_MAX_AGE_SECS", default_value_t = DEFAULT_SESSION_MAX_AGE_SECS)]
    pub session_max_age_secs: u64,

    /// Polling interval (minutes) advertised to clients.
    #[arg(long, env = "NODEDIR_UPDATE_INTERVAL_MIN", default_value_t = DEFAULT_UPDATE_INTERVAL_MIN)]
    pub update_interval_min: u32,

    /// Counter layout (embedded, keyed).
    #[arg(long, env = "NODEDIR_COUNTER_LAYOUT", default_value = "keyed")]
    pub counter_layout: String,

    /// Storage backend (memory, file, cloudflare).
    #[arg(long, env = "NODEDIR_STORE", default_value = "memory")]
    pub store: String,

    /// Directory for the file store.
    #[arg(long, env = "NODEDIR_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Cloudflare account id for the Workers KV store.
    #[arg(long, env = "NODEDIR_CF_ACCOUNT_ID")]
    pub cf_account_id: Option<String>,

    /// Cloudflare Workers KV namespace id.
    #[arg(long, env = "NODEDIR_CF_NAMESPACE_ID")]
    pub cf_namespace_id: Option<String>,

    /// Cloudflare API token with KV read/write permission.
    #[arg(long, env = "NODEDIR_CF_API_TOKEN", hide_env_values = true)]
    pub cf_api_token: Option<String>,

    /// Cloudflare API base URL.
    #[arg(long, env = "NODEDIR_CF_API_BASE", default_value = "https://api.cloudflare.com/client/v4")]
    pub cf_api_base: String,

    /// Header carrying the caller's country code.
    #[arg(long, env = "NODEDIR_COUNTRY_HEADER", default_value = "cf-ipcountry")]
    pub country_header: String,

    /// Header carrying the caller's address, used to track login failures.
    #[arg(long, env = "NODEDIR_CLIENT_IP_HEADER", default_value = "cf-connecting-ip")]
    pub client_ip_header: String,

    /// Client families allowed to pull (case-insensitive user-agent substrings).
    #[arg(long = "allow-client", env = "NODEDIR_ALLOW_CLIENTS", value_delimiter = ',')]
    pub allow_clients: Vec<String>,

    /// Log format (json or text).
    #[arg(long, env = "NODEDIR_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "NODEDIR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Limits and durations handed to each component at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub max_nodes_len: usize,
    pub max_password_len: usize,
    pub fail_limit: u32,
    pub lockout: Duration,
    pub session_max_age: Duration,
    pub update_interval_min: u32,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_nodes_len: DEFAULT_MAX_NODES_LEN,
            max_password_len: DEFAULT_MAX_PASSWORD_LEN,
            fail_limit: DEFAULT_FAIL_LIMIT,
            lockout: Duration::from_secs(DEFAULT_LOCKOUT_SECS),
            session_max_age: Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECS),
            update_interval_min: DEFAULT_UPDATE_INTERVAL_MIN,
        }
    }
}

impl Config {
    /// Validate the configuration before startup.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_nodes_len == 0 {
            anyhow::bail!("--max-nodes-len must be greater than zero");
        }
        if self.max_password_len == 0 {
            anyhow::bail!("--max-password-len must be greater than zero");
        }
        if self.fail_limit == 0 {
            anyhow::bail!("--fail-limit must be greater than zero");
        }
        self.counter_layout()?;
        if self.store_kind()? == StoreKind::Cloudflare
            && (self.cf_account_id.is_none()
                || self.cf_namespace_id.is_none()
                || self.cf_api_token.is_none())
        {
            anyhow::bail!(
                "cloudflare store requires --cf-account-id, --cf-namespace-id and --cf-api-token"
            );
        }
        if let Some(secret) = self.admin_token() {
            // The secret doubles as the session cookie value.
            if !secret.bytes().all(is_cookie_octet) {
                anyhow::bail!("--admin-token contains characters not allowed in a cookie value");
            }
            if secret.chars().count() > self.max_password_len {
                anyhow::bail!("--admin-token is longer than --max-password-len");
            }
        }
        Ok(())
    }

    /// Distribution secret, treating an empty value as unset.
    pub fn sub_token(&self) -> Option<&str> {
        self.sub_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Admin secret, treating an empty value as unset.
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn counter_layout(&self) -> anyhow::Result<CounterLayout> {
        self.counter_layout.parse()
    }

    pub fn store_kind(&self) -> anyhow::Result<StoreKind> {
        self.store.parse()
    }

    /// Allowed client families, falling back to the built-in list.
    pub fn allowed_clients(&self) -> Vec<String> {
        if self.allow_clients.is_empty() {
            DEFAULT_ALLOWED_CLIENTS.iter().map(|s| (*s).to_owned()).collect()
        } else {
            self.allow_clients.clone()
        }
    }

    pub fn policy(&self) -> Policy {
        Policy {
            max_nodes_len: self.max_nodes_len,
            max_password_len: self.max_password_len,
            fail_limit: self.fail_limit,
            lockout: Duration::from_secs(self.lockout_secs),
            session_max_age: Duration::from_secs(self.session_max_age_secs),
            update_interval_min: self.update_interval_min,
        }
    }

    /// Resolve the state directory for the file store.
    ///
    /// Uses `--state-dir`, then `$XDG_STATE_HOME/nodedir`,
    /// then `$HOME/.local/state/nodedir`.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.state_dir {
            return dir.clone();
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(xdg).join("nodedir");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local/state/nodedir");
        }
        PathBuf::from(".nodedir")
    }

    /// Build a minimal `Config` for tests (port 0, in-memory store).
    #[doc(hidden)]
    pub fn test() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            sub_token: Some("T1".into()),
            admin_token: Some("admin-secret".into()),
            max_nodes_len: DEFAULT_MAX_NODES_LEN,
            max_password_len: DEFAULT_MAX_PASSWORD_LEN,
            fail_limit: DEFAULT_FAIL_LIMIT,
            lockout_secs: DEFAULT_LOCKOUT_SECS,
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            update_interval_min: DEFAULT_UPDATE_INTERVAL_MIN,
            counter_layout: "keyed".into(),
            store: "memory".into(),
            state_dir: None,
            cf_account_id: None,
            cf_namespace_id: None,
            cf_api_token: None,
            cf_api_base: "https://api.cloudflare.com/client/v4".into(),
            country_header: "cf-ipcountry".into(),
            client_ip_header: "cf-connecting-ip".into(),
            allow_clients: vec![],
            log_format: "text".into(),
            log_level: "debug".into(),
        }
    }
}

/// RFC 6265 `cookie-octet`.
fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
