// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `nodedir` binary as a subprocess and exercises it over HTTP.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Once;
use std::time::Duration;

pub const SUB_TOKEN: &str = "spec-sub-token";
pub const ADMIN_TOKEN: &str = "spec-admin-secret";

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to the compiled `nodedir` binary.
pub fn nodedir_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("nodedir")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Client that never follows redirects, so login responses stay observable.
pub fn client() -> anyhow::Result<reqwest::Client> {
    ensure_crypto();
    Ok(reqwest::Client::builder().redirect(reqwest::redirect::Policy::none()).build()?)
}

/// A running `nodedir` process that is killed on drop.
pub struct NodedirProcess {
    child: Child,
    port: u16,
}

/// Builder for the store a [`NodedirProcess`] runs against.
#[derive(Default)]
pub struct NodedirBuilder {
    state_dir: Option<PathBuf>,
    counter_layout: Option<String>,
}

impl NodedirBuilder {
    /// Persist to a file store rooted at `dir` (`--store file`).
    pub fn file_store(mut self, dir: &Path) -> Self {
        self.state_dir = Some(dir.to_path_buf());
        self
    }

    /// Select the counter layout (`--counter-layout`).
    pub fn counter_layout(mut self, layout: &str) -> Self {
        self.counter_layout = Some(layout.to_owned());
        self
    }

    pub fn spawn(self) -> anyhow::Result<NodedirProcess> {
        ensure_crypto();
        let binary = nodedir_binary();
        anyhow::ensure!(binary.exists(), "nodedir binary not found at {}", binary.display());

        let port = free_port()?;
        let mut args: Vec<String> = vec![
            "--host".into(),
            "127.0.0.1".into(),
            "--port".into(),
            port.to_string(),
            "--log-format".into(),
            "text".into(),
            "--log-level".into(),
            "warn".into(),
        ];
        match self.state_dir {
            Some(ref dir) => args.extend([
                "--store".into(),
                "file".into(),
                "--state-dir".into(),
                dir.to_string_lossy().into_owned(),
            ]),
            None => args.extend(["--store".into(), "memory".into()]),
        }
        if let Some(layout) = self.counter_layout {
            args.extend(["--counter-layout".into(), layout]);
        }

        let child = Command::new(&binary)
            .args(&args)
            .env("NODEDIR_SUB_TOKEN", SUB_TOKEN)
            .env("NODEDIR_ADMIN_TOKEN", ADMIN_TOKEN)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(NodedirProcess { child, port })
    }
}

impl NodedirProcess {
    pub fn build() -> NodedirBuilder {
        NodedirBuilder::default()
    }

    /// Spawn nodedir with an in-memory store.
    pub fn start() -> anyhow::Result<Self> {
        Self::build().spawn()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Poll health until responsive.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = client()?;
        let url = format!("{}/api/v1/health", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("nodedir did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Log in and return the `Cookie` header value for subsequent requests.
    pub async fn login(&self, client: &reqwest::Client) -> anyhow::Result<String> {
        let resp = client
            .post(format!("{}/admin", self.base_url()))
            .form(&[("password", ADMIN_TOKEN)])
            .send()
            .await?;
        anyhow::ensure!(resp.status().as_u16() == 303, "login failed: {}", resp.status());
        let cookie = resp
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| anyhow::anyhow!("login response has no set-cookie"))?;
        let pair = cookie.split(';').next().unwrap_or(cookie);
        Ok(pair.to_owned())
    }

    /// Replace the directory through the admin form.
    pub async fn set_nodes(&self, client: &reqwest::Client, nodes: &str) -> anyhow::Result<()> {
        let cookie = self.login(client).await?;
        let resp = client
            .post(format!("{}/admin", self.base_url()))
            .header(reqwest::header::COOKIE, cookie)
            .form(&[("nodes", nodes)])
            .send()
            .await?;
        anyhow::ensure!(resp.status().is_success(), "nodes update failed: {}", resp.status());
        Ok(())
    }

    /// Stop the process with SIGTERM and wait for it to exit.
    pub async fn stop(mut self, timeout: Duration) -> anyhow::Result<std::process::ExitStatus> {
        let status = Command::new("kill").args(["-TERM", &self.child.id().to_string()]).status()?;
        anyhow::ensure!(status.success(), "kill -TERM failed");

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("nodedir did not exit within {timeout:?}");
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for NodedirProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
