// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `nodedir` binary.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use nodedir_specs::{client, NodedirProcess, SUB_TOKEN};

const TIMEOUT: Duration = Duration::from_secs(10);
const CLIENT_UA: &str = "ClashMetaForAndroid/2.10";

#[tokio::test]
async fn http_health() -> anyhow::Result<()> {
    let nodedir = NodedirProcess::start()?;
    nodedir.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        client()?.get(format!("{}/api/v1/health", nodedir.base_url())).send().await?.json().await?;
    assert_eq!(resp["status"], "running");
    Ok(())
}

#[tokio::test]
async fn sub_round_trip_after_admin_update() -> anyhow::Result<()> {
    let nodedir = NodedirProcess::start()?;
    nodedir.wait_healthy(TIMEOUT).await?;
    let client = client()?;

    nodedir.set_nodes(&client, "vless://smoke-node").await?;

    let resp = client
        .get(format!("{}/sub", nodedir.base_url()))
        .query(&[("token", SUB_TOKEN)])
        .header(reqwest::header::USER_AGENT, CLIENT_UA)
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);
    let interval = resp.headers().get("profile-update-interval").and_then(|v| v.to_str().ok());
    assert_eq!(interval, Some("6"));
    assert_eq!(STANDARD.decode(resp.text().await?)?, b"vless://smoke-node");
    Ok(())
}

#[tokio::test]
async fn sub_denies_browser() -> anyhow::Result<()> {
    let nodedir = NodedirProcess::start()?;
    nodedir.wait_healthy(TIMEOUT).await?;

    let resp = client()?
        .get(format!("{}/sub", nodedir.base_url()))
        .query(&[("token", SUB_TOKEN)])
        .header(reqwest::header::USER_AGENT, "Mozilla/5.0")
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 403);
    assert_eq!(resp.text().await?, "403 Forbidden");
    Ok(())
}

#[tokio::test]
async fn lockout_tracks_peer_address() -> anyhow::Result<()> {
    let nodedir = NodedirProcess::start()?;
    nodedir.wait_healthy(TIMEOUT).await?;
    let client = client()?;
    let url = format!("{}/admin", nodedir.base_url());

    for _ in 0..3 {
        let resp = client.post(&url).form(&[("password", "guess")]).send().await?;
        assert_eq!(resp.status().as_u16(), 401);
    }
    let resp = client.post(&url).form(&[("password", nodedir_specs::ADMIN_TOKEN)]).send().await?;
    assert_eq!(resp.status().as_u16(), 429);
    Ok(())
}

#[tokio::test]
async fn file_store_survives_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let client = client()?;

    let first = NodedirProcess::build().file_store(dir.path()).spawn()?;
    first.wait_healthy(TIMEOUT).await?;
    first.set_nodes(&client, "trojan://persisted").await?;
    let status = first.stop(TIMEOUT).await?;
    assert!(status.success(), "graceful shutdown exited with {status}");

    let second = NodedirProcess::build().file_store(dir.path()).spawn()?;
    second.wait_healthy(TIMEOUT).await?;
    let resp = client
        .get(format!("{}/sub", second.base_url()))
        .query(&[("token", SUB_TOKEN)])
        .header(reqwest::header::USER_AGENT, CLIENT_UA)
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(STANDARD.decode(resp.text().await?)?, b"trojan://persisted");
    Ok(())
}

#[tokio::test]
async fn embedded_layout_counts_pulls() -> anyhow::Result<()> {
    let nodedir = NodedirProcess::build().counter_layout("embedded").spawn()?;
    nodedir.wait_healthy(TIMEOUT).await?;
    let client = client()?;
    nodedir.set_nodes(&client, "ss://x").await?;

    for _ in 0..2 {
        let resp = client
            .get(format!("{}/sub", nodedir.base_url()))
            .query(&[("token", SUB_TOKEN)])
            .header(reqwest::header::USER_AGENT, CLIENT_UA)
            .header("cf-ipcountry", "FR")
            .send()
            .await?;
        assert_eq!(resp.status().as_u16(), 200);
    }

    let cookie = nodedir.login(&client).await?;
    let page = client
        .get(format!("{}/admin", nodedir.base_url()))
        .header(reqwest::header::COOKIE, cookie)
        .send()
        .await?
        .text()
        .await?;
    assert!(page.contains("<td>FR</td><td>2</td>"));
    Ok(())
}
