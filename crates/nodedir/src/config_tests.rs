// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use super::*;

fn parse(args: &[&str]) -> anyhow::Result<Config> {
    let mut argv = vec!["nodedir"];
    argv.extend_from_slice(args);
    Ok(Config::try_parse_from(argv)?)
}

#[test]
fn defaults_match_policy_constants() -> anyhow::Result<()> {
    let config = parse(&[])?;
    assert_eq!(config.port, 8787);
    assert_eq!(config.policy(), Policy::default());
    assert_eq!(config.counter_layout()?, CounterLayout::Keyed);
    assert_eq!(config.store_kind()?, StoreKind::Memory);
    assert_eq!(config.allowed_clients().len(), DEFAULT_ALLOWED_CLIENTS.len());
    Ok(())
}

#[test]
fn policy_converts_seconds() -> anyhow::Result<()> {
    let config = parse(&["--lockout-secs", "60", "--session-max-age-secs", "5"])?;
    let policy = config.policy();
    assert_eq!(policy.lockout, Duration::from_secs(60));
    assert_eq!(policy.session_max_age, Duration::from_secs(5));
    Ok(())
}

#[test]
fn empty_secrets_are_unset() -> anyhow::Result<()> {
    let config = parse(&["--sub-token", "", "--admin-token", ""])?;
    assert_eq!(config.sub_token(), None);
    assert_eq!(config.admin_token(), None);
    Ok(())
}

#[test]
fn allow_client_list_is_comma_delimited() -> anyhow::Result<()> {
    let config = parse(&["--allow-client", "clash,stash"])?;
    assert_eq!(config.allowed_clients(), vec!["clash".to_owned(), "stash".to_owned()]);
    Ok(())
}

#[yare::parameterized(
    embedded = { "embedded", CounterLayout::Embedded },
    keyed = { "keyed", CounterLayout::Keyed },
    mixed_case = { "Keyed", CounterLayout::Keyed },
)]
fn counter_layout_parses(input: &str, expected: CounterLayout) {
    assert_eq!(input.parse::<CounterLayout>().ok(), Some(expected));
}

#[yare::parameterized(
    memory = { "memory", StoreKind::Memory },
    file = { "file", StoreKind::File },
    cloudflare = { "cloudflare", StoreKind::Cloudflare },
    cf_alias = { "cf", StoreKind::Cloudflare },
)]
fn store_kind_parses(input: &str, expected: StoreKind) {
    assert_eq!(input.parse::<StoreKind>().ok(), Some(expected));
}

#[test]
fn validate_rejects_zero_fail_limit() -> anyhow::Result<()> {
    let config = Config { fail_limit: 0, ..Config::test() };
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn validate_rejects_unknown_layout() -> anyhow::Result<()> {
    let config = Config { counter_layout: "sharded".into(), ..Config::test() };
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn validate_requires_cloudflare_credentials() -> anyhow::Result<()> {
    let mut config = Config { store: "cloudflare".into(), ..Config::test() };
    assert!(config.validate().is_err());

    config.cf_account_id = Some("acct".into());
    config.cf_namespace_id = Some("ns".into());
    config.cf_api_token = Some("tok".into());
    config.validate()?;
    Ok(())
}

#[test]
fn explicit_state_dir_wins() -> anyhow::Result<()> {
    let config = Config { state_dir: Some("/tmp/nodedir-x".into()), ..Config::test() };
    assert_eq!(config.state_dir(), std::path::PathBuf::from("/tmp/nodedir-x"));
    Ok(())
}

#[yare::parameterized(
    semicolon = { "admin;secret" },
    space = { "admin secret" },
    comma = { "admin,secret" },
    quote = { "admin\"secret" },
    backslash = { "admin\\secret" },
    non_ascii = { "pässwort" },
    control = { "admin\tsecret" },
)]
fn validate_rejects_admin_token_unusable_as_cookie(secret: &str) {
    let config = Config { admin_token: Some(secret.into()), ..Config::test() };
    assert!(config.validate().is_err());
}

#[test]
fn validate_accepts_cookie_safe_admin_token() -> anyhow::Result<()> {
    let secret = "Adm1n-s3cret_~!#$%&'*+./:<=>?@[]^`{|}";
    let config = Config { admin_token: Some(secret.into()), ..Config::test() };
    config.validate()?;
    Ok(())
}

#[test]
fn validate_rejects_admin_token_longer_than_password_limit() {
    let config = Config {
        admin_token: Some("a".repeat(65)),
        max_password_len: 64,
        ..Config::test()
    };
    assert!(config.validate().is_err());
}
