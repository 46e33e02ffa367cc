// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pulling identities and credentials out of request headers.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, Extensions, HeaderMap};
use reqwest::Url;

/// Name of the admin session cookie.
pub const SESSION_COOKIE: &str = "admin_auth";

/// Source identity used when nothing better is available.
pub const UNKNOWN_SOURCE: &str = "unknown";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

/// Value of cookie `name`, if present and non-empty.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Identity that login failures are tracked against.
///
/// Tries the configured client-IP header, then the first `X-Forwarded-For`
/// hop, then the TCP peer address.
pub fn source_identity(headers: &HeaderMap, extensions: &Extensions, ip_header: &str) -> String {
    if let Some(ip) = header_str(headers, ip_header) {
        return ip.to_owned();
    }
    if let Some(first) = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_owned();
    }
    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    UNKNOWN_SOURCE.to_owned()
}

/// Country code declared by the edge, verbatim.
pub fn origin_country<'a>(headers: &'a HeaderMap, country_header: &str) -> Option<&'a str> {
    header_str(headers, country_header)
}

/// Client identity string (the user agent), empty when absent.
pub fn client_identity(headers: &HeaderMap) -> &str {
    headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()).unwrap_or("")
}

/// Absolute distribution link for the admin view.
pub fn subscription_link(headers: &HeaderMap, token: &str) -> String {
    let scheme = header_str(headers, "x-forwarded-proto").unwrap_or("http");
    let host = header_str(headers, header::HOST.as_str()).unwrap_or("localhost");
    match Url::parse(&format!("{scheme}://{host}/sub")) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("token", token);
            url.to_string()
        }
        Err(_) => format!("/sub?token={token}"),
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
