// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bare HTML for the admin panel.

use std::fmt::Write;

use crate::admin::AdminView;

/// Escape text for use in element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn login_page(message: Option<&str>) -> String {
    let error = message
        .map(|m| format!("<p class=\"error\">{}</p>\n", escape_html(m)))
        .unwrap_or_default();
    format!(
        "<!doctype html>
<html>
<head><meta charset=\"utf-8\"><title>Admin Login</title></head>
<body>
<h2>Admin login</h2>
{error}<form method=\"post\">
Password: <input type=\"password\" name=\"password\" required><br>
<button type=\"submit\">Log in</button>
</form>
</body>
</html>"
    )
}

pub fn admin_page(view: &AdminView, subscription_link: &str) -> String {
    let mut rows = String::new();
    for (country, count) in &view.counters {
        let _ = writeln!(rows, "<tr><td>{}</td><td>{count}</td></tr>", escape_html(country));
    }
    if rows.is_empty() {
        rows.push_str("<tr><td colspan=\"2\">No pulls yet</td></tr>\n");
    }
    format!(
        "<!doctype html>
<html>
<head><meta charset=\"utf-8\"><title>Node Admin</title></head>
<body>
<h2>Nodes</h2>
<form method=\"post\">
<textarea name=\"nodes\" spellcheck=\"false\">{nodes}</textarea><br>
<button type=\"submit\">Save</button>
</form>
<h2>Subscription link</h2>
<input type=\"text\" readonly value=\"{link}\">
<h2>Pulls by country</h2>
<table>
<tr><th>Country</th><th>Pulls</th></tr>
{rows}</table>
</body>
</html>",
        nodes = escape_html(&view.nodes),
        link = escape_html(subscription_link),
    )
}
