// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminError;
use crate::error::ErrorCode;
use crate::gateway::GatewayError;
use crate::guard::{LoginOutcome, RejectReason, SessionCredential};
use crate::state::{epoch_ms, AppState};
use crate::transport::render;
use crate::transport::request::{
    client_identity, cookie_value, origin_country, source_identity, subscription_link,
    SESSION_COOKIE,
};

/// Header advertising the client polling interval, in minutes.
pub const UPDATE_INTERVAL_HEADER: &str = "profile-update-interval";

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SubQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminForm {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub nodes: Option<String>,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/v1/health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned() })
}

/// Anything unrouted.
pub async fn not_found() -> impl IntoResponse {
    ErrorCode::NotFound.to_plain_response()
}

/// `GET /sub?token=...`: base64 directory for recognized clients.
///
/// Every denial returns the same opaque 403.
pub async fn subscription(
    State(s): State<Arc<AppState>>,
    query: Result<Query<SubQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Response {
    let token = query.ok().and_then(|Query(q)| q.token);
    let country = origin_country(&headers, &s.config.country_header);

    match s.gateway.serve(token.as_deref(), client_identity(&headers), country).await {
        Ok(dist) => (
            StatusCode::OK,
            [
                (CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
                (
                    HeaderName::from_static(UPDATE_INTERVAL_HEADER),
                    HeaderValue::from(dist.update_interval_min),
                ),
            ],
            dist.body,
        )
            .into_response(),
        Err(GatewayError::Denied) => {
            tracing::warn!(country = country.unwrap_or("-"), "distribution denied");
            ErrorCode::Denied.to_plain_response().into_response()
        }
        Err(GatewayError::Store(e)) => {
            tracing::error!(err = %e, "distribution failed");
            e.code().to_plain_response().into_response()
        }
    }
}

/// `GET /admin`: management view with a valid session, login form otherwise.
pub async fn admin_page(State(s): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let credential = cookie_value(&headers, SESSION_COOKIE);
    match s.admin.view_state(credential.as_deref()).await {
        Ok(view) => Html(render::admin_page(&view, &link_for(&s, &headers))).into_response(),
        Err(AdminError::Unauthorized) => Html(render::login_page(None)).into_response(),
        Err(e) => admin_error(e),
    }
}

/// `POST /admin`: `password` logs in; `nodes` updates the directory.
pub async fn admin_submit(
    State(s): State<Arc<AppState>>,
    headers: HeaderMap,
    extensions: Extensions,
    Form(form): Form<AdminForm>,
) -> Response {
    let password = form.password.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let has_nodes = form.nodes.as_deref().is_some_and(|n| !n.trim().is_empty());

    if let (Some(password), false) = (password, has_nodes) {
        let source = source_identity(&headers, &extensions, &s.config.client_ip_header);
        return login(&s, &source, password).await;
    }

    let credential = cookie_value(&headers, SESSION_COOKIE);
    let nodes = form.nodes.unwrap_or_default();
    match s.admin.update_nodes(credential.as_deref(), &nodes).await {
        Ok(view) => Html(render::admin_page(&view, &link_for(&s, &headers))).into_response(),
        Err(AdminError::Unauthorized) => {
            (StatusCode::UNAUTHORIZED, Html(render::login_page(None))).into_response()
        }
        Err(e) => admin_error(e),
    }
}

async fn login(s: &AppState, source: &str, password: &str) -> Response {
    let outcome = match s.guard.attempt_login(source, password, epoch_ms()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(err = %e, "login failed: store unavailable");
            return e.code().to_plain_response().into_response();
        }
    };
    match outcome {
        LoginOutcome::Accepted(credential) => match session_cookie(&credential) {
            Some(cookie) => (
                StatusCode::SEE_OTHER,
                [(SET_COOKIE, cookie), (LOCATION, HeaderValue::from_static("/admin"))],
            )
                .into_response(),
            None => {
                tracing::error!("admin secret is not a valid cookie value");
                ErrorCode::Internal.to_plain_response().into_response()
            }
        },
        LoginOutcome::Rejected(reason) => {
            let (code, message) = match reason {
                RejectReason::WrongPassword => (ErrorCode::WrongPassword, "Wrong password"),
                RejectReason::Overlong => (ErrorCode::WrongPassword, "Password too long"),
                RejectReason::LockedOut => {
                    (ErrorCode::LockedOut, "Too many failed attempts, try again later")
                }
            };
            (code.status_code(), Html(render::login_page(Some(message)))).into_response()
        }
    }
}

/// `Set-Cookie` value carrying the session credential.
pub fn session_cookie(credential: &SessionCredential) -> Option<HeaderValue> {
    let cookie = format!(
        "{SESSION_COOKIE}={}; Path=/admin; HttpOnly; Max-Age={}",
        credential.value(),
        credential.max_age().as_secs()
    );
    HeaderValue::from_str(&cookie).ok()
}

fn link_for(s: &AppState, headers: &HeaderMap) -> String {
    subscription_link(headers, s.config.sub_token().unwrap_or_default())
}

fn admin_error(e: AdminError) -> Response {
    let code = e.code();
    match e {
        AdminError::Store(ref err) => {
            tracing::error!(err = %err, "admin request failed");
            code.to_plain_response().into_response()
        }
        other => (code.status_code(), other.to_string()).into_response(),
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
