// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Error codes surfaced by the HTTP layer.
///
/// Every authorization failure on the distribution endpoint collapses into
/// [`ErrorCode::Denied`] so callers cannot tell which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Denied,
    Unauthorized,
    WrongPassword,
    LockedOut,
    TooLarge,
    Empty,
    BadRequest,
    StoreUnavailable,
    NotFound,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Denied => 403,
            Self::Unauthorized => 401,
            Self::WrongPassword => 401,
            Self::LockedOut => 429,
            Self::TooLarge => 400,
            Self::Empty => 400,
            Self::BadRequest => 400,
            Self::StoreUnavailable => 503,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Denied => "DENIED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::WrongPassword => "WRONG_PASSWORD",
            Self::LockedOut => "LOCKED_OUT",
            Self::TooLarge => "TOO_LARGE",
            Self::Empty => "EMPTY",
            Self::BadRequest => "BAD_REQUEST",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::NotFound => "NOT_FOUND",
            Self::Internal => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Plain-text response carrying only the status line text, never the cause.
    pub fn to_plain_response(&self) -> (StatusCode, String) {
        let status = self.status_code();
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, format!("{} {reason}", status.as_u16()))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure talking to the backing key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached (I/O or network failure).
    Unavailable(String),
    /// The store answered, but not with something we can use.
    Backend { status: u16, message: String },
    /// A record could not be serialized for writing.
    Encode(String),
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::StoreUnavailable
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            Self::Backend { status, message } => write!(f, "store error ({status}): {message}"),
            Self::Encode(msg) => write!(f, "store encode error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Backend { status: status.as_u16(), message: e.to_string() },
            None => Self::Unavailable(e.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
