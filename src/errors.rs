// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the Garmin Connect client and session bootstrap

use std::path::PathBuf;
use thiserror::Error;

pub type GarminResult<T> = Result<T, GarminError>;

#[derive(Debug, Error)]
pub enum GarminError {
    /// A token file expected in the token store does not exist
    #[error("token file not found: {}", path.display())]
    TokenFileNotFound { path: PathBuf },

    /// The SSO or OAuth service answered with a failure status
    #[error("identity service error ({status}): {message}")]
    Identity { status: u16, message: String },

    /// Credentials or tokens were rejected
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Plain HTTP status failure outside the identity layer
    #[error("HTTP error {status} for {url}")]
    Http { status: u16, url: String },

    #[error("too many requests: {0}")]
    TooManyRequests(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// The request never produced a status (DNS, TLS, connect, body decode)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed token data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed token store: {0}")]
    TokenStore(String),

    #[error("unexpected SSO response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("multi-factor prompt failed: {0}")]
    Mfa(String),
}

impl GarminError {
    /// Failures that mean the cached session is missing or stale, so a fresh
    /// credential login should be attempted
    pub fn is_stale_session(&self) -> bool {
        matches!(
            self,
            Self::TokenFileNotFound { .. } | Self::Identity { .. } | Self::Authentication(_)
        )
    }

    /// Failures of a credential login that are logged and turned into an
    /// absent session instead of aborting startup
    pub fn is_login_failure(&self) -> bool {
        self.is_stale_session() || matches!(self, Self::Http { .. })
    }

    /// Map a failure status from an account API call
    pub fn from_api_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        };
        match status.as_u16() {
            401 => Self::Authentication(message),
            429 => Self::TooManyRequests(message),
            _ => Self::Connection(message),
        }
    }

    /// Map a failure status from an SSO or OAuth service call
    pub fn from_identity_status(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Authentication(message.into()),
            code => Self::Identity {
                status: code,
                message: message.into(),
            },
        }
    }
}
