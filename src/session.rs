// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Session bootstrap
//!
//! Runs once at startup to obtain an authenticated Garmin Connect handle:
//!
//! 1. Restore the session from the token store.
//! 2. If the tokens are missing or rejected, log in with email, password and
//!    an MFA prompt, then persist the new tokens to the token store directory
//!    and, encoded, to the base64 token file.
//! 3. If that login fails too, report an absent session instead of failing.
//!
//! Any other error aborts startup. Neither stage is retried.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::GarminConfig;
use crate::errors::GarminResult;
use crate::garmin::tokens::write_encoded;
use crate::garmin::{GarminApi, MfaPrompt, TokenPair, TokenSource};

/// Creates account handles either from cached tokens or from credentials
#[async_trait]
pub trait SessionConnector: Send + Sync {
    type Handle: GarminApi + 'static;

    /// Restore a session from a token store (directory path or encoded blob)
    async fn resume(&self, tokenstore: &str) -> GarminResult<Self::Handle>;

    /// Credential login; returns the handle and the tokens to persist
    async fn login(
        &self,
        email: &str,
        password: &str,
        mfa: &dyn MfaPrompt,
    ) -> GarminResult<(Self::Handle, TokenPair)>;
}

/// The account handle as seen by the MCP tools
#[derive(Clone)]
pub enum SessionState {
    Authenticated(Arc<dyn GarminApi>),
    /// Both login paths failed at startup
    Unavailable,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn api(&self) -> Option<&Arc<dyn GarminApi>> {
        match self {
            Self::Authenticated(api) => Some(api),
            Self::Unavailable => None,
        }
    }
}

impl<H: GarminApi + 'static> From<Option<H>> for SessionState {
    fn from(handle: Option<H>) -> Self {
        match handle {
            Some(handle) => Self::Authenticated(Arc::new(handle)),
            None => Self::Unavailable,
        }
    }
}

/// Obtain a handle, preferring cached tokens over a credential login.
///
/// `Ok(None)` means both paths failed with a recoverable error; `Err` is
/// reserved for failures that must stop the process.
pub async fn init_api<C: SessionConnector>(
    connector: &C,
    config: &GarminConfig,
    mfa: &dyn MfaPrompt,
) -> GarminResult<Option<C::Handle>> {
    info!(
        tokenstore = %config.tokenstore,
        "Trying to login to Garmin Connect using token data"
    );

    match connector.resume(&config.tokenstore).await {
        Ok(handle) => return Ok(Some(handle)),
        Err(err) if err.is_stale_session() => {
            warn!(error = %err, "Login tokens not present or expired, logging in with credentials");
        }
        Err(err) => return Err(err),
    }

    let email = config.email.as_deref().unwrap_or_default();
    let password = config.password.as_deref().unwrap_or_default();

    let (handle, tokens) = match connector.login(email, password, mfa).await {
        Ok(login) => login,
        Err(err) if err.is_login_failure() => {
            error!(error = %err, "Garmin Connect login failed");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    persist_tokens(&tokens, config)?;
    Ok(Some(handle))
}

/// Missing parent directories are created; any other write failure is
/// fatal instead of producing an absent session.
fn persist_tokens(tokens: &TokenPair, config: &GarminConfig) -> GarminResult<()> {
    match TokenSource::resolve(&config.tokenstore) {
        TokenSource::Directory(dir) => {
            tokens.dump(&dir)?;
            info!(path = %dir.display(), "OAuth tokens stored for future use");
        }
        TokenSource::Encoded(_) => {
            warn!("Token store is an encoded session, not a directory; skipping token files");
        }
    }

    let encoded_path = config.tokenstore_base64_path();
    write_encoded(&encoded_path, &tokens.dumps()?)?;
    info!(path = %encoded_path.display(), "OAuth tokens encoded as base64 and stored");

    Ok(())
}
