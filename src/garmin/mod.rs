// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Garmin Connect account client
//!
//! [`GarminApi`] is the query surface the MCP tools forward to. [`Garmin`]
//! implements it against the real service; tests substitute fixtures.

pub mod client;
pub mod oauth1;
pub mod sso;
pub mod tokens;

use async_trait::async_trait;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use crate::constants::garmin::OAUTH_CONSUMER_URL;
use crate::errors::{GarminError, GarminResult};

pub use client::{Garmin, GarminConnector};
pub use tokens::{OAuth1Token, OAuth2Token, TokenPair, TokenSource};

/// Read queries against an authenticated Garmin Connect account. Every method
/// returns the service's JSON untouched.
#[async_trait]
pub trait GarminApi: Send + Sync {
    async fn get_sleep_data(&self, date: &str) -> GarminResult<Value>;

    async fn get_daily_steps(&self, start: &str, end: &str) -> GarminResult<Value>;

    async fn get_activities(&self, start: u32, limit: u32) -> GarminResult<Value>;

    /// Resting heart rate for one day
    async fn get_rhr_day(&self, date: &str) -> GarminResult<Value>;

    async fn get_stress_data(&self, date: &str) -> GarminResult<Value>;

    /// `end` defaults to `start`
    async fn get_body_battery(&self, start: &str, end: Option<&str>) -> GarminResult<Value>;
}

/// Supplies a one-time multi-factor code during credential login
#[async_trait]
pub trait MfaPrompt: Send + Sync {
    async fn prompt_code(&self) -> GarminResult<String>;
}

/// Asks on the controlling terminal, falling back to stdin. Blocks until a
/// line is entered.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMfaPrompt;

#[async_trait]
impl MfaPrompt for ConsoleMfaPrompt {
    async fn prompt_code(&self) -> GarminResult<String> {
        tokio::task::spawn_blocking(read_code_from_console)
            .await
            .map_err(|e| GarminError::Mfa(e.to_string()))?
    }
}

fn read_code_from_console() -> GarminResult<String> {
    let mut stderr = io::stderr();
    write!(stderr, "Enter MFA code: ")?;
    stderr.flush()?;

    let mut line = String::new();
    match File::open("/dev/tty") {
        Ok(tty) => BufReader::new(tty).read_line(&mut line)?,
        Err(_) => io::stdin().lock().read_line(&mut line)?,
    };

    let code = line.trim();
    if code.is_empty() {
        return Err(GarminError::Mfa("no code entered".into()));
    }
    Ok(code.to_string())
}

/// Base URLs of the services a session talks to
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub domain: String,
    /// SSO root, e.g. `https://sso.garmin.com/sso`
    pub sso: String,
    /// Account API root, e.g. `https://connectapi.garmin.com`
    pub connectapi: String,
    pub consumer_url: String,
}

impl Endpoints {
    pub fn for_domain(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            sso: format!("https://sso.{domain}/sso"),
            connectapi: format!("https://connectapi.{domain}"),
            consumer_url: OAUTH_CONSUMER_URL.to_string(),
        }
    }

    /// Route every service through one base URL (mock servers)
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            domain: "garmin.com".to_string(),
            sso: format!("{base}/sso"),
            connectapi: base.to_string(),
            consumer_url: format!("{base}/oauth_consumer.json"),
        }
    }

    pub fn sso_embed(&self) -> String {
        format!("{}/embed", self.sso)
    }
}
