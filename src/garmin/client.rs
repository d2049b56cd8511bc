// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

use super::oauth1::OAuthConsumer;
use super::tokens::{TokenPair, TokenSource};
use super::{sso, Endpoints, GarminApi, MfaPrompt};
use crate::constants::garmin::{
    ACTIVITIES_PATH, BODY_BATTERY_PATH, MAX_STEPS_RANGE_DAYS, OAUTH_USER_AGENT,
    RESTING_HEART_RATE_METRIC_ID, RESTING_HEART_RATE_PATH, SLEEP_NON_SLEEP_BUFFER_MINUTES,
    SLEEP_PATH, SOCIAL_PROFILE_PATH, STEPS_PATH, STRESS_PATH,
};
use crate::errors::{GarminError, GarminResult};
use crate::session::SessionConnector;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SocialProfile {
    display_name: String,
    #[serde(default)]
    full_name: Option<String>,
}

/// An authenticated Garmin Connect session
pub struct Garmin {
    http: Client,
    endpoints: Endpoints,
    tokens: RwLock<TokenPair>,
    consumer: OnceCell<OAuthConsumer>,
    display_name: String,
    full_name: Option<String>,
}

impl Garmin {
    /// Restore a session from cached tokens and confirm it against the
    /// account API
    pub async fn resume(
        http: Client,
        endpoints: Endpoints,
        source: &TokenSource,
    ) -> GarminResult<Self> {
        let tokens = source.read()?;
        Self::from_tokens(http, endpoints, tokens).await
    }

    /// Fresh credential login through SSO
    pub async fn login(
        http: Client,
        endpoints: Endpoints,
        email: &str,
        password: &str,
        mfa: &dyn MfaPrompt,
    ) -> GarminResult<Self> {
        if email.is_empty() || password.is_empty() {
            return Err(GarminError::Authentication(
                "email and password are required for credential login".into(),
            ));
        }
        let tokens = sso::login(&http, &endpoints, email, password, mfa).await?;
        Self::from_tokens(http, endpoints, tokens).await
    }

    async fn from_tokens(http: Client, endpoints: Endpoints, tokens: TokenPair) -> GarminResult<Self> {
        let mut garmin = Self {
            http,
            endpoints,
            tokens: RwLock::new(tokens),
            consumer: OnceCell::new(),
            display_name: String::new(),
            full_name: None,
        };

        // A failed profile check means the tokens are unusable
        let profile: SocialProfile = serde_json::from_value(
            garmin
                .request(SOCIAL_PROFILE_PATH, &[], |status, body| {
                    GarminError::from_identity_status(status, format!("{status}: {body}"))
                })
                .await?,
        )?;
        info!(display_name = %profile.display_name, "Garmin Connect session established");
        garmin.display_name = profile.display_name;
        garmin.full_name = profile.full_name;

        Ok(garmin)
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    /// Current token pair, including any in-memory refresh
    pub async fn tokens(&self) -> TokenPair {
        self.tokens.read().await.clone()
    }

    async fn authorization(&self) -> GarminResult<String> {
        {
            let tokens = self.tokens.read().await;
            if !tokens.oauth2.is_expired() {
                return Ok(tokens.oauth2.authorization_header());
            }
        }

        let mut tokens = self.tokens.write().await;
        if tokens.oauth2.is_expired() {
            debug!("OAuth2 token expired, exchanging OAuth1 token");
            let consumer = self
                .consumer
                .get_or_try_init(|| sso::fetch_consumer(&self.http, &self.endpoints))
                .await?;
            tokens.oauth2 = sso::exchange(&self.http, &self.endpoints, consumer, &tokens.oauth1).await?;
        }
        Ok(tokens.oauth2.authorization_header())
    }

    async fn connectapi(&self, path: &str, query: &[(&str, String)]) -> GarminResult<Value> {
        self.request(path, query, GarminError::from_api_status).await
    }

    async fn request(
        &self,
        path: &str,
        query: &[(&str, String)],
        on_failure: fn(StatusCode, &str) -> GarminError,
    ) -> GarminResult<Value> {
        let authorization = self.authorization().await?;
        let url = format!("{}{}", self.endpoints.connectapi, path);
        debug!(%url, "Garmin Connect request");

        let response = self
            .http
            .get(&url)
            .header(header::USER_AGENT, OAUTH_USER_AGENT)
            .header(header::AUTHORIZATION, authorization)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(on_failure(status, &body));
        }
        Ok(response.json().await?)
    }
}

fn parse_date(value: &str) -> GarminResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| GarminError::InvalidArgument(format!("expected YYYY-MM-DD, got '{value}'")))
}

/// Split `[start, end]` into inclusive ranges of at most `days` days
fn date_chunks(start: NaiveDate, end: NaiveDate, days: i64) -> Vec<(NaiveDate, NaiveDate)> {
    let mut chunks = Vec::new();
    let mut chunk_start = start;
    while chunk_start <= end {
        let chunk_end = (chunk_start + Duration::days(days - 1)).min(end);
        chunks.push((chunk_start, chunk_end));
        chunk_start = chunk_end + Duration::days(1);
    }
    chunks
}

#[async_trait]
impl GarminApi for Garmin {
    async fn get_sleep_data(&self, date: &str) -> GarminResult<Value> {
        parse_date(date)?;
        let path = format!("{SLEEP_PATH}/{}", self.display_name);
        self.connectapi(
            &path,
            &[
                ("date", date.to_string()),
                ("nonSleepBufferMinutes", SLEEP_NON_SLEEP_BUFFER_MINUTES.to_string()),
            ],
        )
        .await
    }

    async fn get_daily_steps(&self, start: &str, end: &str) -> GarminResult<Value> {
        let (from, to) = (parse_date(start)?, parse_date(end)?);
        if to < from {
            return Err(GarminError::InvalidArgument(format!(
                "end date {end} is before start date {start}"
            )));
        }

        let chunks = date_chunks(from, to, MAX_STEPS_RANGE_DAYS);
        if let [(from, to)] = chunks.as_slice() {
            return self.connectapi(&format!("{STEPS_PATH}/{from}/{to}"), &[]).await;
        }

        let mut days = Vec::new();
        for (from, to) in chunks {
            match self.connectapi(&format!("{STEPS_PATH}/{from}/{to}"), &[]).await? {
                Value::Array(items) => days.extend(items),
                Value::Null => {}
                other => days.push(other),
            }
        }
        Ok(Value::Array(days))
    }

    async fn get_activities(&self, start: u32, limit: u32) -> GarminResult<Value> {
        self.connectapi(
            ACTIVITIES_PATH,
            &[("start", start.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn get_rhr_day(&self, date: &str) -> GarminResult<Value> {
        parse_date(date)?;
        let path = format!("{RESTING_HEART_RATE_PATH}/{}", self.display_name);
        self.connectapi(
            &path,
            &[
                ("fromDate", date.to_string()),
                ("untilDate", date.to_string()),
                ("metricId", RESTING_HEART_RATE_METRIC_ID.to_string()),
            ],
        )
        .await
    }

    async fn get_stress_data(&self, date: &str) -> GarminResult<Value> {
        parse_date(date)?;
        self.connectapi(&format!("{STRESS_PATH}/{date}"), &[]).await
    }

    async fn get_body_battery(&self, start: &str, end: Option<&str>) -> GarminResult<Value> {
        let end = end.unwrap_or(start);
        parse_date(start)?;
        parse_date(end)?;
        self.connectapi(
            BODY_BATTERY_PATH,
            &[("startDate", start.to_string()), ("endDate", end.to_string())],
        )
        .await
    }
}

/// Builds [`Garmin`] sessions for the bootstrapper
#[derive(Clone)]
pub struct GarminConnector {
    http: Client,
    endpoints: Endpoints,
}

impl GarminConnector {
    pub fn new(endpoints: Endpoints) -> GarminResult<Self> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self { http, endpoints })
    }

    pub fn for_domain(domain: &str) -> GarminResult<Self> {
        Self::new(Endpoints::for_domain(domain))
    }
}

#[async_trait]
impl SessionConnector for GarminConnector {
    type Handle = Garmin;

    async fn resume(&self, tokenstore: &str) -> GarminResult<Garmin> {
        Garmin::resume(
            self.http.clone(),
            self.endpoints.clone(),
            &TokenSource::resolve(tokenstore),
        )
        .await
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        mfa: &dyn MfaPrompt,
    ) -> GarminResult<(Garmin, TokenPair)> {
        let garmin = Garmin::login(
            self.http.clone(),
            self.endpoints.clone(),
            email,
            password,
            mfa,
        )
        .await?;
        let tokens = garmin.tokens().await;
        Ok((garmin, tokens))
    }
}
