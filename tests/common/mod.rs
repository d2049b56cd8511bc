// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared fixtures: an in-memory Garmin account and a connector that builds it

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use garmin_mcp_server::errors::{GarminError, GarminResult};
use garmin_mcp_server::garmin::{
    GarminApi, MfaPrompt, OAuth1Token, OAuth2Token, TokenPair, TokenSource,
};
use garmin_mcp_server::session::SessionConnector;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn token_pair(access_token: &str) -> TokenPair {
    let now = Utc::now().timestamp();
    TokenPair {
        oauth1: OAuth1Token {
            oauth_token: format!("{access_token}-oauth1"),
            oauth_token_secret: "oauth1-secret".into(),
            mfa_token: None,
            mfa_expiration_timestamp: None,
            domain: Some("garmin.com".into()),
        },
        oauth2: OAuth2Token {
            scope: "CONNECT_READ CONNECT_WRITE".into(),
            jti: "jti".into(),
            token_type: "Bearer".into(),
            access_token: access_token.into(),
            refresh_token: "refresh".into(),
            expires_in: 3600,
            expires_at: now + 3600,
            refresh_token_expires_in: Some(7_776_000),
            refresh_token_expires_at: Some(now + 7_776_000),
        },
    }
}

pub fn sleep_fixture() -> Value {
    json!({
        "dailySleepDTO": {
            "calendarDate": "2024-01-01",
            "sleepTimeSeconds": 27120,
            "deepSleepSeconds": 5400
        },
        "remSleepData": true
    })
}

pub fn steps_fixture() -> Value {
    json!([
        {"calendarDate": "2024-01-01", "totalSteps": 10234, "stepGoal": 8000},
        {"calendarDate": "2024-01-02", "totalSteps": 6120, "stepGoal": 8000}
    ])
}

pub fn activities_fixture(limit: u32) -> Value {
    let all = [
        json!({"activityId": 3, "activityName": "Morning Run"}),
        json!({"activityId": 2, "activityName": "Lunch Ride"}),
        json!({"activityId": 1, "activityName": "Evening Walk"}),
    ];
    Value::Array(all.into_iter().take(limit as usize).collect())
}

pub fn heart_rate_fixture() -> Value {
    json!({
        "userProfileId": 42,
        "allMetrics": {"metricsMap": {"WELLNESS_RESTING_HEART_RATE": [{"value": 52.0, "calendarDate": "2024-01-01"}]}}
    })
}

pub fn stress_fixture() -> Value {
    json!({"calendarDate": "2024-01-01", "maxStressLevel": 87, "avgStressLevel": 31})
}

pub fn body_battery_fixture() -> Value {
    json!([{"date": "2024-01-01", "charged": 64, "drained": 58}])
}

/// Account that answers every query with a fixture and records the calls
#[derive(Default)]
pub struct FixtureApi {
    pub label: String,
    pub calls: Mutex<Vec<String>>,
}

impl FixtureApi {
    pub fn labelled(label: &str) -> Self {
        Self {
            label: label.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }

    pub fn recorded(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl GarminApi for FixtureApi {
    async fn get_sleep_data(&self, date: &str) -> GarminResult<Value> {
        self.record(format!("sleep {date}"));
        Ok(sleep_fixture())
    }

    async fn get_daily_steps(&self, start: &str, end: &str) -> GarminResult<Value> {
        self.record(format!("steps {start} {end}"));
        Ok(steps_fixture())
    }

    async fn get_activities(&self, start: u32, limit: u32) -> GarminResult<Value> {
        self.record(format!("activities {start} {limit}"));
        Ok(activities_fixture(limit))
    }

    async fn get_rhr_day(&self, date: &str) -> GarminResult<Value> {
        self.record(format!("rhr {date}"));
        Ok(heart_rate_fixture())
    }

    async fn get_stress_data(&self, date: &str) -> GarminResult<Value> {
        self.record(format!("stress {date}"));
        if date == "1999-12-31" {
            return Err(GarminError::TooManyRequests("429 Too Many Requests".into()));
        }
        Ok(stress_fixture())
    }

    async fn get_body_battery(&self, start: &str, end: Option<&str>) -> GarminResult<Value> {
        self.record(format!("body_battery {start} {}", end.unwrap_or(start)));
        Ok(body_battery_fixture())
    }
}

/// MFA prompt with a fixed answer that counts how often it was asked
pub struct CountingPrompt {
    pub code: String,
    pub asked: AtomicUsize,
}

impl CountingPrompt {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            asked: AtomicUsize::new(0),
        }
    }

    pub fn times_asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MfaPrompt for CountingPrompt {
    async fn prompt_code(&self) -> GarminResult<String> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.code.clone())
    }
}

/// What the fake identity service does on credential login
pub enum LoginBehavior {
    /// Accept these credentials and this MFA code
    Accept {
        email: String,
        password: String,
        mfa_code: String,
    },
    /// Fail with an error built by this function
    Fail(fn() -> GarminError),
}

/// Connector that restores sessions from real token files and logs in
/// against an in-memory account
pub struct FakeConnector {
    pub login: LoginBehavior,
    pub login_attempts: AtomicUsize,
}

impl FakeConnector {
    pub fn accepting(email: &str, password: &str, mfa_code: &str) -> Self {
        Self {
            login: LoginBehavior::Accept {
                email: email.into(),
                password: password.into(),
                mfa_code: mfa_code.into(),
            },
            login_attempts: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: fn() -> GarminError) -> Self {
        Self {
            login: LoginBehavior::Fail(error),
            login_attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.login_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    type Handle = FixtureApi;

    async fn resume(&self, tokenstore: &str) -> GarminResult<FixtureApi> {
        let tokens = TokenSource::resolve(tokenstore).read()?;
        if tokens.oauth2.access_token == "revoked" {
            return Err(GarminError::Authentication("401 Unauthorized".into()));
        }
        Ok(FixtureApi::labelled(&format!(
            "cached:{}",
            tokens.oauth2.access_token
        )))
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        mfa: &dyn MfaPrompt,
    ) -> GarminResult<(FixtureApi, TokenPair)> {
        self.login_attempts.fetch_add(1, Ordering::SeqCst);
        match &self.login {
            LoginBehavior::Fail(error) => Err(error()),
            LoginBehavior::Accept {
                email: expected_email,
                password: expected_password,
                mfa_code,
            } => {
                if email != expected_email || password != expected_password {
                    return Err(GarminError::Authentication("401 Unauthorized".into()));
                }
                if mfa.prompt_code().await? != *mfa_code {
                    return Err(GarminError::Authentication("invalid MFA code".into()));
                }
                Ok((FixtureApi::labelled("fresh"), token_pair("fresh-access")))
            }
        }
    }
}
