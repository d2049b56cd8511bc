// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Garmin Connect tool calls
//!
//! Each tool forwards to one [`GarminApi`] query and hands back what the
//! account API returned.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::constants::errors::{
    ERROR_INTERNAL_ERROR, ERROR_INVALID_PARAMS, ERROR_SESSION_UNAVAILABLE,
};
use crate::errors::GarminError;
use crate::garmin::GarminApi;
use crate::session::SessionState;

pub const FETCH_SLEEP_DATA: &str = "fetch_sleep_data";
/// Steps over a date range. The name is what clients already call.
pub const FETCH_STEPS_DATA: &str = "fetch_sleps_data";
pub const FETCH_ACTIVITIES_DATA: &str = "fetch_activities_data";
pub const FETCH_HEART_RATE_DATA: &str = "fetch_heart_rate_data";
pub const FETCH_STRESS_DATA: &str = "fetch_stress_data";
pub const FETCH_BODY_BATTERY_DATA: &str = "fetch_body_battery_data";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidParams(String),

    #[error("Garmin Connect session unavailable: login failed at startup")]
    SessionUnavailable,

    #[error("Garmin Connect request failed: {0}")]
    Upstream(#[from] GarminError),
}

impl ToolError {
    /// JSON-RPC error code reported for this failure
    pub fn code(&self) -> i32 {
        match self {
            Self::UnknownTool(_) | Self::InvalidParams(_) => ERROR_INVALID_PARAMS,
            Self::SessionUnavailable => ERROR_SESSION_UNAVAILABLE,
            Self::Upstream(GarminError::InvalidArgument(_)) => ERROR_INVALID_PARAMS,
            Self::Upstream(_) => ERROR_INTERNAL_ERROR,
        }
    }
}

/// A parsed `tools/call` request
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    FetchSleepData { date: String },
    FetchStepsData { date_from: String, date_to: String },
    FetchActivitiesData { num_activities: u32 },
    FetchHeartRateData { date: String },
    FetchStressData { date: String },
    FetchBodyBatteryData { start_date: String, end_date: String },
}

impl ToolCall {
    pub fn parse(name: &str, args: &Value) -> Result<Self, ToolError> {
        let call = match name {
            FETCH_SLEEP_DATA => Self::FetchSleepData {
                date: string_arg(args, "date")?,
            },
            FETCH_STEPS_DATA => Self::FetchStepsData {
                date_from: string_arg(args, "date_from")?,
                date_to: string_arg(args, "date_to")?,
            },
            FETCH_ACTIVITIES_DATA => Self::FetchActivitiesData {
                num_activities: count_arg(args, "num_activities")?,
            },
            FETCH_HEART_RATE_DATA => Self::FetchHeartRateData {
                date: string_arg(args, "date")?,
            },
            FETCH_STRESS_DATA => Self::FetchStressData {
                date: string_arg(args, "date")?,
            },
            FETCH_BODY_BATTERY_DATA => Self::FetchBodyBatteryData {
                start_date: string_arg(args, "start_date")?,
                end_date: string_arg(args, "end_date")?,
            },
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(call)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchSleepData { .. } => FETCH_SLEEP_DATA,
            Self::FetchStepsData { .. } => FETCH_STEPS_DATA,
            Self::FetchActivitiesData { .. } => FETCH_ACTIVITIES_DATA,
            Self::FetchHeartRateData { .. } => FETCH_HEART_RATE_DATA,
            Self::FetchStressData { .. } => FETCH_STRESS_DATA,
            Self::FetchBodyBatteryData { .. } => FETCH_BODY_BATTERY_DATA,
        }
    }

    /// Run the call, checking for a live session before touching the API
    pub async fn execute(&self, session: &SessionState) -> Result<Value, ToolError> {
        let api = session.api().ok_or(ToolError::SessionUnavailable)?;
        debug!(tool = self.name(), "Forwarding tool call to Garmin Connect");
        self.forward(api.as_ref()).await
    }

    async fn forward(&self, api: &dyn GarminApi) -> Result<Value, ToolError> {
        let value = match self {
            Self::FetchSleepData { date } => api.get_sleep_data(date).await?,
            Self::FetchStepsData { date_from, date_to } => {
                api.get_daily_steps(date_from, date_to).await?
            }
            Self::FetchActivitiesData { num_activities } => {
                api.get_activities(0, *num_activities).await?
            }
            Self::FetchHeartRateData { date } => api.get_rhr_day(date).await?,
            Self::FetchStressData { date } => api.get_stress_data(date).await?,
            Self::FetchBodyBatteryData {
                start_date,
                end_date,
            } => {
                // The queried report is not handed back; callers get null.
                api.get_body_battery(start_date, Some(end_date)).await?;
                Value::Null
            }
        };
        Ok(value)
    }
}

fn string_arg(args: &Value, key: &str) -> Result<String, ToolError> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ToolError::InvalidParams(format!(
            "'{key}' must be a string, got {other}"
        ))),
        None => Err(ToolError::InvalidParams(format!(
            "missing required argument '{key}'"
        ))),
    }
}

/// Non-negative integer, given either as a JSON number or a numeric string
fn count_arg(args: &Value, key: &str) -> Result<u32, ToolError> {
    let invalid = || ToolError::InvalidParams(format!("'{key}' must be a non-negative integer"));
    match args.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<u32>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
        None => Err(ToolError::InvalidParams(format!(
            "missing required argument '{key}'"
        ))),
    }
}
