// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Application constants and environment variable names.

/// Protocol-related constants
pub mod protocol {
    /// MCP protocol revision spoken by this server
    pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

    /// JSON-RPC version (standard, not configurable)
    pub const JSONRPC_VERSION: &str = "2.0";

    /// Server name reported during `initialize`
    pub const SERVER_NAME: &str = "garmin-mcp-server";

    /// Human readable title, kept from the original server announcement
    pub const SERVER_TITLE: &str = "Garmin Connect MCP Server";

    /// Server version from Cargo.toml
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// JSON-RPC error codes
pub mod errors {
    pub const ERROR_PARSE: i32 = -32700;
    pub const ERROR_INVALID_REQUEST: i32 = -32600;
    pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;
    pub const ERROR_INVALID_PARAMS: i32 = -32602;
    pub const ERROR_INTERNAL_ERROR: i32 = -32603;

    /// Server-defined: no authenticated Garmin Connect session
    pub const ERROR_SESSION_UNAVAILABLE: i32 = -32001;
}

/// Environment variable names and their defaults
pub mod env_config {
    pub const GARMIN_EMAIL: &str = "GARMIN_EMAIL";
    pub const GARMIN_PASSWORD: &str = "GARMIN_PASSWORD";
    pub const GARMIN_TOKEN_STORE: &str = "GARMIN_TOKEN_STORE";
    pub const GARMIN_TOKENS_BASE64: &str = "GARMINTOKENS_BASE64";
    pub const GARMIN_IS_CN: &str = "GARMIN_IS_CN";

    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    pub const LOG_INCLUDE_LOCATION: &str = "LOG_INCLUDE_LOCATION";

    pub const DEFAULT_TOKEN_STORE: &str = "~/.garminconnect";
    pub const DEFAULT_TOKEN_STORE_BASE64: &str = "~/.garminconnect_base64";
}

/// Garmin Connect hosts, paths and client limits
pub mod garmin {
    pub const DOMAIN: &str = "garmin.com";
    pub const DOMAIN_CN: &str = "garmin.cn";

    pub const OAUTH_CONSUMER_URL: &str = "https://thegarth.s3.amazonaws.com/oauth_consumer.json";

    /// User agent used for the OAuth service endpoints
    pub const OAUTH_USER_AGENT: &str = "com.garmin.android.apps.connectmobile";

    /// User agent used for the SSO pages
    pub const SSO_USER_AGENT: &str =
        "Mozilla/5.0 (iPhone; CPU iPhone OS 16_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148";

    pub const OAUTH1_TOKEN_FILE: &str = "oauth1_token.json";
    pub const OAUTH2_TOKEN_FILE: &str = "oauth2_token.json";

    /// Token store strings longer than this are an encoded token blob, not a path
    pub const ENCODED_TOKEN_MIN_LEN: usize = 512;

    /// Longest date range the daily steps endpoint accepts in one request
    pub const MAX_STEPS_RANGE_DAYS: i64 = 28;

    pub const SLEEP_NON_SLEEP_BUFFER_MINUTES: u32 = 60;
    pub const RESTING_HEART_RATE_METRIC_ID: u32 = 60;

    pub const SOCIAL_PROFILE_PATH: &str = "/userprofile-service/socialProfile";
    pub const SLEEP_PATH: &str = "/wellness-service/wellness/dailySleepData";
    pub const STEPS_PATH: &str = "/usersummary-service/stats/steps/daily";
    pub const ACTIVITIES_PATH: &str = "/activitylist-service/activities/search/activities";
    pub const RESTING_HEART_RATE_PATH: &str = "/userstats-service/wellness/daily";
    pub const STRESS_PATH: &str = "/wellness-service/wellness/dailyStress";
    pub const BODY_BATTERY_PATH: &str = "/wellness-service/wellness/bodyBattery/reports/daily";

    pub const PREAUTHORIZED_PATH: &str = "/oauth-service/oauth/preauthorized";
    pub const EXCHANGE_PATH: &str = "/oauth-service/oauth/exchange/user/2.0";
}
