// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration management for the Garmin MCP server

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{env_config, garmin};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub garmin: GarminConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GarminConfig {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_tokenstore")]
    pub tokenstore: String,
    #[serde(default = "default_tokenstore_base64")]
    pub tokenstore_base64: String,
    #[serde(default)]
    pub is_cn: bool,
}

fn default_tokenstore() -> String {
    env_config::DEFAULT_TOKEN_STORE.to_string()
}

fn default_tokenstore_base64() -> String {
    env_config::DEFAULT_TOKEN_STORE_BASE64.to_string()
}

impl Default for GarminConfig {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            tokenstore: default_tokenstore(),
            tokenstore_base64: default_tokenstore_base64(),
            is_cn: false,
        }
    }
}

impl Config {
    /// Load from a TOML file when one exists at `path`, otherwise from the
    /// environment (after reading `.env`)
    pub fn load(path: Option<String>) -> Result<Self> {
        if let Some(config_path) = path.as_deref().filter(|p| Path::new(p).exists()) {
            let content = fs::read_to_string(config_path).context("Failed to read config file")?;
            return toml::from_str(&content).context("Failed to parse config file");
        }

        dotenv::dotenv().ok();
        Ok(Self::from_env())
    }

    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Config {
            garmin: GarminConfig {
                email: var(env_config::GARMIN_EMAIL),
                password: var(env_config::GARMIN_PASSWORD),
                tokenstore: var(env_config::GARMIN_TOKEN_STORE).unwrap_or_else(default_tokenstore),
                tokenstore_base64: var(env_config::GARMIN_TOKENS_BASE64)
                    .unwrap_or_else(default_tokenstore_base64),
                is_cn: var(env_config::GARMIN_IS_CN)
                    .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false),
            },
        }
    }
}

impl GarminConfig {
    /// Garmin Connect domain for this account region
    pub fn domain(&self) -> &'static str {
        if self.is_cn {
            garmin::DOMAIN_CN
        } else {
            garmin::DOMAIN
        }
    }

    pub fn tokenstore_base64_path(&self) -> PathBuf {
        expand_home(&self.tokenstore_base64)
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_temp_config_file(content: &str) -> (TempDir, String) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, content).expect("Failed to write temp config");
        (temp_dir, config_path.to_string_lossy().to_string())
    }

    #[test]
    fn test_default_paths() {
        let config = GarminConfig::default();
        assert_eq!(config.tokenstore, "~/.garminconnect");
        assert_eq!(config.tokenstore_base64, "~/.garminconnect_base64");
        assert_eq!(config.domain(), "garmin.com");
        assert!(config.email.is_none());
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().expect("home dir");
        assert_eq!(expand_home("~/.garminconnect"), home.join(".garminconnect"));
        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("/var/tokens"), PathBuf::from("/var/tokens"));
        assert_eq!(expand_home("relative/~x"), PathBuf::from("relative/~x"));
    }

    #[test]
    fn test_config_load_from_file() {
        let (_temp_dir, config_path) = create_temp_config_file(
            r#"
[garmin]
email = "runner@example.com"
password = "hunter2"
tokenstore = "/tmp/garmin-tokens"
is_cn = true
"#,
        );

        let config = Config::load(Some(config_path)).expect("Failed to load config");

        assert_eq!(config.garmin.email.as_deref(), Some("runner@example.com"));
        assert_eq!(config.garmin.password.as_deref(), Some("hunter2"));
        assert_eq!(config.garmin.tokenstore, "/tmp/garmin-tokens");
        assert_eq!(config.garmin.tokenstore_base64, "~/.garminconnect_base64");
        assert_eq!(config.garmin.domain(), "garmin.cn");
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let (_temp_dir, config_path) = create_temp_config_file("this is not valid toml [[[");

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }
}
