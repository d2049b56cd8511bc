// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! OAuth session tokens and their on-disk token store
//!
//! A token store is a directory holding `oauth1_token.json` and
//! `oauth2_token.json`. The same pair can also travel as one encoded string:
//! base64 of the JSON array `[oauth1, oauth2]`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::constants::garmin::{ENCODED_TOKEN_MIN_LEN, OAUTH1_TOKEN_FILE, OAUTH2_TOKEN_FILE};
use crate::errors::{GarminError, GarminResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuth1Token {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    #[serde(default)]
    pub mfa_token: Option<String>,
    #[serde(default)]
    pub mfa_expiration_timestamp: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuth2Token {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub jti: String,
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
    #[serde(default)]
    pub refresh_token_expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token_expires_at: Option<i64>,
}

impl OAuth2Token {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now().timestamp()
    }

    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Both halves of a Garmin Connect session
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub oauth1: OAuth1Token,
    pub oauth2: OAuth2Token,
}

impl TokenPair {
    /// Write both token files into `dir`, creating it when needed
    pub fn dump(&self, dir: &Path) -> GarminResult<()> {
        fs::create_dir_all(dir)?;
        fs::write(
            dir.join(OAUTH1_TOKEN_FILE),
            serde_json::to_string_pretty(&self.oauth1)?,
        )?;
        fs::write(
            dir.join(OAUTH2_TOKEN_FILE),
            serde_json::to_string_pretty(&self.oauth2)?,
        )?;
        Ok(())
    }

    /// Read both token files from `dir`
    pub fn load(dir: &Path) -> GarminResult<Self> {
        Ok(Self {
            oauth1: read_token_file(&dir.join(OAUTH1_TOKEN_FILE))?,
            oauth2: read_token_file(&dir.join(OAUTH2_TOKEN_FILE))?,
        })
    }

    /// Encode the pair as a single base64 string
    pub fn dumps(&self) -> GarminResult<String> {
        let json = serde_json::to_string(&(&self.oauth1, &self.oauth2))?;
        Ok(STANDARD.encode(json))
    }

    pub fn loads(encoded: &str) -> GarminResult<Self> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| GarminError::TokenStore(format!("invalid base64: {e}")))?;
        let (oauth1, oauth2): (OAuth1Token, OAuth2Token) = serde_json::from_slice(&raw)?;
        Ok(Self { oauth1, oauth2 })
    }
}

fn read_token_file<T: for<'de> Deserialize<'de>>(path: &Path) -> GarminResult<T> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => GarminError::TokenFileNotFound {
            path: path.to_path_buf(),
        },
        _ => GarminError::Io(e),
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Where a cached session is restored from
#[derive(Debug, Clone, PartialEq)]
pub enum TokenSource {
    Directory(PathBuf),
    Encoded(String),
}

impl TokenSource {
    /// Long token store values are an encoded session rather than a path
    pub fn resolve(tokenstore: &str) -> Self {
        if tokenstore.len() > ENCODED_TOKEN_MIN_LEN {
            Self::Encoded(tokenstore.to_string())
        } else {
            Self::Directory(crate::config::expand_home(tokenstore))
        }
    }

    pub fn read(&self) -> GarminResult<TokenPair> {
        match self {
            Self::Directory(dir) => TokenPair::load(dir),
            Self::Encoded(encoded) => TokenPair::loads(encoded),
        }
    }
}

/// Write the encoded session to a plain text file
pub fn write_encoded(path: &Path, encoded: &str) -> GarminResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, encoded)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_pair() -> TokenPair {
        TokenPair {
            oauth1: OAuth1Token {
                oauth_token: "oauth1-token".into(),
                oauth_token_secret: "oauth1-secret".into(),
                mfa_token: None,
                mfa_expiration_timestamp: None,
                domain: Some("garmin.com".into()),
            },
            oauth2: OAuth2Token {
                scope: "CONNECT_READ".into(),
                jti: "jti-1".into(),
                token_type: "Bearer".into(),
                access_token: "access-1".into(),
                refresh_token: "refresh-1".into(),
                expires_in: 3600,
                expires_at: Utc::now().timestamp() + 3600,
                refresh_token_expires_in: Some(7200),
                refresh_token_expires_at: Some(Utc::now().timestamp() + 7200),
            },
        }
    }

    #[test]
    fn test_dump_writes_both_files() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = temp_dir.path().join("nested").join(".garminconnect");
        let pair = sample_pair();

        pair.dump(&store).expect("dump");

        assert!(store.join(OAUTH1_TOKEN_FILE).exists());
        assert!(store.join(OAUTH2_TOKEN_FILE).exists());
        assert_eq!(TokenPair::load(&store).expect("load"), pair);
    }

    #[test]
    fn test_load_missing_directory() {
        let temp_dir = TempDir::new().expect("temp dir");
        let err = TokenPair::load(&temp_dir.path().join("absent")).unwrap_err();

        match err {
            GarminError::TokenFileNotFound { path } => {
                assert!(path.ends_with(OAUTH1_TOKEN_FILE));
            }
            other => panic!("expected TokenFileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_load_corrupt_file_is_not_a_stale_session() {
        let temp_dir = TempDir::new().expect("temp dir");
        fs::write(temp_dir.path().join(OAUTH1_TOKEN_FILE), "{not json").expect("write");

        let err = TokenPair::load(temp_dir.path()).unwrap_err();
        assert!(matches!(err, GarminError::Json(_)));
        assert!(!err.is_stale_session());
    }

    #[test]
    fn test_encoded_form_is_base64_json_array() {
        let pair = sample_pair();
        let encoded = pair.dumps().expect("dumps");

        let raw = STANDARD.decode(&encoded).expect("base64");
        let value: serde_json::Value = serde_json::from_slice(&raw).expect("json");
        assert_eq!(value[0]["oauth_token"], "oauth1-token");
        assert_eq!(value[1]["access_token"], "access-1");

        assert_eq!(TokenPair::loads(&encoded).expect("loads"), pair);
    }

    #[test]
    fn test_loads_rejects_garbage() {
        assert!(matches!(
            TokenPair::loads("%%% not base64 %%%"),
            Err(GarminError::TokenStore(_))
        ));
    }

    #[test]
    fn test_token_source_resolution() {
        assert_eq!(
            TokenSource::resolve("/var/lib/garmin"),
            TokenSource::Directory(PathBuf::from("/var/lib/garmin"))
        );

        let long = "A".repeat(ENCODED_TOKEN_MIN_LEN + 1);
        assert_eq!(TokenSource::resolve(&long), TokenSource::Encoded(long.clone()));
    }

    #[test]
    fn test_expiry() {
        let mut pair = sample_pair();
        assert!(!pair.oauth2.is_expired());
        pair.oauth2.expires_at = Utc::now().timestamp() - 1;
        assert!(pair.oauth2.is_expired());
        assert_eq!(pair.oauth2.authorization_header(), "Bearer access-1");
    }
}
