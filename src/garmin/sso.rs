// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Garmin SSO credential login and OAuth token issuance
//!
//! The SSO widget is scraped the way the mobile app's embedded login does it:
//! fetch a CSRF token, post the credentials, optionally answer the MFA page,
//! then trade the service ticket for an OAuth1 token and that for OAuth2.

use chrono::Utc;
use regex::Regex;
use reqwest::{header, Client, Response};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::oauth1::{OAuth1Signer, OAuthConsumer};
use super::tokens::{OAuth1Token, OAuth2Token, TokenPair};
use super::{Endpoints, MfaPrompt};
use crate::constants::garmin::{
    EXCHANGE_PATH, OAUTH_USER_AGENT, PREAUTHORIZED_PATH, SSO_USER_AGENT,
};
use crate::errors::{GarminError, GarminResult};

const CSRF_PATTERN: &str = r#"name="_csrf"\s+value="(.+?)""#;
const TITLE_PATTERN: &str = r"<title>(.+?)</title>";
const TICKET_PATTERN: &str = r#"embed\?ticket=([^"]+)""#;

/// Log in with email and password, prompting for an MFA code if the account
/// requires one
pub async fn login(
    http: &Client,
    endpoints: &Endpoints,
    email: &str,
    password: &str,
    mfa: &dyn MfaPrompt,
) -> GarminResult<TokenPair> {
    let sso_embed = endpoints.sso_embed();
    let embed_params = [
        ("id", "gauth-widget"),
        ("embedWidget", "true"),
        ("gauthHost", endpoints.sso.as_str()),
    ];
    let signin_params = [
        ("id", "gauth-widget"),
        ("embedWidget", "true"),
        ("gauthHost", sso_embed.as_str()),
        ("service", sso_embed.as_str()),
        ("source", sso_embed.as_str()),
        ("redirectAfterAccountLoginUrl", sso_embed.as_str()),
        ("redirectAfterAccountCreationUrl", sso_embed.as_str()),
    ];
    let signin_url = format!("{}/signin", endpoints.sso);

    // Sets the SSO cookies
    sso_text(
        http.get(&sso_embed)
            .header(header::USER_AGENT, SSO_USER_AGENT)
            .query(&embed_params)
            .send()
            .await?,
    )
    .await?;

    let page = sso_text(
        http.get(&signin_url)
            .header(header::USER_AGENT, SSO_USER_AGENT)
            .header(header::REFERER, &sso_embed)
            .query(&signin_params)
            .send()
            .await?,
    )
    .await?;
    let csrf = capture(CSRF_PATTERN, &page, "CSRF token")?;

    let mut page = sso_text(
        http.post(&signin_url)
            .header(header::USER_AGENT, SSO_USER_AGENT)
            .header(header::REFERER, &signin_url)
            .query(&signin_params)
            .form(&[
                ("username", email),
                ("password", password),
                ("embed", "true"),
                ("_csrf", csrf.as_str()),
            ])
            .send()
            .await?,
    )
    .await?;

    let mut title = capture(TITLE_PATTERN, &page, "page title")?;
    if title.contains("MFA") {
        info!("Garmin Connect requested a multi-factor code");
        let csrf = capture(CSRF_PATTERN, &page, "CSRF token")?;
        let code = mfa.prompt_code().await?;

        page = sso_text(
            http.post(format!("{}/verifyMFA/loginEnterMfaCode", endpoints.sso))
                .header(header::USER_AGENT, SSO_USER_AGENT)
                .header(header::REFERER, &signin_url)
                .query(&signin_params)
                .form(&[
                    ("mfa-code", code.trim()),
                    ("embed", "true"),
                    ("_csrf", csrf.as_str()),
                    ("fromPage", "setupEnterMfaCode"),
                ])
                .send()
                .await?,
        )
        .await?;
        title = capture(TITLE_PATTERN, &page, "page title")?;
    }

    if title != "Success" {
        return Err(GarminError::UnexpectedResponse(format!(
            "unexpected SSO page title: {title}"
        )));
    }

    let ticket = capture(TICKET_PATTERN, &page, "service ticket")?;
    debug!("SSO login succeeded, exchanging service ticket");

    let consumer = fetch_consumer(http, endpoints).await?;
    let oauth1 = preauthorize(http, endpoints, &consumer, &ticket).await?;
    let oauth2 = exchange(http, endpoints, &consumer, &oauth1).await?;

    Ok(TokenPair { oauth1, oauth2 })
}

/// Download the OAuth consumer key and secret
pub async fn fetch_consumer(http: &Client, endpoints: &Endpoints) -> GarminResult<OAuthConsumer> {
    let response = http.get(&endpoints.consumer_url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(GarminError::Http {
            status: status.as_u16(),
            url: endpoints.consumer_url.clone(),
        });
    }
    Ok(response.json().await?)
}

async fn preauthorize(
    http: &Client,
    endpoints: &Endpoints,
    consumer: &OAuthConsumer,
    ticket: &str,
) -> GarminResult<OAuth1Token> {
    let mut url = parse_url(&format!("{}{}", endpoints.connectapi, PREAUTHORIZED_PATH))?;
    url.query_pairs_mut()
        .append_pair("ticket", ticket)
        .append_pair("login-url", &endpoints.sso_embed())
        .append_pair("accepts-mfa-tokens", "true");

    let authorization = OAuth1Signer::new(consumer).authorization_header("GET", &url, &[]);
    let body = sso_text(
        http.get(url)
            .header(header::USER_AGENT, OAUTH_USER_AGENT)
            .header(header::AUTHORIZATION, authorization)
            .send()
            .await?,
    )
    .await?;

    let mut token = OAuth1Token {
        oauth_token: String::new(),
        oauth_token_secret: String::new(),
        mfa_token: None,
        mfa_expiration_timestamp: None,
        domain: Some(endpoints.domain.clone()),
    };
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        match key.as_ref() {
            "oauth_token" => token.oauth_token = value.into_owned(),
            "oauth_token_secret" => token.oauth_token_secret = value.into_owned(),
            "mfa_token" => token.mfa_token = Some(value.into_owned()),
            "mfa_expiration_timestamp" => token.mfa_expiration_timestamp = Some(value.into_owned()),
            _ => {}
        }
    }

    if token.oauth_token.is_empty() || token.oauth_token_secret.is_empty() {
        return Err(GarminError::UnexpectedResponse(
            "preauthorized response did not contain an OAuth1 token".into(),
        ));
    }
    Ok(token)
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    scope: String,
    #[serde(default)]
    jti: String,
    token_type: String,
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token_expires_in: Option<i64>,
}

/// Trade an OAuth1 token for a fresh OAuth2 access token
pub async fn exchange(
    http: &Client,
    endpoints: &Endpoints,
    consumer: &OAuthConsumer,
    oauth1: &OAuth1Token,
) -> GarminResult<OAuth2Token> {
    let url = parse_url(&format!("{}{}", endpoints.connectapi, EXCHANGE_PATH))?;
    let form: Vec<(&str, &str)> = oauth1
        .mfa_token
        .as_deref()
        .map(|mfa_token| vec![("mfa_token", mfa_token)])
        .unwrap_or_default();

    let authorization = OAuth1Signer::new(consumer)
        .with_token(&oauth1.oauth_token, &oauth1.oauth_token_secret)
        .authorization_header("POST", &url, &form);

    let body = sso_text(
        http.post(url)
            .header(header::USER_AGENT, OAUTH_USER_AGENT)
            .header(header::AUTHORIZATION, authorization)
            .form(&form)
            .send()
            .await?,
    )
    .await?;

    let response: ExchangeResponse = serde_json::from_str(&body)?;
    let now = Utc::now().timestamp();

    Ok(OAuth2Token {
        scope: response.scope,
        jti: response.jti,
        token_type: response.token_type,
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        expires_in: response.expires_in,
        expires_at: now + response.expires_in,
        refresh_token_expires_in: response.refresh_token_expires_in,
        refresh_token_expires_at: response.refresh_token_expires_in.map(|secs| now + secs),
    })
}

async fn sso_text(response: Response) -> GarminResult<String> {
    let status = response.status();
    let url = response.url().to_string();
    if !status.is_success() {
        return Err(GarminError::from_identity_status(
            status,
            format!("{status} for {url}"),
        ));
    }
    Ok(response.text().await?)
}

fn capture(pattern: &str, haystack: &str, what: &str) -> GarminResult<String> {
    let regex = Regex::new(pattern).map_err(|e| GarminError::UnexpectedResponse(e.to_string()))?;
    regex
        .captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| GarminError::UnexpectedResponse(format!("{what} not found in SSO page")))
}

fn parse_url(raw: &str) -> GarminResult<Url> {
    Url::parse(raw).map_err(|e| GarminError::InvalidArgument(format!("{raw}: {e}")))
}
