// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Garmin MCP Server
//!
//! A Model Context Protocol (MCP) server that exposes a Garmin Connect
//! account to AI assistants. It logs in once at startup, caches the OAuth
//! session on disk, and forwards sleep, steps, activity, heart rate, stress
//! and body battery queries to Garmin Connect.
//!
//! ## Quick Start
//!
//! 1. Set `GARMIN_EMAIL` and `GARMIN_PASSWORD` (or put them in `.env`)
//! 2. Start `garmin-mcp-server`; the first run asks for an MFA code if the
//!    account needs one and stores tokens in `~/.garminconnect`
//! 3. Connect from Claude or other MCP clients over stdio
//!
//! ## Architecture
//!
//! - **Session**: two-stage login (cached tokens, then credentials)
//! - **Garmin**: Garmin Connect client, SSO login and token store
//! - **MCP**: JSON-RPC server and the tool surface
//! - **Config**: environment and TOML configuration
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use garmin_mcp_server::config::Config;
//! use garmin_mcp_server::garmin::{ConsoleMfaPrompt, GarminConnector};
//! use garmin_mcp_server::mcp::McpServer;
//! use garmin_mcp_server::session::{init_api, SessionState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let connector = GarminConnector::for_domain(config.garmin.domain())?;
//!
//!     let handle = init_api(&connector, &config.garmin, &ConsoleMfaPrompt).await?;
//!     let server = McpServer::new(SessionState::from(handle));
//!
//!     server.run_stdio().await
//! }
//! ```

/// Application constants and environment variable names
pub mod constants;

/// Configuration management
pub mod config;

/// Error types shared by the client and the bootstrapper
pub mod errors;

/// Garmin Connect client, SSO login and token store
pub mod garmin;

/// Session bootstrap and the injected session state
pub mod session;

/// Model Context Protocol server implementation
pub mod mcp;

/// Structured logging to stderr
pub mod logging;
