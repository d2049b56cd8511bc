// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use garmin_mcp_server::config::Config;
use garmin_mcp_server::garmin::{ConsoleMfaPrompt, GarminConnector};
use garmin_mcp_server::logging;
use garmin_mcp_server::mcp::McpServer;
use garmin_mcp_server::session::{init_api, SessionState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serve over TCP on this port instead of stdio
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file; the environment is used when absent
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config)?;
    logging::init_from_env()?;

    info!(
        "Starting Garmin MCP server for {}",
        config.garmin.email.as_deref().unwrap_or("<unset>")
    );

    let connector = GarminConnector::for_domain(config.garmin.domain())
        .context("Failed to build HTTP client")?;
    let handle = init_api(&connector, &config.garmin, &ConsoleMfaPrompt)
        .await
        .context("Garmin Connect login aborted")?;

    let session = SessionState::from(handle);
    if !session.is_authenticated() {
        warn!("No Garmin Connect session; tool calls will report the session as unavailable");
    }

    let server = McpServer::new(session);
    match args.port {
        Some(port) => server.run_tcp(port).await,
        None => server.run_stdio().await,
    }
}
