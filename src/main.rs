// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Main entry point for the mcp-link server and client
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use mcp_link::config::{duration_from_secs, Config};
use mcp_link::mcp::{Address, McpClient, McpServer};
use mcp_link::registry::{EchoTool, StaticToolRegistry};

#[derive(Parser, Debug)]
#[command(
    name = "mcp-link",
    version,
    about = "JSON-RPC 2.0 MCP transport over Unix sockets and TCP",
    long_about = None
)]
struct Cli {
    /// Per-call timeout in seconds (overrides MCP_LINK_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the echo tool and the given files until Ctrl+C
    Serve {
        /// Address to listen on (e.g. "unix:/tmp/mcp.sock", "tcp:127.0.0.1:7000"); repeatable
        #[arg(short, long)]
        listen: Vec<String>,

        /// File to expose as a text/plain resource; repeatable
        #[arg(short, long)]
        resource: Vec<PathBuf>,
    },
    /// Initialize against a server, issue one call and print its result
    Call {
        /// Address of the server
        #[arg(short, long)]
        connect: Option<String>,

        /// Method name (e.g. "tools/list")
        method: String,

        /// JSON params for the call
        #[arg(short, long)]
        params: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    install_panic_hook();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        eprintln!(
            "Warning: Failed to load config from env, using defaults: {}",
            e
        );
        Config::default()
    });

    if let Some(secs) = cli.timeout {
        let Some(timeout) = duration_from_secs(secs) else {
            bail!("--timeout must be a positive number of seconds");
        };
        config.request_timeout = timeout;
    }

    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to init tracing: {}", e);
    }

    match cli.command {
        Command::Serve { listen, resource } => serve(&config, listen, resource).await,
        Command::Call {
            connect,
            method,
            params,
        } => call(&config, connect, &method, params).await,
    }
}

async fn serve(
    config: &Config,
    listen: Vec<String>,
    resources: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let mut addresses = listen
        .iter()
        .map(|s| s.parse::<Address>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid --listen address")?;
    if addresses.is_empty() {
        addresses.extend(config.address.iter().cloned());
        addresses.extend(config.tcp_address.iter().cloned());
    }
    if addresses.is_empty() {
        bail!("Nothing to listen on: pass --listen or set MCP_LINK_ADDRESS");
    }

    let tools = StaticToolRegistry::new().with_tool(EchoTool::default());
    let server = McpServer::new(
        config.server_name.clone(),
        env!("CARGO_PKG_VERSION"),
        Arc::new(tools),
    );

    for path in resources {
        let full = std::fs::canonicalize(&path)
            .with_context(|| format!("Resource {} not found", path.display()))?;
        let name = full
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| full.display().to_string());
        server.register_resource(
            format!("file://{}", full.display()),
            name,
            format!("File {}", full.display()),
            "text/plain",
            BTreeMap::new(),
        );
    }

    for address in &addresses {
        server
            .listen(address)
            .await
            .with_context(|| format!("Failed to listen on {}", address))?;
    }

    info!("Starting mcp-link server {}", config.server_name);
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for Ctrl+C")?;

    info!("Shutting down (grace {:?})", config.shutdown_grace);
    server.shutdown(config.shutdown_grace).await;
    Ok(())
}

async fn call(
    config: &Config,
    connect: Option<String>,
    method: &str,
    params: Option<String>,
) -> anyhow::Result<()> {
    let address = match connect {
        Some(s) => s.parse::<Address>().context("Invalid --connect address")?,
        None => config
            .address
            .clone()
            .or_else(|| config.tcp_address.clone())
            .context("Nothing to connect to: pass --connect or set MCP_LINK_ADDRESS")?,
    };
    let params: Option<Value> = params
        .map(|p| serde_json::from_str(&p))
        .transpose()
        .context("--params is not valid JSON")?;

    let client = McpClient::connect(&address)
        .await
        .with_context(|| format!("Failed to connect to {}", address))?
        .with_timeout(config.request_timeout);

    if let Err(e) = client
        .initialize(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        .await
    {
        warn!("Handshake failed, calling anyway: {}", e);
    }

    let result = client.call(method, params).await;
    client.close().await;
    let result = result.with_context(|| format!("Call to {} failed", method))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC: {} at {}", message, location);
    }));
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("mcp_link=debug,info"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        subscriber.json().try_init()?;
    } else {
        subscriber.try_init()?;
    }

    Ok(())
}
