// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HomeHub Gateway
//!
//! # Usage
//!
//! ```bash
//! # Start on the default port with a hub code from the environment
//! HOMEHUB_HUB_CODE=s3cret homehub-gateway
//!
//! # Using a configuration file, overriding the port
//! homehub-gateway --config homehub.toml --port 9000
//!
//! # Generate an example configuration file
//! homehub-gateway gen-config --output homehub.toml
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use homehub_gateway::config::GatewayConfig;
use homehub_gateway::{build_router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// HomeHub device gateway
#[derive(Parser, Debug)]
#[command(name = "homehub-gateway")]
#[command(about = "HomeHub Gateway - device registration and service call forwarding")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Shared registration secret
    #[arg(long, env = "HOMEHUB_HUB_CODE", hide_env_values = true)]
    hub_code: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "homehub.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Args {
    fn build_config(&self) -> anyhow::Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => GatewayConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ref bind) = self.bind {
            config.bind = bind.clone();
        }
        if let Some(ref database) = self.database {
            config.database = database.clone();
        }
        if let Some(ref hub_code) = self.hub_code {
            config.hub_code = hub_code.clone();
        }
        if let Some(ref log_level) = self.log_level {
            config.log_level = log_level.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();

    if let Some(cmd) = args.command.take() {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let config = args.build_config()?;

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    config.validate()?;

    let state = Arc::new(AppState::from_config(&config)?);
    let app = build_router(state);

    let addr = config.listen_addr();
    info!("HomeHub Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP server: http://{}", addr);
    info!("Database: {}", config.database.display());
    info!("Forward mode: {:?}", config.dispatch.mode);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received, stopping server...");
    })
    .await
    .context("Server error")?;

    info!("Gateway stopped");
    Ok(())
}

fn cmd_gen_config(output: PathBuf) -> anyhow::Result<()> {
    let example = GatewayConfig {
        hub_code: "change-me".to_string(),
        ..Default::default()
    };
    let content = toml::to_string_pretty(&example)?;
    std::fs::write(&output, content)?;
    println!("Generated configuration: {}", output.display());
    Ok(())
}

fn cmd_validate(path: PathBuf) -> anyhow::Result<()> {
    let config = GatewayConfig::from_file(&path)?;
    config.validate()?;
    println!("Configuration is valid: {}", path.display());
    println!("  Listen:   {}", config.listen_addr());
    println!("  Database: {}", config.database.display());
    println!("  Mode:     {:?}", config.dispatch.mode);
    Ok(())
}
