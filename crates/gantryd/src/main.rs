//! gantryd: serves a gateway application over non-blocking TCP.
//!
//! # Usage
//!
//! ```text
//! gantryd serve --bind 127.0.0.1:8080 --app file --root ./public
//! gantryd config --config gantry.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use gantry_core::GantryConfig;
use gantry_gateway::SendLimits;
use gantryd::{AppKind, ConnectionContext, GatewayServer, apps};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gantryd", about = "Gantry gateway daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve a built-in application.
    Serve {
        /// Path to a gantry.toml file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address to listen on; overrides `server.bind`.
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Application to serve.
        #[arg(long, value_enum, default_value = "hello")]
        app: AppKind,

        /// Document root for the `file` application.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Print the effective configuration as TOML.
    Config {
        /// Path to a gantry.toml file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            bind,
            app,
            root,
        } => {
            let config = load_config(config.as_deref())?;
            init_tracing(&config);
            run_serve(config, bind, app, root).await
        }
        Command::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GantryConfig> {
    match path {
        Some(path) => GantryConfig::from_file(path),
        None => Ok(GantryConfig::default()),
    }
}

fn init_tracing(config: &GantryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_serve(
    config: GantryConfig,
    bind: Option<SocketAddr>,
    app: AppKind,
    root: PathBuf,
) -> anyhow::Result<()> {
    let bind_addr = match bind {
        Some(addr) => addr,
        None => config
            .server
            .bind
            .parse()
            .with_context(|| format!("invalid server.bind: {}", config.server.bind))?,
    };

    let limits = SendLimits {
        turn_budget: config.response.turn_budget,
        file_chunk_size: config.response.file_chunk_size,
    };
    info!(?app, turn_budget = limits.turn_budget, "gantry daemon starting");

    let ctx = ConnectionContext {
        app: apps::build(app, &root),
        limits,
        max_request_head: config.server.max_request_head,
    };
    let server = GatewayServer::new(bind_addr, ctx);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => warn!(error = %e, "failed to listen for ctrl-c; shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    server.serve(shutdown_rx).await?;

    info!("gantry daemon stopped");
    Ok(())
}
