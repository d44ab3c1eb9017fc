//! spa-gateway
//!
//! Front-end delivery gateway for a compiled single-page application.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ net::Listener ──▶ net::ConnectionRegistry ──▶ http::HttpServer
//!                                                                   │
//!                      ┌────────────────────┬───────────────────────┼───────────────────┐
//!                      ▼                    ▼                       ▼                   ▼
//!               websocket relay       http proxy             web::StaticAssets   web::HistoryFallback
//!                      │                    │
//!                      └──────▶ upstream ◀──┘
//!
//!     lifecycle: signals / panic hook ──▶ Shutdown latch ──▶ Gateway::run drains registry
//! ```
//!
//! Configuration is resolved once: defaults, then an optional TOML file,
//! then environment variables, then command-line flags.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use spa_gateway::config::loader::{apply_env_overrides, read_config};
use spa_gateway::config::validation::validate_config;
use spa_gateway::config::{ConfigError, GatewayConfig, LogFormat};
use spa_gateway::lifecycle::{
    install_panic_hook, install_signal_handlers, Gateway, Shutdown, EXIT_FAILURE,
};
use spa_gateway::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "spa-gateway")]
#[command(about = "Serve a single-page application and proxy its API to one upstream", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    address: Option<String>,

    /// Port to bind
    #[arg(short, long)]
    port: Option<u16>,

    /// Forward API and WebSocket traffic to the upstream
    #[arg(long)]
    enable_proxy: bool,

    #[arg(long)]
    upstream_host: Option<String>,

    #[arg(long)]
    upstream_port: Option<u16>,

    /// Directory holding the compiled application
    #[arg(long)]
    web_folder: Option<PathBuf>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(address) = &self.address {
            config.server.address = address.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.enable_proxy {
            config.upstream.enable_proxy = true;
        }
        if let Some(host) = &self.upstream_host {
            config.upstream.host = host.clone();
        }
        if let Some(port) = self.upstream_port {
            config.upstream.port = port;
        }
        if let Some(folder) = &self.web_folder {
            config.web.folder = folder.clone();
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            let mut observability = GatewayConfig::default().observability;
            if let Some(format) = cli.log_format {
                observability.log_format = format;
            }
            logging::init_logging(&observability);
            tracing::error!(error = %e, "Invalid configuration");
            process::exit(EXIT_FAILURE);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "spa-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    if let Err(e) = install_signal_handlers(&shutdown) {
        tracing::error!(error = %e, "Failed to install signal handlers");
        process::exit(EXIT_FAILURE);
    }
    install_panic_hook(shutdown.clone());

    let gateway = match Gateway::bind(config).await {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start server");
            process::exit(EXIT_FAILURE);
        }
    };

    if let Ok(addr) = gateway.local_addr() {
        tracing::info!(address = %addr, "Started HTTP server");
    }

    let status = gateway.run(shutdown).await;
    process::exit(status);
}
