//! Shardlink - cluster management channel node daemon
//!
//! Usage:
//!   shardlink [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>        Configuration file path
//!   -b, --bind <ADDR>          Host connector bind address
//!   -m, --management-bind <ADDR>  Cluster management bind address
//!   -n, --node-id <ID>         Node identifier
//!   -l, --log-level            Log level (error, warn, info, debug, trace)
//!   -h, --help                 Print help

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use shardlink::cluster::{DefaultRouter, ManagedClusterConnector};
use shardlink::config::Config;
use shardlink::metrics::{Metrics, MetricsServer};

/// Log level for CLI
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    #[default]
    Info,
    /// Debug messages
    Debug,
    /// Trace messages (very verbose)
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Shardlink - cluster management channel node
#[derive(Parser, Debug)]
#[command(name = "shardlink")]
#[command(author = "Shardlink Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Cluster management channel node for secure datagram connectors")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host connector bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Cluster management bind address
    #[arg(short, long)]
    management_bind: Option<SocketAddr>,

    /// Node identifier
    #[arg(short, long)]
    node_id: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration file if specified, otherwise use defaults
    let mut file_config = if let Some(config_path) = &args.config {
        match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Error loading config file: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Setup logging - CLI overrides config, config overrides default (info)
    let log_level = args.log_level.unwrap_or_else(|| {
        match file_config.log.level.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    });

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level.to_tracing_level())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(path) = &args.config {
        info!("Loaded configuration from {:?}", path);
    }

    // CLI args override file config
    if let Some(bind) = args.bind {
        file_config.connector.bind = bind;
    }
    if let Some(management_bind) = args.management_bind {
        file_config.cluster.management_bind = management_bind;
    }
    if let Some(node_id) = args.node_id {
        file_config.cluster.node_id = Some(node_id);
    }

    // The standalone daemon carries no secure datagram transport; it can
    // only run the plain management channel. Embedders wire a
    // SecureTransportFactory in through the library API.
    if file_config.cluster.secure_identity.is_some() {
        eprintln!(
            "secure_identity is configured, but the standalone daemon has no secure \
             transport; embed the library and provide a SecureTransportFactory"
        );
        std::process::exit(1);
    }

    info!("Starting shardlink cluster node");
    info!("  Host bind address: {}", file_config.connector.bind);
    info!(
        "  Management bind address: {}",
        file_config.cluster.management_bind
    );
    info!("  Node id: {}", file_config.cluster.node_id());
    info!("  MTU: {}", file_config.connector.mtu);

    // Setup metrics if configured
    let health = if file_config.metrics.enabled {
        let metrics = Arc::new(Metrics::new());
        info!("  Metrics: enabled (http://{})", file_config.metrics.bind);

        let metrics_server = MetricsServer::new(metrics.clone(), file_config.metrics.bind);
        tokio::spawn(async move {
            if let Err(e) = metrics_server.run().await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
        Some(metrics)
    } else {
        info!("  Metrics: disabled");
        None
    };

    let connector = ManagedClusterConnector::new(
        &file_config.connector,
        &mut file_config.cluster,
        Arc::new(DefaultRouter),
        None,
        health
            .clone()
            .map(|m| m as Arc<dyn shardlink::ClusterHealth>),
    )?;

    connector.start().await?;
    if let Some(metrics) = &health {
        metrics.connector_running.set(1);
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    connector.stop().await;
    if let Some(metrics) = &health {
        metrics.connector_running.set(0);
    }

    Ok(())
}
