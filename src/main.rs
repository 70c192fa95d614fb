//! OnlineBank administration service.
//!
//! # Architecture Overview
//!
//! ```text
//!   HTTP client ──▶ http (axum) ──▶ clients::ClientService ──▶ ClientStore
//!                     │                                          │
//!                     │ /health/*                                ▼
//!                     ▼                                   db::ResilientPool ──▶ Postgres
//!             health::HealthAggregator                           ▲
//!                     │                                          │ availability flag
//!                     ├── db::Availability ◀──── db::ConnectionProbe (background)
//!                     ├── RuntimeProbe (sysinfo)          └── SchemaBootstrapper
//!                     └── MetricsRecorder ◀── API timing middleware
//! ```
//!
//! The service starts and serves with the database down; health reports
//! DEGRADED until the probe sees it.

use clap::Parser;
use std::path::PathBuf;

use onlinebank::config::{self, validation::validate_config, ConfigError};
use onlinebank::health::StartTime;
use onlinebank::lifecycle;
use onlinebank::observability::init_logging;

#[derive(Parser)]
#[command(name = "onlinebank")]
#[command(about = "Banking client administration service", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults plus environment when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let started = StartTime::now();
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::load_from_env()?,
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    init_logging(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        probe_interval_ms = config.database.probe_interval_ms,
        "Configuration loaded"
    );

    lifecycle::run(config, started).await?;
    Ok(())
}
