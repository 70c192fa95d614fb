//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Start the database probe (first probe runs immediately)
//! - Bind the listener and serve until shutdown
//! - Close the pool once the server has drained
//!
//! # Design Decisions
//! - Nothing here waits on the database: the pool is lazy and the probe
//!   runs in the background
//! - Configuration errors are fatal, database outages are not
//! - Listener binds last (traffic only once services exist)

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::clients::{ClientSeeder, ClientService, ClientStore, PgClientStore};
use crate::config::{AppConfig, SchemaConfig};
use crate::db::{
    build_pool, Availability, ConnectionProbe, DbError, PgDatabase, PgInspector, ResilientPool,
    SchemaBootstrapper, DEFAULT_SCRIPT,
};
use crate::health::{HealthAggregator, StartTime, SysinfoRuntimeProbe};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::metrics::{init_metrics, MetricsRecorder};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read schema script {path}: {source}")]
    Script {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid address '{0}'")]
    Address(String),

    #[error("database pool: {0}")]
    Database(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wired services, ready to serve.
pub struct Application {
    pub state: AppState,
    pub pool: Arc<ResilientPool<PgDatabase>>,
}

fn load_script(config: &SchemaConfig) -> Result<String, StartupError> {
    match &config.script_path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| StartupError::Script {
            path: path.clone(),
            source,
        }),
        None => Ok(DEFAULT_SCRIPT.to_string()),
    }
}

/// Build every service and start the probe. Must run inside a Tokio runtime.
pub fn build(config: &AppConfig, started: StartTime) -> Result<Application, StartupError> {
    let availability = Arc::new(Availability::new());
    let database = build_pool(&config.database)?;
    let pool = Arc::new(ResilientPool::new(database.clone(), availability.clone()));

    let bootstrapper = SchemaBootstrapper::new(
        Arc::new(database.clone()),
        availability.clone(),
        config.schema.table.clone(),
        load_script(&config.schema)?,
    )
    .with_delimiter(config.schema.delimiter.clone());

    let store: Arc<dyn ClientStore> = Arc::new(PgClientStore::new(pool.clone()));
    let seeder = ClientSeeder::new(store.clone(), availability.clone(), config.seed.clone());

    let probe = ConnectionProbe::new(
        Arc::new(database),
        availability.clone(),
        config.database.validation_timeout(),
        config.database.probe_interval(),
    )
    .with_bootstrapper(Arc::new(bootstrapper))
    .with_listener(Arc::new(seeder));
    pool.attach_probe(probe.spawn());

    tracing::info!(
        interval_ms = config.database.probe_interval_ms,
        validation_timeout_ms = config.database.validation_timeout_ms,
        max_pool_size = config.database.max_pool_size,
        "Database probe started"
    );

    let metrics = Arc::new(MetricsRecorder::new(config.metrics.sample_capacity));
    let inspector = PgInspector::new(pool.clone(), config.schema.table.clone());
    let health = HealthAggregator::new(
        availability,
        Arc::new(SysinfoRuntimeProbe::new(config.health.memory_limit_bytes)),
        metrics.clone(),
        config.health.clone(),
        config.application.clone(),
    )
    .with_inspector(Arc::new(inspector))
    .with_start_time(started);

    let state = AppState {
        health: Arc::new(health),
        metrics,
        clients: ClientService::new(store),
    };

    Ok(Application { state, pool })
}

/// Run the service until SIGINT/SIGTERM.
pub async fn run(config: AppConfig, started: StartTime) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());
    run_until(config, shutdown, started).await
}

/// Run the service until `shutdown` is triggered.
pub async fn run_until(
    config: AppConfig,
    shutdown: Shutdown,
    started: StartTime,
) -> Result<(), StartupError> {
    tracing::info!(
        application = %config.application.name,
        profile = %config.application.profile,
        version = env!("CARGO_PKG_VERSION"),
        "Starting"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address(config.observability.metrics_address.clone()))?;
        init_metrics(addr);
    }

    let app = build(&config, started)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config, app.state);
    let served = server.run(listener, shutdown.signalled()).await;

    app.pool.close().await;
    tracing::info!("Shutdown complete");
    served.map_err(StartupError::from)
}
