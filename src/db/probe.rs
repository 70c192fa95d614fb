//! Background connectivity probe.
//!
//! # Responsibilities
//! - Validate a connection on a fixed interval, bounded by a timeout
//! - Flip the shared availability flag
//! - React to edges only: cache the version and bootstrap the schema on
//!   down→up, clear the version on up→down

use async_trait::async_trait;
use metrics::gauge;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::db::availability::Availability;
use crate::db::error::DbError;
use crate::db::schema::SchemaBootstrapper;
use crate::lifecycle::shutdown::Shutdown;

/// Something that can open and validate a database connection.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    /// Validate connectivity and return the server's version string.
    async fn validate(&self) -> Result<String, DbError>;
}

/// Notified after each down→up transition, once the schema step has run.
#[async_trait]
pub trait AvailabilityListener: Send + Sync {
    async fn on_available(&self);
}

pub struct ConnectionProbe {
    source: Arc<dyn ConnectionSource>,
    availability: Arc<Availability>,
    bootstrapper: Option<Arc<SchemaBootstrapper>>,
    listeners: Vec<Arc<dyn AvailabilityListener>>,
    validation_timeout: Duration,
    interval: Duration,
}

impl ConnectionProbe {
    pub fn new(
        source: Arc<dyn ConnectionSource>,
        availability: Arc<Availability>,
        validation_timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            availability,
            bootstrapper: None,
            listeners: Vec::new(),
            validation_timeout,
            interval,
        }
    }

    pub fn with_bootstrapper(mut self, bootstrapper: Arc<SchemaBootstrapper>) -> Self {
        self.bootstrapper = Some(bootstrapper);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn AvailabilityListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// One bounded attempt. Returns the new reachability; never errors.
    pub async fn probe_once(&self) -> bool {
        let result = match time::timeout(self.validation_timeout, self.source.validate()).await {
            Ok(result) => result,
            Err(_) => Err(DbError::Timeout(self.validation_timeout)),
        };

        let reachable = result.is_ok();
        let was_reachable = self.availability.swap_available(reachable);
        gauge!("bank_database_available").set(if reachable { 1.0 } else { 0.0 });

        match (was_reachable, result) {
            (false, Ok(version)) => {
                tracing::info!(version = %version, "Database connection established");
                self.availability.set_version(version);
                self.on_up().await;
            }
            (true, Err(e)) => {
                tracing::warn!(error = %e, "Database connection lost");
                self.availability.clear_version();
            }
            (true, Ok(_)) => tracing::debug!("Database still reachable"),
            (false, Err(e)) => tracing::debug!(error = %e, "Database still unreachable"),
        }

        reachable
    }

    async fn on_up(&self) {
        if let Some(bootstrapper) = &self.bootstrapper {
            // Errors are logged and the latch re-armed inside ensure_schema.
            let _ = bootstrapper.ensure_schema().await;
        }
        for listener in &self.listeners {
            listener.on_available().await;
        }
    }

    /// Probe until shutdown. The first probe runs immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            timeout_ms = self.validation_timeout.as_millis() as u64,
            "Database probe starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Database probe received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run on a background task owned by the returned handle.
    pub fn spawn(self) -> ProbeHandle {
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        let task = tokio::spawn(self.run(rx));
        ProbeHandle {
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Stop hook for a spawned probe.
pub struct ProbeHandle {
    shutdown: Shutdown,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ProbeHandle {
    /// Signal the loop and wait for it to exit. Idempotent.
    pub async fn stop(&self) {
        self.shutdown.trigger();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Database probe task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }
}
