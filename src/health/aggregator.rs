//! Point-in-time health synthesis.
//!
//! Reads the availability flag, a runtime sample and the metrics recorder on
//! demand. Never talks to the probe and never waits on it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{ApplicationConfig, HealthConfig};
use crate::db::{Availability, DbError, PoolStats};
use crate::health::runtime::{RuntimeProbe, RuntimeStats};
use crate::health::status::AvailabilityState;
use crate::observability::metrics::{EndpointSnapshot, MetricsRecorder};

/// Extra database facts gathered only while the database is reachable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseDetails {
    pub schema: Option<String>,
    pub row_count: Option<i64>,
}

#[async_trait]
pub trait DatabaseInspector: Send + Sync {
    async fn details(&self) -> Result<DatabaseDetails, DbError>;

    fn pool_stats(&self) -> PoolStats;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInfo {
    pub name: String,
    pub profile: String,
    pub startup_time: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub status: &'static str,
    pub version: Option<String>,
    pub schema: Option<String>,
    pub schema_initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_count: Option<i64>,
    pub connection_pool: Option<PoolStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseInfo {
    pub fn is_up(&self) -> bool {
        self.status == "UP"
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub total_api_calls: u64,
    pub average_response_time: f64,
    pub per_endpoint: BTreeMap<String, EndpointSnapshot>,
    pub uptime: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: AvailabilityState,
    pub timestamp: DateTime<Utc>,
    pub application: ApplicationInfo,
    pub runtime: RuntimeStats,
    pub database: DatabaseInfo,
    pub metrics: MetricsReport,
    pub uptime: String,
}

/// When the process started, captured once in `main`.
#[derive(Debug, Clone, Copy)]
pub struct StartTime {
    pub instant: Instant,
    pub wall: DateTime<Utc>,
}

impl StartTime {
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }
}

impl Default for StartTime {
    fn default() -> Self {
        Self::now()
    }
}

pub struct HealthAggregator {
    availability: Arc<Availability>,
    runtime: Arc<dyn RuntimeProbe>,
    metrics: Arc<MetricsRecorder>,
    inspector: Option<Arc<dyn DatabaseInspector>>,
    config: HealthConfig,
    application: ApplicationConfig,
    started: StartTime,
}

impl HealthAggregator {
    pub fn new(
        availability: Arc<Availability>,
        runtime: Arc<dyn RuntimeProbe>,
        metrics: Arc<MetricsRecorder>,
        config: HealthConfig,
        application: ApplicationConfig,
    ) -> Self {
        Self {
            availability,
            runtime,
            metrics,
            inspector: None,
            config,
            application,
            started: StartTime::now(),
        }
    }

    /// Measure uptime from `started` instead of construction time.
    pub fn with_start_time(mut self, started: StartTime) -> Self {
        self.started = started;
        self
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn DatabaseInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn status(&self) -> AvailabilityState {
        self.status_for(&self.runtime.sample())
    }

    fn status_for(&self, runtime: &RuntimeStats) -> AvailabilityState {
        AvailabilityState::derive(
            self.availability.is_available(),
            runtime.is_healthy(self.config.heap_unhealthy_percent),
        )
    }

    /// UP or DEGRADED, or only UP with `ready_requires_database`.
    pub fn is_ready(&self) -> bool {
        let status = self.status();
        if self.config.ready_requires_database {
            status == AvailabilityState::Up
        } else {
            status.is_ready()
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.instant.elapsed()
    }

    pub fn application(&self) -> ApplicationInfo {
        ApplicationInfo {
            name: self.application.name.clone(),
            profile: self.application.profile.clone(),
            startup_time: self.started.wall,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub async fn database(&self) -> DatabaseInfo {
        let mut info = DatabaseInfo {
            status: "DOWN",
            version: None,
            schema: None,
            schema_initialized: self.availability.is_schema_initialized(),
            client_count: None,
            connection_pool: None,
            error: None,
        };

        if !self.availability.is_available() {
            info.error = Some(DbError::Unavailable.to_string());
            return info;
        }

        info.status = "UP";
        info.version = self.availability.version().map(|v| v.as_str().to_string());

        if let Some(inspector) = &self.inspector {
            info.connection_pool = Some(inspector.pool_stats());
            match inspector.details().await {
                Ok(details) => {
                    info.schema = details.schema;
                    info.client_count = details.row_count;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read database details");
                    info.error = Some(e.to_string());
                }
            }
        }

        info
    }

    pub fn metrics_report(&self) -> MetricsReport {
        let snapshot = self.metrics.snapshot();
        MetricsReport {
            total_api_calls: snapshot.total_api_calls,
            average_response_time: snapshot.average_response_time,
            per_endpoint: snapshot.endpoints,
            uptime: format_uptime(self.uptime()),
        }
    }

    pub async fn report(&self) -> HealthReport {
        let runtime = self.runtime.sample();
        let status = self.status_for(&runtime);

        HealthReport {
            status,
            timestamp: Utc::now(),
            application: self.application(),
            runtime,
            database: self.database().await,
            metrics: self.metrics_report(),
            uptime: format_uptime(self.uptime()),
        }
    }
}

/// `"{d} days, {h} hours, {m} minutes"`.
pub fn format_uptime(uptime: Duration) -> String {
    let total_minutes = uptime.as_secs() / 60;
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;
    format!("{days} days, {hours} hours, {minutes} minutes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::runtime::MemoryStats;

    struct FixedRuntime(f64);

    impl RuntimeProbe for FixedRuntime {
        fn sample(&self) -> RuntimeStats {
            RuntimeStats {
                memory: MemoryStats::new((self.0 * 10.0) as u64, 1000),
                ..Default::default()
            }
        }
    }

    struct StubInspector;

    #[async_trait]
    impl DatabaseInspector for StubInspector {
        async fn details(&self) -> Result<DatabaseDetails, DbError> {
            Ok(DatabaseDetails {
                schema: Some("public".into()),
                row_count: Some(42),
            })
        }

        fn pool_stats(&self) -> PoolStats {
            PoolStats {
                active: 1,
                idle: 2,
                total: 3,
                waiting: 0,
            }
        }
    }

    fn aggregator(memory_percent: f64, config: HealthConfig) -> (HealthAggregator, Arc<Availability>) {
        let availability = Arc::new(Availability::new());
        let aggregator = HealthAggregator::new(
            availability.clone(),
            Arc::new(FixedRuntime(memory_percent)),
            Arc::new(MetricsRecorder::default()),
            config,
            ApplicationConfig::default(),
        )
        .with_inspector(Arc::new(StubInspector));
        (aggregator, availability)
    }

    #[test]
    fn uptime_counts_from_process_start() {
        let instant = Instant::now().checked_sub(Duration::from_secs(5)).unwrap();
        let started = StartTime {
            instant,
            wall: Utc::now() - chrono::Duration::seconds(5),
        };
        let (agg, _) = aggregator(10.0, HealthConfig::default());
        let agg = agg.with_start_time(started);

        assert!(agg.uptime() >= Duration::from_secs(5));
        assert_eq!(agg.application().startup_time, started.wall);
    }

    #[test]
    fn uptime_format() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0 days, 0 hours, 0 minutes");
        let d = Duration::from_secs(2 * 86_400 + 5 * 3_600 + 7 * 60 + 59);
        assert_eq!(format_uptime(d), "2 days, 5 hours, 7 minutes");
    }

    #[test]
    fn status_follows_database_and_memory() {
        let (agg, availability) = aggregator(50.0, HealthConfig::default());
        assert_eq!(agg.status(), AvailabilityState::Degraded);
        availability.swap_available(true);
        assert_eq!(agg.status(), AvailabilityState::Up);

        let (agg, availability) = aggregator(95.0, HealthConfig::default());
        availability.swap_available(true);
        assert_eq!(agg.status(), AvailabilityState::Down);
    }

    #[test]
    fn readiness_can_require_database() {
        let strict = HealthConfig {
            ready_requires_database: true,
            ..HealthConfig::default()
        };
        let (agg, availability) = aggregator(10.0, strict);
        assert!(!agg.is_ready());
        availability.swap_available(true);
        assert!(agg.is_ready());

        let (agg, _) = aggregator(10.0, HealthConfig::default());
        assert!(agg.is_ready());
    }

    #[tokio::test]
    async fn database_info_only_queried_when_up() {
        let (agg, availability) = aggregator(10.0, HealthConfig::default());
        let down = agg.database().await;
        assert_eq!(down.status, "DOWN");
        assert!(down.connection_pool.is_none());
        assert!(down.error.is_some());

        availability.swap_available(true);
        availability.set_version("PostgreSQL 16.2".into());
        let up = agg.database().await;
        assert!(up.is_up());
        assert_eq!(up.version.as_deref(), Some("PostgreSQL 16.2"));
        assert_eq!(up.schema.as_deref(), Some("public"));
        assert_eq!(up.client_count, Some(42));
        assert_eq!(up.connection_pool.map(|p| p.total), Some(3));
    }

    #[tokio::test]
    async fn report_serializes_expected_sections() {
        let (agg, _) = aggregator(10.0, HealthConfig::default());
        let json = serde_json::to_value(agg.report().await).unwrap();
        assert_eq!(json["status"], "DEGRADED");
        assert_eq!(json["application"]["name"], "OnlineBank");
        assert!(json["runtime"]["memory"]["usedPercent"].is_number());
        assert_eq!(json["database"]["status"], "DOWN");
        assert_eq!(json["metrics"]["totalApiCalls"], 0);
        assert!(json["uptime"].as_str().unwrap().ends_with("minutes"));
    }
}
