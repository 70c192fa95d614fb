//! Database outage and recovery as seen through the service.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use onlinebank::clients::ClientSeeder;
use onlinebank::config::SeedConfig;
use onlinebank::db::{Availability, ConnectionPool, DbError, PoolStats, ResilientPool};

mod common;

fn strict_config() -> onlinebank::config::AppConfig {
    let mut config = common::test_config();
    config.health.ready_requires_database = true;
    config
}

#[tokio::test]
async fn ready_flips_once_database_appears() {
    let app = common::spawn_app(strict_config()).await;

    assert_eq!(app.get("/health/ready").await.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(!app.availability.is_schema_initialized());

    app.database_up().await;

    assert_eq!(app.get("/health/ready").await.status(), StatusCode::OK);
    assert!(app.availability.is_schema_initialized());
    assert_eq!(app.schema.executions(), 1);
}

#[tokio::test]
async fn bootstrap_runs_once_across_flaps() {
    let app = common::spawn_app(strict_config()).await;

    app.database_up().await;
    app.database_down().await;
    assert_eq!(app.get("/health/ready").await.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(app.availability.version().is_none());

    app.database_up().await;
    assert_eq!(app.get("/health/ready").await.status(), StatusCode::OK);
    assert_eq!(app.schema.executions(), 1);
    assert_eq!(
        app.availability.version().as_deref().map(String::as_str),
        Some(common::FAKE_VERSION)
    );
}

#[tokio::test]
async fn failed_bootstrap_retries_on_next_connection_only() {
    let app = common::spawn_app(strict_config()).await;
    app.schema.fail_next_script();

    app.database_up().await;
    assert_eq!(app.schema.attempts(), 1);
    assert_eq!(app.schema.executions(), 0);
    assert!(!app.availability.is_schema_initialized());
    // Reachable without a schema still counts as up.
    assert_eq!(app.get("/health/ready").await.status(), StatusCode::OK);

    // Steady polls do not retry; only the next rising edge does.
    app.database_up().await;
    assert_eq!(app.schema.attempts(), 1);

    app.database_down().await;
    app.database_up().await;
    assert_eq!(app.schema.attempts(), 2);
    assert_eq!(app.schema.executions(), 1);
    assert!(app.availability.is_schema_initialized());

    app.database_down().await;
    app.database_up().await;
    assert_eq!(app.schema.attempts(), 2);
    assert_eq!(app.schema.executions(), 1);
}

#[tokio::test]
async fn background_probe_recovers_within_an_interval() {
    let app = common::spawn_app(strict_config()).await;
    let interval = Duration::from_millis(50);
    let handle = onlinebank::db::ConnectionProbe::new(
        app.source.clone(),
        app.availability.clone(),
        Duration::from_millis(200),
        interval,
    )
    .spawn();

    tokio::time::sleep(interval * 2).await;
    assert_eq!(app.get("/health/ready").await.status(), StatusCode::SERVICE_UNAVAILABLE);

    app.source.set_up(true);
    let deadline = Instant::now() + Duration::from_secs(2);
    while !app.availability.is_available() {
        assert!(Instant::now() < deadline, "probe never saw the database");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(app.get("/health/ready").await.status(), StatusCode::OK);

    handle.stop().await;
    assert!(!handle.is_running());
    let calls = app.source.calls();
    tokio::time::sleep(interval * 3).await;
    assert_eq!(app.source.calls(), calls, "probe kept running after stop");
}

#[tokio::test]
async fn api_returns_503_problem_while_store_is_down() {
    let app = common::spawn_app(common::test_config()).await;
    app.store.set_unavailable(true);

    let res = app.get("/api/clients").await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "application/problem+json"
    );
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["type"], "/errors/database-unavailable");
    assert_eq!(body["status"], 503);

    // Health keeps answering.
    assert_eq!(app.get("/health").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn seeder_fills_store_after_first_bootstrap() {
    let store = Arc::new(common::InMemoryClientStore::new());
    let availability = Arc::new(Availability::new());
    let seeder = Arc::new(ClientSeeder::new(
        store.clone(),
        availability.clone(),
        SeedConfig {
            enabled: true,
            client_count: 25,
            clean_before: false,
        },
    ));

    let source = Arc::new(common::ToggleSource::default());
    let schema = Arc::new(common::RecordingSchemaStore::default());
    let bootstrapper = onlinebank::db::SchemaBootstrapper::new(
        schema.clone(),
        availability.clone(),
        "clients",
        onlinebank::db::DEFAULT_SCRIPT,
    );
    let probe = onlinebank::db::ConnectionProbe::new(
        source.clone(),
        availability.clone(),
        Duration::from_millis(200),
        Duration::from_millis(50),
    )
    .with_bootstrapper(Arc::new(bootstrapper))
    .with_listener(seeder.clone());

    assert!(!probe.probe_once().await);
    assert_eq!(store.len(), 0);

    source.set_up(true);
    assert!(probe.probe_once().await);
    assert!(seeder.is_done());
    let seeded = store.len();
    assert!(seeded > 0 && seeded <= 25, "seeded {seeded}");

    // A second up-transition does not seed again.
    source.set_up(false);
    probe.probe_once().await;
    source.set_up(true);
    probe.probe_once().await;
    assert_eq!(store.len(), seeded);
}

#[tokio::test]
async fn interrupted_seed_resumes_on_next_connection() {
    let store = Arc::new(common::InMemoryClientStore::new());
    let availability = Arc::new(Availability::new());
    let seeder = Arc::new(ClientSeeder::new(
        store.clone(),
        availability.clone(),
        SeedConfig {
            enabled: true,
            client_count: 25,
            clean_before: false,
        },
    ));
    let source = Arc::new(common::ToggleSource::default());
    let bootstrapper = onlinebank::db::SchemaBootstrapper::new(
        Arc::new(common::RecordingSchemaStore::default()),
        availability.clone(),
        "clients",
        onlinebank::db::DEFAULT_SCRIPT,
    );
    let probe = onlinebank::db::ConnectionProbe::new(
        source.clone(),
        availability.clone(),
        Duration::from_millis(200),
        Duration::from_millis(50),
    )
    .with_bootstrapper(Arc::new(bootstrapper))
    .with_listener(seeder.clone());

    store.fail_after_inserts(10);
    source.set_up(true);
    assert!(probe.probe_once().await);
    assert_eq!(store.len(), 10);
    assert!(!seeder.is_done());

    store.set_unavailable(false);
    source.set_up(false);
    probe.probe_once().await;
    source.set_up(true);
    probe.probe_once().await;

    assert!(seeder.is_done());
    let seeded = store.len();
    assert!(seeded > 10 && seeded <= 25, "seeded {seeded}");
}

struct SlowPool {
    acquired: AtomicUsize,
}

#[async_trait]
impl ConnectionPool for SlowPool {
    type Connection = ();

    async fn acquire(&self) -> Result<(), DbError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stats(&self) -> PoolStats {
        PoolStats::default()
    }

    async fn close(&self) {}
}

#[tokio::test]
async fn facade_fails_fast_while_unavailable() {
    let availability = Arc::new(Availability::new());
    let pool = ResilientPool::new(
        SlowPool {
            acquired: AtomicUsize::new(0),
        },
        availability,
    );

    let started = Instant::now();
    let err = pool.acquire().await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(pool.inner().acquired.load(Ordering::SeqCst), 0);
}
