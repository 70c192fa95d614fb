//! Shared fakes and server harness for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use onlinebank::clients::store::FIRST_ACCOUNT_NUMBER;
use onlinebank::clients::{
    Client, ClientError, ClientService, ClientStore, GroupField, NewClient, Page, PageRequest,
    SearchFilter, SortDirection, SortField,
};
use onlinebank::config::AppConfig;
use onlinebank::db::{
    Availability, AvailabilityListener, ConnectionProbe, ConnectionSource, DbError,
    SchemaBootstrapper, SchemaStore,
};
use onlinebank::health::runtime::MemoryStats;
use onlinebank::health::{HealthAggregator, RuntimeProbe, RuntimeStats};
use onlinebank::http::{AppState, HttpServer};
use onlinebank::observability::MetricsRecorder;

// ---------------------------------------------------------------------------
// Client store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreInner {
    next_id: i64,
    rows: BTreeMap<i64, Client>,
}

/// Map-backed [`ClientStore`] with the same uniqueness and versioning rules
/// as the Postgres store.
#[derive(Default)]
pub struct InMemoryClientStore {
    inner: Mutex<StoreInner>,
    unavailable: AtomicBool,
    insert_budget: Mutex<Option<usize>>,
}

impl InMemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the database were down.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    /// Allow `n` more inserts, then behave as if the database went down.
    pub fn fail_after_inserts(&self, n: usize) {
        *self.insert_budget.lock() = Some(n);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    fn check(&self) -> Result<(), ClientError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ClientError::Database(DbError::Unavailable))
        } else {
            Ok(())
        }
    }
}

fn matches(client: &Client, filter: &SearchFilter) -> bool {
    if let Some(currency) = filter.currency {
        if client.currency != currency {
            return false;
        }
    }
    if let Some(nationality) = filter.nationality {
        if client.nationality != nationality {
            return false;
        }
    }
    match filter.term() {
        None => true,
        Some(term) => {
            let term = term.to_lowercase();
            [
                Some(client.last_name.as_str()),
                Some(client.first_name.as_str()),
                client.middle_name.as_deref(),
                Some(client.account_number.as_str()),
                Some(client.phone_number.as_str()),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term))
        }
    }
}

fn compare(a: &Client, b: &Client, sort: SortField) -> CmpOrdering {
    match sort {
        SortField::Id => a.id.cmp(&b.id),
        SortField::LastName => a.last_name.cmp(&b.last_name),
        SortField::FirstName => a.first_name.cmp(&b.first_name),
        SortField::BirthDate => a.birth_date.cmp(&b.birth_date),
        SortField::AccountNumber => a.account_number.cmp(&b.account_number),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Client>, ClientError> {
        self.check()?;
        Ok(self.inner.lock().rows.get(&id).cloned())
    }

    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<Client>, ClientError> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner.rows.values().find(|c| c.unique_id == unique_id).cloned())
    }

    async fn find_by_account_number(&self, account: &str) -> Result<Option<Client>, ClientError> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner
            .rows
            .values()
            .find(|c| c.account_number == account)
            .cloned())
    }

    async fn exists_by_account_number(&self, account: &str) -> Result<bool, ClientError> {
        Ok(self.find_by_account_number(account).await?.is_some())
    }

    async fn exists_by_phone_number(&self, phone: &str) -> Result<bool, ClientError> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner.rows.values().any(|c| c.phone_number == phone))
    }

    async fn search(
        &self,
        filter: &SearchFilter,
        page: &PageRequest,
    ) -> Result<Page<Client>, ClientError> {
        self.check()?;
        let inner = self.inner.lock();
        let mut hits: Vec<Client> = inner
            .rows
            .values()
            .filter(|c| matches(c, filter))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            let ord = compare(a, b, page.sort).then(a.id.cmp(&b.id));
            match page.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        let total = hits.len() as u64;
        let content = hits
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok(Page::new(content, page, total))
    }

    async fn find_by_birth_date_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Client>, ClientError> {
        self.check()?;
        let inner = self.inner.lock();
        let mut hits: Vec<Client> = inner
            .rows
            .values()
            .filter(|c| c.birth_date >= from && c.birth_date <= to)
            .cloned()
            .collect();
        hits.sort_by_key(|c| c.birth_date);
        Ok(hits)
    }

    async fn count_grouped_by(&self, field: GroupField) -> Result<Vec<(String, i64)>, ClientError> {
        self.check()?;
        let inner = self.inner.lock();
        let mut groups: BTreeMap<String, i64> = BTreeMap::new();
        for client in inner.rows.values() {
            let key = match field {
                GroupField::Currency => client.currency.code().to_string(),
                GroupField::Nationality => client.nationality.tag().to_string(),
            };
            *groups.entry(key).or_default() += 1;
        }
        let mut rows: Vec<_> = groups.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(rows)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Client>, ClientError> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner
            .rows
            .values()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn insert(&self, client: NewClient) -> Result<Client, ClientError> {
        {
            let mut budget = self.insert_budget.lock();
            match budget.as_mut() {
                Some(0) => {
                    *budget = None;
                    self.set_unavailable(true);
                }
                Some(left) => *left -= 1,
                None => {}
            }
        }
        self.check()?;
        let mut inner = self.inner.lock();
        let duplicate = inner.rows.values().any(|c| {
            c.account_number == client.account_number
                || c.phone_number == client.phone_number
                || c.unique_id == client.unique_id
        });
        if duplicate {
            return Err(ClientError::AlreadyExists("client already exists".into()));
        }

        inner.next_id += 1;
        let now = Utc::now().naive_utc();
        let stored = Client {
            id: inner.next_id,
            unique_id: client.unique_id,
            last_name: client.last_name,
            first_name: client.first_name,
            middle_name: client.middle_name,
            birth_date: client.birth_date,
            account_number: client.account_number,
            currency: client.currency,
            nationality: client.nationality,
            phone_number: client.phone_number,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        inner.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, client: &Client) -> Result<Client, ClientError> {
        self.check()?;
        let mut inner = self.inner.lock();
        let current = inner
            .rows
            .get(&client.id)
            .ok_or_else(|| ClientError::not_found_id(client.id))?;
        if current.version != client.version {
            return Err(ClientError::Conflict(format!(
                "Client {} was modified concurrently",
                client.id
            )));
        }

        let mut saved = client.clone();
        saved.version += 1;
        saved.updated_at = Utc::now().naive_utc();
        inner.rows.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, ClientError> {
        self.check()?;
        Ok(self.inner.lock().rows.remove(&id).is_some())
    }

    async fn count(&self) -> Result<i64, ClientError> {
        self.check()?;
        Ok(self.inner.lock().rows.len() as i64)
    }

    async fn delete_all(&self) -> Result<u64, ClientError> {
        self.check()?;
        let mut inner = self.inner.lock();
        let removed = inner.rows.len() as u64;
        inner.rows.clear();
        Ok(removed)
    }

    async fn next_account_number(&self) -> Result<String, ClientError> {
        self.check()?;
        let inner = self.inner.lock();
        let max = inner
            .rows
            .values()
            .filter(|c| c.account_number.len() == 20 && c.account_number.starts_with('1'))
            .filter_map(|c| c.account_number.parse::<u128>().ok())
            .max();
        Ok(match max {
            Some(n) => (n + 1).to_string(),
            None => FIRST_ACCOUNT_NUMBER.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Database fakes
// ---------------------------------------------------------------------------

pub const FAKE_VERSION: &str = "PostgreSQL 16.2 (fake)";

/// Connection source whose reachability is flipped by the test.
#[derive(Default)]
pub struct ToggleSource {
    up: AtomicBool,
    calls: AtomicUsize,
}

impl ToggleSource {
    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionSource for ToggleSource {
    async fn validate(&self) -> Result<String, DbError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.up.load(Ordering::SeqCst) {
            Ok(FAKE_VERSION.to_string())
        } else {
            Err(DbError::Unavailable)
        }
    }
}

/// Schema store that starts empty and counts script executions.
#[derive(Default)]
pub struct RecordingSchemaStore {
    created: AtomicBool,
    fail_next: AtomicBool,
    attempts: AtomicUsize,
    executions: AtomicUsize,
}

impl RecordingSchemaStore {
    /// Successful script runs.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Script runs, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn fail_next_script(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SchemaStore for RecordingSchemaStore {
    async fn table_exists(&self, _table: &str) -> Result<bool, DbError> {
        Ok(self.created.load(Ordering::SeqCst))
    }

    async fn count_rows(&self, _table: &str) -> Result<i64, DbError> {
        Ok(0)
    }

    async fn execute_script(&self, statements: &[String]) -> Result<(), DbError> {
        assert!(!statements.is_empty());
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DbError::Script {
                index: 0,
                source: sqlx::Error::Protocol("relation already being created".into()),
            });
        }
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.created.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Runtime probe reporting a fixed memory usage percentage.
pub struct FixedRuntime {
    percent: Mutex<f64>,
}

impl FixedRuntime {
    pub fn new(percent: f64) -> Self {
        Self {
            percent: Mutex::new(percent),
        }
    }

    pub fn set(&self, percent: f64) {
        *self.percent.lock() = percent;
    }
}

impl RuntimeProbe for FixedRuntime {
    fn sample(&self) -> RuntimeStats {
        let limit = 1_000_000u64;
        let used = (*self.percent.lock() / 100.0 * limit as f64) as u64;
        RuntimeStats {
            memory: MemoryStats::new(used, limit),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Server harness
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub http: reqwest::Client,
    pub availability: Arc<Availability>,
    pub source: Arc<ToggleSource>,
    pub schema: Arc<RecordingSchemaStore>,
    pub runtime: Arc<FixedRuntime>,
    pub store: Arc<InMemoryClientStore>,
    pub metrics: Arc<MetricsRecorder>,
    pub probe: ConnectionProbe,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.http
            .get(self.url(path))
            .send()
            .await
            .expect("request sent")
    }

    /// Make the database reachable and run one probe cycle.
    pub async fn database_up(&self) {
        self.source.set_up(true);
        assert!(self.probe.probe_once().await);
    }

    pub async fn database_down(&self) {
        self.source.set_up(false);
        assert!(!self.probe.probe_once().await);
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.database.validation_timeout_ms = 200;
    config.database.probe_interval_ms = 50;
    config
}

/// Serve the real router over in-memory fakes on an ephemeral port.
pub async fn spawn_app(config: AppConfig) -> TestApp {
    spawn_app_with_listener(config, None).await
}

pub async fn spawn_app_with_listener(
    config: AppConfig,
    listener: Option<Arc<dyn AvailabilityListener>>,
) -> TestApp {
    let availability = Arc::new(Availability::new());
    let source = Arc::new(ToggleSource::default());
    let schema = Arc::new(RecordingSchemaStore::default());
    let runtime = Arc::new(FixedRuntime::new(40.0));
    let store = Arc::new(InMemoryClientStore::new());
    let metrics = Arc::new(MetricsRecorder::new(config.metrics.sample_capacity));

    let bootstrapper = SchemaBootstrapper::new(
        schema.clone(),
        availability.clone(),
        config.schema.table.clone(),
        onlinebank::db::DEFAULT_SCRIPT,
    );
    let mut probe = ConnectionProbe::new(
        source.clone(),
        availability.clone(),
        config.database.validation_timeout(),
        config.database.probe_interval(),
    )
    .with_bootstrapper(Arc::new(bootstrapper));
    if let Some(listener) = listener {
        probe = probe.with_listener(listener);
    }

    let health = HealthAggregator::new(
        availability.clone(),
        runtime.clone(),
        metrics.clone(),
        config.health.clone(),
        config.application.clone(),
    );
    let state = AppState {
        health: Arc::new(health),
        metrics: metrics.clone(),
        clients: ClientService::new(store.clone()),
    };
    let router = HttpServer::build_router(&config, state);

    let tcp = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = tcp.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(tcp, router).await.expect("serve");
    });

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("http client");

    TestApp {
        addr,
        base_url: format!("http://{addr}"),
        http,
        availability,
        source,
        schema,
        runtime,
        store,
        metrics,
        probe,
    }
}
