//! Lazy schema bootstrap.
//!
//! # Responsibilities
//! - Detect whether the client table exists once the database comes up
//! - Apply the bootstrap script when it does not
//! - Re-arm the latch on failure so the next up-transition retries
//!
//! Existence is checked against `information_schema` first. If the catalog
//! query itself fails, a `COUNT(*)` against the table is used instead and any
//! error there is read as "missing". That fallback cannot tell a missing table
//! from a permissions problem.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::availability::Availability;
use crate::db::error::DbError;

/// Bootstrap script shipped with the binary.
pub const DEFAULT_SCRIPT: &str = include_str!("../../sql/schema.sql");

/// Storage operations the bootstrapper needs.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Catalog lookup for a table in the current schema.
    async fn table_exists(&self, table: &str) -> Result<bool, DbError>;

    /// Cheap probe query. Fails when the table is missing.
    async fn count_rows(&self, table: &str) -> Result<i64, DbError>;

    /// Run all statements as a single unit.
    async fn execute_script(&self, statements: &[String]) -> Result<(), DbError>;
}

/// What a call to [`SchemaBootstrapper::ensure_schema`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Latch already set; nothing was checked.
    AlreadyInitialized,
    /// Table found; script not run.
    SchemaPresent,
    /// Script applied.
    Applied { statements: usize },
}

pub struct SchemaBootstrapper {
    store: Arc<dyn SchemaStore>,
    availability: Arc<Availability>,
    table: String,
    script: String,
    delimiter: String,
}

impl SchemaBootstrapper {
    pub fn new(
        store: Arc<dyn SchemaStore>,
        availability: Arc<Availability>,
        table: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            store,
            availability,
            table: table.into(),
            script: script.into(),
            delimiter: ";".to_string(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Script split on the delimiter, blank fragments dropped.
    pub fn statements(&self) -> Vec<String> {
        split_statements(&self.script, &self.delimiter)
    }

    /// Make sure the schema exists. Runs at most once per successful install.
    pub async fn ensure_schema(&self) -> Result<BootstrapOutcome, DbError> {
        if !self.availability.try_claim_schema() {
            return Ok(BootstrapOutcome::AlreadyInitialized);
        }

        match self.install().await {
            Ok(outcome) => {
                tracing::info!(table = %self.table, outcome = ?outcome, "Schema ready");
                Ok(outcome)
            }
            Err(e) => {
                self.availability.reset_schema();
                tracing::error!(table = %self.table, error = %e, "Schema bootstrap failed, will retry on next connection");
                Err(e)
            }
        }
    }

    async fn install(&self) -> Result<BootstrapOutcome, DbError> {
        if self.schema_present().await {
            return Ok(BootstrapOutcome::SchemaPresent);
        }

        let statements = self.statements();
        tracing::info!(
            table = %self.table,
            statements = statements.len(),
            "Table missing, applying bootstrap script"
        );
        self.store.execute_script(&statements).await?;

        Ok(BootstrapOutcome::Applied {
            statements: statements.len(),
        })
    }

    async fn schema_present(&self) -> bool {
        match self.store.table_exists(&self.table).await {
            Ok(present) => present,
            Err(e) => {
                tracing::debug!(error = %e, "Catalog lookup failed, probing table directly");
                self.store.count_rows(&self.table).await.is_ok()
            }
        }
    }
}

fn split_statements(script: &str, delimiter: &str) -> Vec<String> {
    script
        .split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
