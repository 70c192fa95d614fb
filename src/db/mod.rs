//! Resilient database connectivity.
//!
//! # Data Flow
//! ```text
//! ConnectionProbe (background task, every probe_interval)
//!     → ConnectionSource::validate() bounded by validation_timeout
//!     → Availability.reachable (swap)
//!     → on down→up: cache version, SchemaBootstrapper::ensure_schema(),
//!                   AvailabilityListener::on_available()
//!     → on up→down: clear cached version
//!
//! Request path:
//!     handler → store → ResilientPool::acquire()
//!         flag down → DbError::Unavailable (no pool wait)
//!         flag up   → delegate pool
//! ```
//!
//! # Design Decisions
//! - Availability is an owned value passed by `Arc`, not a global
//! - The facade composes the pool rather than replacing it
//! - The pool is built lazily so the process starts with the database down
//! - Readers may see a stale "up" for at most one probe interval

pub mod availability;
pub mod error;
pub mod facade;
pub mod postgres;
pub mod probe;
pub mod schema;

pub use availability::Availability;
pub use error::DbError;
pub use facade::{ConnectionPool, PoolStats, ResilientPool};
pub use postgres::{build_pool, PgDatabase, PgInspector};
pub use probe::{AvailabilityListener, ConnectionProbe, ConnectionSource, ProbeHandle};
pub use schema::{BootstrapOutcome, SchemaBootstrapper, SchemaStore, DEFAULT_SCRIPT};
