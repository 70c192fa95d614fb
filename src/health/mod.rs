//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health/*
//!     → HealthAggregator (on demand)
//!         → Availability flag (atomic read, set by db::probe)
//!         → RuntimeProbe::sample() (sysinfo)
//!         → MetricsRecorder::snapshot()
//!         → DatabaseInspector (only while the flag is up)
//!     → AvailabilityState: UP / DEGRADED / DOWN
//! ```
//!
//! # Design Decisions
//! - DEGRADED is a serving state, not an error
//! - Liveness never consults the database
//! - Runtime health is memory pressure against a configurable threshold

pub mod aggregator;
pub mod runtime;
pub mod status;

pub use aggregator::{
    format_uptime, DatabaseDetails, DatabaseInfo, DatabaseInspector, HealthAggregator,
    HealthReport, MetricsReport, StartTime,
};
pub use runtime::{RuntimeProbe, RuntimeStats, SysinfoRuntimeProbe};
pub use status::AvailabilityState;
