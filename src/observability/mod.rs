//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (per-endpoint call stats, Prometheus counters/gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → /health/metrics (MetricsRecorder snapshot)
//!     → Prometheus scrape listener (optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the request span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::{MetricsRecorder, MetricsSnapshot};
