//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack)
//!     → request.rs (add request ID, tracing span)
//!     → health.rs (/health/*, reads HealthAggregator only)
//!     → clients.rs (/api/clients/*, timed by middleware.rs)
//!         → ClientService → ClientStore → ResilientPool
//!     → error.rs (problem-detail body on failure)
//!     → Send to client
//! ```

pub mod clients;
pub mod error;
pub mod health;
pub mod middleware;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
