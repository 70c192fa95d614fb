//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + .env
//!     → loader.rs (parse & deserialize)
//!     → env overrides (DATABASE_URL, APP_PROFILE, BIND_ADDRESS)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AppConfig, ApplicationConfig, DatabaseConfig, HealthConfig, ListenerConfig, LogFormat,
    MetricsConfig, ObservabilityConfig, SchemaConfig, SeedConfig, TimeoutConfig,
};
