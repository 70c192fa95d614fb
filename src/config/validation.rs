//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, percentages, pool sizing)
//! - Check that addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every violation.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let db = &config.database;
    if db.url.trim().is_empty() {
        errors.push(ValidationError::new("database.url", "must not be empty"));
    }
    if db.max_pool_size == 0 {
        errors.push(ValidationError::new("database.max_pool_size", "must be at least 1"));
    }
    if db.min_idle > db.max_pool_size {
        errors.push(ValidationError::new(
            "database.min_idle",
            format!("{} exceeds max_pool_size {}", db.min_idle, db.max_pool_size),
        ));
    }
    for (field, value) in [
        ("database.connection_timeout_ms", db.connection_timeout_ms),
        ("database.validation_timeout_ms", db.validation_timeout_ms),
        ("database.probe_interval_ms", db.probe_interval_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }
    if db.validation_timeout_ms >= db.probe_interval_ms {
        errors.push(ValidationError::new(
            "database.validation_timeout_ms",
            "must be shorter than probe_interval_ms",
        ));
    }

    if config.schema.table.trim().is_empty() {
        errors.push(ValidationError::new("schema.table", "must not be empty"));
    }
    if config.schema.delimiter.is_empty() {
        errors.push(ValidationError::new("schema.delimiter", "must not be empty"));
    }

    let percent = config.health.heap_unhealthy_percent;
    if !(percent > 0.0 && percent <= 100.0) {
        errors.push(ValidationError::new(
            "health.heap_unhealthy_percent",
            format!("{percent} is outside (0, 100]"),
        ));
    }
    if config.health.memory_limit_bytes == Some(0) {
        errors.push(ValidationError::new(
            "health.memory_limit_bytes",
            "must be greater than zero when set",
        ));
    }

    if config.metrics.sample_capacity == 0 {
        errors.push(ValidationError::new("metrics.sample_capacity", "must be at least 1"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_violation() {
        let mut config = AppConfig::default();
        config.database.max_pool_size = 0;
        config.database.min_idle = 3;
        config.health.heap_unhealthy_percent = 120.0;
        config.metrics.sample_capacity = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"database.max_pool_size"));
        assert!(fields.contains(&"database.min_idle"));
        assert!(fields.contains(&"health.heap_unhealthy_percent"));
        assert!(fields.contains(&"metrics.sample_capacity"));
    }

    #[test]
    fn probe_timeout_must_fit_inside_interval() {
        let mut config = AppConfig::default();
        config.database.validation_timeout_ms = 10_000;
        config.database.probe_interval_ms = 10_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "database.validation_timeout_ms");
    }

    #[test]
    fn rejects_bad_bind_address() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "listener.bind_address");
    }
}
