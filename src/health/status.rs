//! Tri-state service status.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AvailabilityState {
    /// Database reachable and runtime healthy.
    Up,
    /// Runtime healthy, database unreachable. Still serving.
    Degraded,
    /// Runtime unhealthy, whatever the database says.
    Down,
}

impl AvailabilityState {
    pub fn derive(database_reachable: bool, runtime_healthy: bool) -> Self {
        match (runtime_healthy, database_reachable) {
            (false, _) => AvailabilityState::Down,
            (true, true) => AvailabilityState::Up,
            (true, false) => AvailabilityState::Degraded,
        }
    }

    /// Usable for traffic, with or without the database.
    pub fn is_ready(self) -> bool {
        matches!(self, AvailabilityState::Up | AvailabilityState::Degraded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AvailabilityState::Up => "UP",
            AvailabilityState::Degraded => "DEGRADED",
            AvailabilityState::Down => "DOWN",
        }
    }
}

impl fmt::Display for AvailabilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_table() {
        assert_eq!(AvailabilityState::derive(true, true), AvailabilityState::Up);
        assert_eq!(AvailabilityState::derive(false, true), AvailabilityState::Degraded);
        assert_eq!(AvailabilityState::derive(true, false), AvailabilityState::Down);
        assert_eq!(AvailabilityState::derive(false, false), AvailabilityState::Down);
    }

    #[test]
    fn readiness() {
        assert!(AvailabilityState::Up.is_ready());
        assert!(AvailabilityState::Degraded.is_ready());
        assert!(!AvailabilityState::Down.is_ready());
    }

    #[test]
    fn serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&AvailabilityState::Degraded).unwrap(),
            "\"DEGRADED\""
        );
    }
}
