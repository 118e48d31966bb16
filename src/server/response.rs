// src/server/response.rs
use crate::health::{HealthStatus, HealthStatusResult};
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of the health route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
    pub dependencies: Vec<HealthStatusResult>,
}

impl HealthResponse {
    pub fn new(status: HealthStatus, dependencies: Vec<HealthStatusResult>) -> Self {
        Self {
            status,
            checked_at: Utc::now(),
            dependencies,
        }
    }

    /// Only a `Critical` service is reported as unavailable; a degraded one
    /// still takes traffic.
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Critical => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::OK,
        }
    }
}

impl fmt::Display for HealthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        let cases = [
            (HealthStatus::NotSet, StatusCode::OK),
            (HealthStatus::OK, StatusCode::OK),
            (HealthStatus::Warning, StatusCode::OK),
            (HealthStatus::Critical, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (status, expected) in cases {
            assert_eq!(HealthResponse::new(status, vec![]).http_status(), expected);
        }
    }

    #[test]
    fn test_display_round_trips() {
        let response = HealthResponse::new(
            HealthStatus::Warning,
            vec![HealthStatusResult::new(HealthStatus::Warning).with_name("billing")],
        );

        let parsed: HealthResponse = serde_json::from_str(&response.to_string()).unwrap();
        assert_eq!(parsed, response);
    }
}
