// src/health/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid check configuration: {0}")]
    InvalidConfig(&'static str),
}
