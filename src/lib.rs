// src/lib.rs
//! Point-in-time dependency health checks for a running service.
//!
//! Declare the dependencies as [`DependencyDescriptor`]s, then call
//! [`check_deps`] (or [`HealthChecker::check_deps`] with a tuned
//! [`CheckConfig`]) to probe them concurrently and get one overall
//! [`HealthStatus`] plus a result per dependency, in input order.
pub mod config;
pub mod health;
pub mod metrics;
pub mod server;

pub use config::CheckConfig;
pub use health::{
    check_deps, check_url, DependencyDescriptor, HealthChecker, HealthStatus, HealthStatusResult,
};
