mod checker;
mod dependency;
mod error;
mod probe;
mod status;

pub use checker::{check_deps, HealthChecker};
pub use dependency::{AsyncCheck, CheckHandler, DependencyDescriptor, HealthStatusResult};
pub use error::HealthError;
pub use probe::{check_url, classify, HttpProbe};
pub use status::{status_name, worst, HealthStatus, StatusError};
