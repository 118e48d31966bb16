// src/config/models.rs
use crate::health::{DependencyDescriptor, HealthError};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub checks: CheckConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.checks.validate()?;
        self.server.addr()?;

        if !self.server.path.starts_with('/') {
            bail!("server.path must start with '/', got {:?}", self.server.path);
        }
        if self.metrics.enabled && self.metrics.port == self.server.port {
            bail!("metrics.port must differ from server.port ({})", self.server.port);
        }

        let mut seen = HashSet::new();
        for dep in &self.dependencies {
            dep.validate()?;
            if !seen.insert(dep.name.as_str()) {
                bail!("duplicate dependency name: {}", dep.name);
            }
        }

        Ok(())
    }

    pub fn descriptors(&self) -> Vec<DependencyDescriptor> {
        self.dependencies
            .iter()
            .map(DependencyConfig::to_descriptor)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_health_path")]
    pub path: String,
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("invalid server.host {:?}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_server_port(),
            path: default_health_path(),
        }
    }
}

/// Tuning for the HTTP probe and the fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Per-request timeout for the HTTP probe.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// A 2xx response slower than this is reported as `Warning`.
    #[serde(default = "default_warning_latency_ms")]
    pub warning_latency_ms: u64,
    /// Optional bound on a whole check cycle. Unset means wait for every probe.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
    #[serde(default)]
    pub follow_redirects: bool,
}

impl CheckConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn warning_latency(&self) -> Duration {
        Duration::from_millis(self.warning_latency_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), HealthError> {
        if self.request_timeout_ms == 0 {
            return Err(HealthError::InvalidConfig(
                "checks.request_timeout_ms must be greater than zero",
            ));
        }
        if self.deadline_ms == Some(0) {
            return Err(HealthError::InvalidConfig(
                "checks.deadline_ms must be greater than zero when set",
            ));
        }
        Ok(())
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            warning_latency_ms: default_warning_latency_ms(),
            deadline_ms: None,
            follow_redirects: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

/// An HTTP dependency declared in the config file. Custom checks can only be
/// registered from code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    pub name: String,
    #[serde(rename = "type", default = "default_dependency_type")]
    pub kind: String,
    pub connection: String,
}

impl DependencyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("dependency name must not be empty");
        }

        let url = Url::parse(&self.connection)
            .with_context(|| format!("invalid connection URL for dependency {}", self.name))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => bail!(
                "dependency {} uses unsupported scheme {:?}",
                self.name,
                other
            ),
        }
    }

    pub fn to_descriptor(&self) -> DependencyDescriptor {
        DependencyDescriptor {
            kind: self.kind.clone(),
            ..DependencyDescriptor::http(self.name.clone(), self.connection.clone())
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_request_timeout_ms() -> u64 {
    3000
}

fn default_warning_latency_ms() -> u64 {
    3000
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_dependency_type() -> String {
    "HTTP".to_string()
}
