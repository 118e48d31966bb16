// src/health/dependency.rs
use super::status::HealthStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A caller-supplied check that replaces the built-in HTTP probe.
///
/// Implementations must not panic and must not block forever; a panic is
/// contained by the checker and reported as `Critical`.
#[async_trait]
pub trait AsyncCheck: Send + Sync {
    async fn check(&self) -> HealthStatusResult;
}

#[derive(Clone)]
pub enum CheckHandler {
    /// Runs on the blocking thread pool.
    Blocking(Arc<dyn Fn() -> HealthStatusResult + Send + Sync>),
    Async(Arc<dyn AsyncCheck>),
}

impl fmt::Debug for CheckHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckHandler::Blocking(_) => f.write_str("CheckHandler::Blocking"),
            CheckHandler::Async(_) => f.write_str("CheckHandler::Async"),
        }
    }
}

/// A dependency to check during a health request.
///
/// When `handler` is set the HTTP probe is skipped, whatever `connection` says.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub connection: String,
    #[serde(skip)]
    pub handler: Option<CheckHandler>,
}

impl DependencyDescriptor {
    pub fn http(name: impl Into<String>, connection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "HTTP".to_string(),
            connection: connection.into(),
            handler: None,
        }
    }

    pub fn custom<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn() -> HealthStatusResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: "Custom".to_string(),
            connection: String::new(),
            handler: Some(CheckHandler::Blocking(Arc::new(handler))),
        }
    }

    pub fn custom_async<C>(name: impl Into<String>, check: C) -> Self
    where
        C: AsyncCheck + 'static,
    {
        Self {
            name: name.into(),
            kind: "Custom".to_string(),
            connection: String::new(),
            handler: Some(CheckHandler::Async(Arc::new(check))),
        }
    }

    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    pub fn is_custom(&self) -> bool {
        self.handler.is_some()
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_pretty_json(f, self)
    }
}

/// Outcome of probing a single dependency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatusResult {
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub request_duration_ms: f64,
    /// Zero when no HTTP response was received.
    #[serde(default)]
    pub http_status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatusResult {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Critical).with_message(message)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_duration_ms(mut self, request_duration_ms: f64) -> Self {
        self.request_duration_ms = request_duration_ms;
        self
    }
}

impl fmt::Display for HealthStatusResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_pretty_json(f, self)
    }
}

fn write_pretty_json<T: Serialize>(f: &mut fmt::Formatter<'_>, value: &T) -> fmt::Result {
    let text = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
    f.write_str(&text)
}
