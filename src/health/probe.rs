// src/health/probe.rs
use super::dependency::HealthStatusResult;
use super::error::HealthError;
use super::status::HealthStatus;
use crate::config::CheckConfig;
use reqwest::{redirect, Client, StatusCode};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Timed GET against a single resource.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    config: CheckConfig,
}

impl HttpProbe {
    pub fn new(config: CheckConfig) -> Result<Self, HealthError> {
        config.validate()?;

        let redirects = if config.follow_redirects {
            redirect::Policy::default()
        } else {
            redirect::Policy::none()
        };

        let client = Client::builder()
            .timeout(config.request_timeout())
            .redirect(redirects)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Probes `url` and classifies the outcome. Never fails: transport errors
    /// and timeouts come back as `Critical` with `http_status_code == 0`.
    pub async fn check_url(&self, url: &str) -> HealthStatusResult {
        let request_timeout = self.config.request_timeout();

        let start = Instant::now();
        let outcome = timeout(request_timeout, self.client.get(url).send()).await;
        let elapsed = start.elapsed();

        let mut result = HealthStatusResult::new(HealthStatus::NotSet)
            .with_resource(url)
            .with_duration_ms(elapsed.as_secs_f64() * 1000.0);

        match outcome {
            Ok(Ok(response)) => {
                let code = response.status();
                result.http_status_code = code.as_u16();
                result.status = classify(code, elapsed, self.config.warning_latency());

                if !code.is_success() {
                    result.message = Some(format!("HTTP {}", code));
                } else if result.status == HealthStatus::Warning {
                    result.message = Some(format!(
                        "response took {}ms, over the {}ms threshold",
                        elapsed.as_millis(),
                        self.config.warning_latency_ms
                    ));
                }
            }
            Ok(Err(e)) => {
                result.status = HealthStatus::Critical;
                result.message = Some(e.to_string());
            }
            Err(_) => {
                result.status = HealthStatus::Critical;
                result.message = Some(format!("request timed out after {:?}", request_timeout));
            }
        }

        if result.status == HealthStatus::OK {
            debug!(
                "{} is healthy ({} in {:.1}ms)",
                url, result.http_status_code, result.request_duration_ms
            );
        } else {
            warn!(
                "{} is {}: {}",
                url,
                result.status,
                result.message.as_deref().unwrap_or_default()
            );
        }

        result
    }
}

/// Maps a completed response to a severity. Server errors are `Critical`,
/// any other non-2xx is `Warning`, and a 2xx slower than `warning_latency`
/// is `Warning`.
pub fn classify(code: StatusCode, elapsed: Duration, warning_latency: Duration) -> HealthStatus {
    if code.is_server_error() {
        HealthStatus::Critical
    } else if !code.is_success() {
        HealthStatus::Warning
    } else if elapsed > warning_latency {
        HealthStatus::Warning
    } else {
        HealthStatus::OK
    }
}

/// Probes `url` with the default timeout and latency threshold.
pub async fn check_url(url: &str) -> HealthStatusResult {
    match HttpProbe::new(CheckConfig::default()) {
        Ok(probe) => probe.check_url(url).await,
        Err(e) => HealthStatusResult::critical(e.to_string()).with_resource(url),
    }
}
