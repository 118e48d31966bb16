// src/health/checker.rs
use super::dependency::{CheckHandler, DependencyDescriptor, HealthStatusResult};
use super::error::HealthError;
use super::probe::HttpProbe;
use super::status::{worst, HealthStatus};
use crate::config::CheckConfig;
use crate::metrics::MetricsCollector;
use std::any::Any;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Fans a set of dependency probes out concurrently and reduces their
/// results to one overall status.
pub struct HealthChecker {
    probe: Arc<HttpProbe>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthChecker {
    pub fn new(
        config: CheckConfig,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Result<Self, HealthError> {
        Ok(Self {
            probe: Arc::new(HttpProbe::new(config)?),
            metrics,
        })
    }

    pub fn config(&self) -> &CheckConfig {
        self.probe.config()
    }

    /// Runs one probe per dependency and waits for all of them.
    ///
    /// `results[i]` always belongs to `deps[i]`. The overall status is the
    /// worst among the results, or `NotSet` when `deps` is empty.
    pub async fn check_deps(
        &self,
        deps: &[DependencyDescriptor],
    ) -> (HealthStatus, Vec<HealthStatusResult>) {
        let span = info_span!("check_deps", check_id = %Uuid::new_v4(), dependencies = deps.len());
        self.run_cycle(deps).instrument(span).await
    }

    async fn run_cycle(
        &self,
        deps: &[DependencyDescriptor],
    ) -> (HealthStatus, Vec<HealthStatusResult>) {
        let deadline = self.config().deadline().map(|d| Instant::now() + d);

        let tasks: Vec<JoinHandle<HealthStatusResult>> = deps
            .iter()
            .cloned()
            .map(|dep| {
                let probe = self.probe.clone();
                tokio::spawn(run_probe(probe, dep).in_current_span())
            })
            .collect();

        // join_all keeps dispatch order, so slot i is always deps[i].
        let results = futures::future::join_all(
            deps.iter()
                .zip(tasks)
                .map(|(dep, task)| collect_probe(dep, task, deadline)),
        )
        .await;

        let overall = worst(results.iter().map(|r| r.status));

        if let Some(metrics) = &self.metrics {
            for (dep, result) in deps.iter().zip(&results) {
                metrics.record_result(&dep.name, result);
            }
            metrics.record_overall(overall);
        }

        let unhealthy = results.iter().filter(|r| !r.status.is_healthy()).count();
        info!(
            "Health check complete: {} ({} of {} dependencies degraded)",
            overall,
            unhealthy,
            results.len()
        );

        (overall, results)
    }
}

async fn run_probe(probe: Arc<HttpProbe>, dep: DependencyDescriptor) -> HealthStatusResult {
    match dep.handler {
        Some(CheckHandler::Blocking(handler)) => {
            match tokio::task::spawn_blocking(move || handler()).await {
                Ok(result) => result,
                Err(e) => handler_fault(&dep.name, e),
            }
        }
        Some(CheckHandler::Async(check)) => check.check().await,
        None => {
            let mut result = probe.check_url(&dep.connection).await;
            result.name = dep.name;
            result
        }
    }
}

async fn collect_probe(
    dep: &DependencyDescriptor,
    mut task: JoinHandle<HealthStatusResult>,
    deadline: Option<Instant>,
) -> HealthStatusResult {
    let joined = match deadline {
        Some(at) => match timeout_at(at, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                task.abort();
                warn!("{} did not finish before the check deadline", dep.name);
                return HealthStatusResult::critical("deadline exceeded")
                    .with_name(dep.name.clone())
                    .with_resource(dep.connection.clone());
            }
        },
        None => task.await,
    };

    match joined {
        Ok(result) => {
            debug!("{} finished with {}", dep.name, result.status);
            result
        }
        Err(e) => handler_fault(&dep.name, e),
    }
}

fn handler_fault(name: &str, err: JoinError) -> HealthStatusResult {
    let message = if err.is_panic() {
        format!("check panicked: {}", panic_message(err.into_panic()))
    } else {
        format!("check was cancelled: {}", err)
    };
    error!("{} failed: {}", name, message);
    HealthStatusResult::critical(message).with_name(name)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Checks `deps` with the default probe configuration.
pub async fn check_deps(deps: &[DependencyDescriptor]) -> (HealthStatus, Vec<HealthStatusResult>) {
    match HealthChecker::new(CheckConfig::default(), None) {
        Ok(checker) => checker.check_deps(deps).await,
        Err(e) => {
            error!("Unable to build health checker: {}", e);
            let results = deps
                .iter()
                .map(|dep| {
                    HealthStatusResult::critical(e.to_string())
                        .with_name(dep.name.clone())
                        .with_resource(dep.connection.clone())
                })
                .collect::<Vec<_>>();
            (worst(results.iter().map(|r| r.status)), results)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::AsyncCheck;
    use async_trait::async_trait;
    use std::time::Duration;

    fn fixed(status: HealthStatus, name: &str) -> DependencyDescriptor {
        let result = HealthStatusResult::new(status).with_name(name);
        DependencyDescriptor::custom(name, move || result.clone())
    }

    struct Sleepy(Duration);

    #[async_trait]
    impl AsyncCheck for Sleepy {
        async fn check(&self) -> HealthStatusResult {
            tokio::time::sleep(self.0).await;
            HealthStatusResult::new(HealthStatus::OK).with_name("sleepy")
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_not_set() {
        let (overall, results) = check_deps(&[]).await;
        assert_eq!(overall, HealthStatus::NotSet);
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_worst_status_wins() {
        let deps = vec![
            fixed(HealthStatus::OK, "a"),
            fixed(HealthStatus::Warning, "b"),
            fixed(HealthStatus::OK, "c"),
        ];
        let (overall, _) = check_deps(&deps).await;
        assert_eq!(overall, HealthStatus::Warning);

        let deps = vec![
            fixed(HealthStatus::Warning, "a"),
            fixed(HealthStatus::Critical, "b"),
        ];
        let (overall, _) = check_deps(&deps).await;
        assert_eq!(overall, HealthStatus::Critical);

        let deps = vec![fixed(HealthStatus::NotSet, "a")];
        let (overall, _) = check_deps(&deps).await;
        assert_eq!(overall, HealthStatus::NotSet);
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        // Earlier entries finish last.
        let deps: Vec<_> = (0..6u64)
            .map(|i| {
                let name = format!("dep-{}", i);
                let result_name = name.clone();
                DependencyDescriptor::custom(name, move || {
                    std::thread::sleep(Duration::from_millis(60 - i * 10));
                    HealthStatusResult::new(HealthStatus::OK).with_name(result_name.clone())
                })
            })
            .collect();

        let (_, results) = check_deps(&deps).await;
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["dep-0", "dep-1", "dep-2", "dep-3", "dep-4", "dep-5"]);
    }

    #[tokio::test]
    async fn test_custom_result_is_returned_verbatim() {
        let expected = HealthStatusResult {
            status: HealthStatus::OK,
            name: "Test Func".to_string(),
            resource: "None".to_string(),
            request_duration_ms: 42.0,
            http_status_code: 0,
            message: None,
        };
        let returned = expected.clone();
        let deps = vec![DependencyDescriptor::custom("ignored", move || returned.clone())];

        let (_, results) = check_deps(&deps).await;
        assert_eq!(results, vec![expected]);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_critical() {
        let deps = vec![
            fixed(HealthStatus::OK, "fine"),
            DependencyDescriptor::custom("boom", || panic!("database driver exploded")),
        ];

        let (overall, results) = check_deps(&deps).await;
        assert_eq!(overall, HealthStatus::Critical);
        assert_eq!(results[0].status, HealthStatus::OK);
        assert_eq!(results[1].status, HealthStatus::Critical);
        assert_eq!(results[1].name, "boom");
        assert!(results[1]
            .message
            .as_deref()
            .unwrap()
            .contains("database driver exploded"));
    }

    #[tokio::test]
    async fn test_deadline_marks_pending_checks_critical() {
        let config = CheckConfig {
            deadline_ms: Some(100),
            ..CheckConfig::default()
        };
        let checker = HealthChecker::new(config, None).unwrap();
        let deps = vec![
            fixed(HealthStatus::OK, "quick"),
            DependencyDescriptor::custom_async("stuck", Sleepy(Duration::from_secs(30)))
                .with_connection("tcp://stuck:1"),
        ];

        let started = std::time::Instant::now();
        let (overall, results) = checker.check_deps(&deps).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(overall, HealthStatus::Critical);
        assert_eq!(results[0].status, HealthStatus::OK);
        assert_eq!(results[1].status, HealthStatus::Critical);
        assert_eq!(results[1].name, "stuck");
        assert_eq!(results[1].resource, "tcp://stuck:1");
        assert_eq!(results[1].message.as_deref(), Some("deadline exceeded"));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let zero_timeout = CheckConfig {
            request_timeout_ms: 0,
            ..CheckConfig::default()
        };
        assert!(matches!(
            HealthChecker::new(zero_timeout, None),
            Err(HealthError::InvalidConfig(_))
        ));

        let zero_deadline = CheckConfig {
            deadline_ms: Some(0),
            ..CheckConfig::default()
        };
        assert!(matches!(
            HealthChecker::new(zero_deadline, None),
            Err(HealthError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_async_handler_within_deadline() {
        let config = CheckConfig {
            deadline_ms: Some(2_000),
            ..CheckConfig::default()
        };
        let checker = HealthChecker::new(config, None).unwrap();
        let deps = vec![DependencyDescriptor::custom_async(
            "sleepy",
            Sleepy(Duration::from_millis(10)),
        )];

        let (overall, results) = checker.check_deps(&deps).await;
        assert_eq!(overall, HealthStatus::OK);
        assert_eq!(results[0].name, "sleepy");
    }

    #[tokio::test]
    async fn test_records_metrics() {
        let registry = crate::metrics::MetricsRegistry::new().unwrap();
        let checker =
            HealthChecker::new(CheckConfig::default(), Some(registry.collector())).unwrap();
        let deps = vec![
            fixed(HealthStatus::OK, "a"),
            fixed(HealthStatus::Critical, "b"),
        ];

        checker.check_deps(&deps).await;

        let collector = registry.collector();
        assert_eq!(collector.overall_status.get(), 3);
        assert_eq!(
            collector.probes_total.with_label_values(&["b", "Critical"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_metrics_use_declared_names() {
        let registry = crate::metrics::MetricsRegistry::new().unwrap();
        let checker =
            HealthChecker::new(CheckConfig::default(), Some(registry.collector())).unwrap();
        // handlers that leave name and resource empty
        let deps = vec![
            DependencyDescriptor::custom("queue", || HealthStatusResult::new(HealthStatus::OK)),
            DependencyDescriptor::custom("cache", || {
                HealthStatusResult::new(HealthStatus::Warning)
            }),
        ];

        let (_, results) = checker.check_deps(&deps).await;
        assert!(results.iter().all(|r| r.name.is_empty()));

        let collector = registry.collector();
        assert_eq!(
            collector.probes_total.with_label_values(&["queue", "OK"]).get(),
            1
        );
        assert_eq!(
            collector.probes_total.with_label_values(&["cache", "Warning"]).get(),
            1
        );
        assert_eq!(collector.dependency_status.with_label_values(&["queue"]).get(), 1);
        assert_eq!(collector.dependency_status.with_label_values(&["cache"]).get(), 2);

        let text = String::from_utf8(registry.gather().unwrap()).unwrap();
        assert!(!text.contains("dependency=\"\""));
    }
}
