// src/metrics/collector.rs
use crate::health::{HealthStatus, HealthStatusResult};
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Per-dependency metrics
    pub probes_total: IntCounterVec,
    pub probe_duration_seconds: HistogramVec,
    pub dependency_status: IntGaugeVec,

    // Whole-service metrics
    pub overall_status: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let probes_total = IntCounterVec::new(
            Opts::new("healthcheck_probes_total", "Total number of dependency probes"),
            &["dependency", "status"],
        )?;
        registry.register(Box::new(probes_total.clone()))?;

        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "healthcheck_probe_duration_seconds",
                "Dependency probe duration in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["dependency"],
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;

        let dependency_status = IntGaugeVec::new(
            Opts::new(
                "healthcheck_dependency_status",
                "Last observed severity per dependency (0=NotSet, 1=OK, 2=Warning, 3=Critical)",
            ),
            &["dependency"],
        )?;
        registry.register(Box::new(dependency_status.clone()))?;

        let overall_status = IntGauge::new(
            "healthcheck_overall_status",
            "Severity of the last completed check cycle",
        )?;
        registry.register(Box::new(overall_status.clone()))?;

        Ok(Self {
            probes_total,
            probe_duration_seconds,
            dependency_status,
            overall_status,
        })
    }

    /// Records one probe outcome under the declared dependency name. Custom
    /// handlers may leave `result.name` empty or unstable, so it is not used
    /// as a label.
    pub fn record_result(&self, dependency: &str, result: &HealthStatusResult) {
        self.probes_total
            .with_label_values(&[dependency, result.status.name()])
            .inc();
        self.probe_duration_seconds
            .with_label_values(&[dependency])
            .observe(result.request_duration_ms / 1000.0);
        self.dependency_status
            .with_label_values(&[dependency])
            .set(result.status.as_i32() as i64);
    }

    pub fn record_overall(&self, status: HealthStatus) {
        self.overall_status.set(status.as_i32() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_probe_results() {
        let registry = MetricsRegistry::new().unwrap();
        let collector = registry.collector();

        let result = HealthStatusResult::new(HealthStatus::Warning).with_duration_ms(120.0);
        collector.record_result("billing", &result);
        collector.record_overall(HealthStatus::Warning);

        assert_eq!(
            collector
                .probes_total
                .with_label_values(&["billing", "Warning"])
                .get(),
            1
        );
        assert_eq!(
            collector.dependency_status.with_label_values(&["billing"]).get(),
            2
        );
        assert_eq!(collector.overall_status.get(), 2);

        let text = String::from_utf8(registry.gather().unwrap()).unwrap();
        assert!(text.contains("healthcheck_probes_total"));
        assert!(text.contains("healthcheck_probe_duration_seconds"));
    }
}
