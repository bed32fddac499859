//! Prometheus request metrics, served at `/metrics`.

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Shared middleware handle; one registry per process.
pub static METRICS: Lazy<PrometheusMetrics> = Lazy::new(|| {
    let labels = HashMap::from([("service".to_owned(), "campaigns".to_owned())]);
    PrometheusMetricsBuilder::new("api")
        .endpoint("/metrics")
        .const_labels(labels)
        .exclude("/api/healthz")
        .build()
        .expect("metrics builder")
});
