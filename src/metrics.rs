//! Prometheus metrics collection for VexaRoute
//!
//! Tracks:
//! - Dispatched requests by model and category
//! - Which classification strategy produced the category
//! - Fallback invocations and provider failures
//! - Rate-limit rejections
//! - Accumulated cost and provider latency per model
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.
//! Every label value comes from a closed enum, so cardinality is bounded by
//! the model catalog.

use crate::models::{ModelId, Provider};
use crate::router::{Category, ClassificationSource};
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
///
/// Cloning shares the underlying registry.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    classifications_total: IntCounterVec,
    fallbacks_total: IntCounterVec,
    provider_errors_total: IntCounterVec,
    rate_limited_total: IntCounter,
    cost_usd_total: CounterVec,
    dispatch_duration: HistogramVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 4 models × 3 categories
        let requests_total = IntCounterVec::new(
            Opts::new(
                "vexaroute_requests_total",
                "Total number of answered queries by serving model and category",
            ),
            &["model", "category"],
        )?;

        let classifications_total = IntCounterVec::new(
            Opts::new(
                "vexaroute_classifications_total",
                "Total number of classifications by the strategy that produced the category",
            ),
            &["source"],
        )?;

        let fallbacks_total = IntCounterVec::new(
            Opts::new(
                "vexaroute_fallbacks_total",
                "Total number of fallback invocations by the primary model that failed",
            ),
            &["primary_model"],
        )?;

        let provider_errors_total = IntCounterVec::new(
            Opts::new(
                "vexaroute_provider_errors_total",
                "Total number of failed provider calls by provider and error kind",
            ),
            &["provider", "kind"],
        )?;

        let rate_limited_total = IntCounter::with_opts(Opts::new(
            "vexaroute_rate_limited_total",
            "Total number of queries rejected by the request-rate window",
        ))?;

        let cost_usd_total = CounterVec::new(
            Opts::new(
                "vexaroute_cost_usd_total",
                "Accumulated provider cost in USD by serving model",
            ),
            &["model"],
        )?;

        let dispatch_duration = HistogramVec::new(
            HistogramOpts::new(
                "vexaroute_dispatch_duration_seconds",
                "Provider call latency in seconds by serving model",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["model"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(classifications_total.clone()))?;
        registry.register(Box::new(fallbacks_total.clone()))?;
        registry.register(Box::new(provider_errors_total.clone()))?;
        registry.register(Box::new(rate_limited_total.clone()))?;
        registry.register(Box::new(cost_usd_total.clone()))?;
        registry.register(Box::new(dispatch_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            classifications_total,
            fallbacks_total,
            provider_errors_total,
            rate_limited_total,
            cost_usd_total,
            dispatch_duration,
        })
    }

    pub fn record_classification(&self, source: ClassificationSource) {
        self.classifications_total
            .with_label_values(&[source.as_str()])
            .inc();
    }

    pub fn record_fallback(&self, primary: ModelId) {
        self.fallbacks_total
            .with_label_values(&[primary.as_str()])
            .inc();
    }

    pub fn record_provider_error(&self, provider: Provider, kind: &'static str) {
        self.provider_errors_total
            .with_label_values(&[provider.as_str(), kind])
            .inc();
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited_total.inc();
    }

    pub fn rate_limited_count(&self) -> u64 {
        self.rate_limited_total.get()
    }

    /// Record a served query: request count, cost and provider latency
    ///
    /// # Errors
    ///
    /// Returns an error if `cost_usd` or `duration_seconds` is NaN, infinite
    /// or negative. Such values would corrupt the counter and histogram.
    pub fn record_dispatch(
        &self,
        model: ModelId,
        category: Category,
        cost_usd: f64,
        duration_seconds: f64,
    ) -> Result<(), prometheus::Error> {
        for (name, value) in [("cost_usd", cost_usd), ("duration_seconds", duration_seconds)] {
            if !value.is_finite() || value < 0.0 {
                return Err(prometheus::Error::Msg(format!(
                    "{} must be finite and non-negative, got: {}",
                    name, value
                )));
            }
        }

        self.requests_total
            .with_label_values(&[model.as_str(), category.as_str()])
            .inc();
        self.cost_usd_total
            .with_label_values(&[model.as_str()])
            .inc_by(cost_usd);
        self.dispatch_duration
            .with_label_values(&[model.as_str()])
            .observe(duration_seconds);
        Ok(())
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();

        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            tracing::error!(
                error = %e,
                metric_family_count = metric_count,
                "Prometheus text encoder failed"
            );
            prometheus::Error::Msg(format!(
                "Failed to encode {} metric families: {}",
                metric_count, e
            ))
        })?;

        String::from_utf8(buffer).map_err(|e| {
            tracing::error!(
                invalid_byte_index = e.utf8_error().valid_up_to(),
                "Prometheus encoder produced invalid UTF-8"
            );
            prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e))
        })
    }
}
