//! Prometheus metrics for producer health and recovery
//!
//! Provides metrics for:
//! - Recovery activity (started, completed, failed, stale completions)
//! - Status transitions by reason
//! - Current up/down state per producer
//! - Recovery duration

use crate::core::{ProducerId, ProducerStatusReason};
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Recovery metric families and the registry they live in
#[derive(Clone)]
pub struct RecoveryMetrics {
    registry: Arc<Registry>,
    /// Recovery requests dispatched
    pub recoveries_started_total: IntCounterVec,
    /// Recoveries certified by snapshot completes
    pub recoveries_completed_total: IntCounterVec,
    /// Recovery requests rejected by the issuer
    pub recoveries_failed_total: IntCounterVec,
    /// Completions ignored for a superseded or interrupted id
    pub stale_completions_total: IntCounter,
    /// Up/down/status transitions by reason
    pub transitions_total: IntCounterVec,
    /// 1 while the producer is up, 0 while flagged down
    pub producer_up: IntGaugeVec,
    /// Seconds from request to final snapshot complete
    pub recovery_duration_seconds: Histogram,
}

impl RecoveryMetrics {
    /// Create the metric families on a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// Register the metric families on an existing registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let recoveries_started_total = IntCounterVec::new(
            Opts::new("recoveries_started_total", "Total recovery requests dispatched")
                .namespace("feedwatch"),
            &["producer"],
        )?;
        registry.register(Box::new(recoveries_started_total.clone()))?;

        let recoveries_completed_total = IntCounterVec::new(
            Opts::new("recoveries_completed_total", "Total recoveries completed")
                .namespace("feedwatch"),
            &["producer"],
        )?;
        registry.register(Box::new(recoveries_completed_total.clone()))?;

        let recoveries_failed_total = IntCounterVec::new(
            Opts::new("recoveries_failed_total", "Total recovery requests that failed to issue")
                .namespace("feedwatch"),
            &["producer"],
        )?;
        registry.register(Box::new(recoveries_failed_total.clone()))?;

        let stale_completions_total = IntCounter::new(
            "feedwatch_stale_completions_total",
            "Snapshot completes ignored for a non-current recovery",
        )?;
        registry.register(Box::new(stale_completions_total.clone()))?;

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Producer status transitions")
                .namespace("feedwatch"),
            &["producer", "reason"],
        )?;
        registry.register(Box::new(transitions_total.clone()))?;

        let producer_up = IntGaugeVec::new(
            Opts::new("producer_up", "Producer status (1 = up, 0 = down)").namespace("feedwatch"),
            &["producer"],
        )?;
        registry.register(Box::new(producer_up.clone()))?;

        let recovery_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "feedwatch_recovery_duration_seconds",
                "Time from recovery request to completion",
            )
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0, 1800.0, 3600.0]),
        )?;
        registry.register(Box::new(recovery_duration_seconds.clone()))?;

        info!("Recovery metrics registered");

        Ok(Self {
            registry,
            recoveries_started_total,
            recoveries_completed_total,
            recoveries_failed_total,
            stale_completions_total,
            transitions_total,
            producer_up,
            recovery_duration_seconds,
        })
    }

    /// Get the underlying Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_recovery_started(&self, producer_id: ProducerId) {
        self.recoveries_started_total
            .with_label_values(&[producer_id.to_string().as_str()])
            .inc();
    }

    pub fn record_recovery_completed(&self, producer_id: ProducerId, elapsed: Duration) {
        self.recoveries_completed_total
            .with_label_values(&[producer_id.to_string().as_str()])
            .inc();
        self.recovery_duration_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn record_recovery_failed(&self, producer_id: ProducerId) {
        self.recoveries_failed_total
            .with_label_values(&[producer_id.to_string().as_str()])
            .inc();
    }

    pub fn record_stale_completion(&self) {
        self.stale_completions_total.inc();
    }

    /// Count a status change and update the up gauge
    pub fn record_transition(&self, producer_id: ProducerId, reason: ProducerStatusReason, up: bool) {
        let producer = producer_id.to_string();
        self.transitions_total
            .with_label_values(&[producer.as_str(), reason.as_str()])
            .inc();
        self.producer_up
            .with_label_values(&[producer.as_str()])
            .set(if up { 1 } else { 0 });
    }
}
