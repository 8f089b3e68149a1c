//! Monitoring and observability module
//!
//! Prometheus metric families for recovery activity and producer status.
//! Exposition is left to the embedding application via `RecoveryMetrics::registry()`.

pub mod metrics;

pub use metrics::RecoveryMetrics;
