//! Common utilities for all binaries
//!
//! Shared initialization, CLI parsing, and setup code.

use anyhow::{Context, Result};
use clap::Parser;
use feedwatch_core::config::{ProducerConfig, RecoveryConfig};
use feedwatch_core::core::ProducerScope;
use feedwatch_core::recovery::RecoveryStats;
use std::path::PathBuf;

/// Common CLI arguments for all binaries
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Configuration file (TOML); synthetic producers are used when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of synthetic producers when no config file is given
    #[arg(short, long, default_value = "3")]
    pub producers: u32,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    pub json_logs: bool,
}

impl CommonArgs {
    /// Load the configured file or build a synthetic configuration
    pub fn recovery_config(&self) -> Result<RecoveryConfig> {
        match &self.config {
            Some(path) => RecoveryConfig::load(path)
                .with_context(|| format!("Failed to load {}", path.display())),
            None => {
                let config = synthetic_config(self.producers);
                config.validate()?;
                Ok(config)
            }
        }
    }
}

/// Initialize tracing/logging
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    feedwatch_core::utils::init_logger(level, json)
}

/// Producers 1..=count cycling through live, prematch and mixed scopes
pub fn synthetic_config(count: u32) -> RecoveryConfig {
    let producers = (1..=count)
        .map(|id| {
            let scopes = match id % 3 {
                1 => vec![ProducerScope::Live],
                2 => vec![ProducerScope::Prematch],
                _ => vec![ProducerScope::Prematch, ProducerScope::Live],
            };
            ProducerConfig::new(id, format!("sim-{}", id), scopes)
        })
        .collect();
    RecoveryConfig::with_producers(producers)
}

/// Print final statistics
pub fn print_stats(stats: &RecoveryStats) {
    tracing::info!("=== Final Statistics ===");
    tracing::info!("Recoveries started: {}", stats.recoveries_started);
    tracing::info!("Recoveries completed: {}", stats.recoveries_completed);
    tracing::info!("Recoveries failed: {}", stats.recoveries_failed);
    tracing::info!("Stale completions: {}", stats.stale_completions);
    tracing::info!("Health checks: {}", stats.health_checks);
    tracing::info!("Producers up/down: {}/{}", stats.producers_up, stats.producers_down);
    tracing::info!("Completion rate: {:.2}%", stats.completion_rate());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_config_is_valid() {
        let config = synthetic_config(5);
        assert!(config.validate().is_ok());
        assert_eq!(config.producers.len(), 5);
        assert_eq!(
            config.producers[2].scopes,
            vec![ProducerScope::Prematch, ProducerScope::Live]
        );
    }

    #[test]
    fn test_args_parse() {
        let args = CommonArgs::parse_from(["feedwatch-sim", "--producers", "4", "--json-logs"]);
        assert_eq!(args.producers, 4);
        assert!(args.json_logs);
        assert!(args.config.is_none());
        assert_eq!(args.recovery_config().unwrap().producers.len(), 4);
    }
}
