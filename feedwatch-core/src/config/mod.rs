pub mod constants;
pub mod types;

pub use types::*;

use anyhow::{Context, Result};
use config::{Config as ConfigLoader, Environment, File};
use constants::*;
use std::collections::HashSet;
use std::path::Path;

impl RecoveryConfig {
    /// Load configuration from file with optional environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();

        let config = ConfigLoader::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load from TOML file
            .add_source(File::from(config_path))
            // Override with environment variables (FEEDWATCH__)
            .add_source(
                Environment::with_prefix("FEEDWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to build configuration from {}", config_path.display()))?;

        // Deserialize into RecoveryConfig struct
        let cfg: RecoveryConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        cfg.validate()?;

        Ok(cfg)
    }

    /// Load from default location (./config/feedwatch.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("config/feedwatch.toml")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(MIN_MAX_RECOVERY_DURATION_SECS..=MAX_MAX_RECOVERY_DURATION_SECS)
            .contains(&self.max_recovery_duration_secs)
        {
            anyhow::bail!(
                "max_recovery_duration_secs must be between {} and {}, got {}",
                MIN_MAX_RECOVERY_DURATION_SECS,
                MAX_MAX_RECOVERY_DURATION_SECS,
                self.max_recovery_duration_secs
            );
        }

        if !(MIN_LONGEST_INACTIVITY_INTERVAL_SECS..=MAX_LONGEST_INACTIVITY_INTERVAL_SECS)
            .contains(&self.longest_inactivity_interval_secs)
        {
            anyhow::bail!(
                "longest_inactivity_interval_secs must be between {} and {}, got {}",
                MIN_LONGEST_INACTIVITY_INTERVAL_SECS,
                MAX_LONGEST_INACTIVITY_INTERVAL_SECS,
                self.longest_inactivity_interval_secs
            );
        }

        // Sweep must run more often than the inactivity budget
        if self.health_check_interval_secs == 0
            || self.health_check_interval_secs >= self.longest_inactivity_interval_secs
        {
            anyhow::bail!(
                "health_check_interval_secs must be positive and below the inactivity interval ({}), got {}",
                self.longest_inactivity_interval_secs,
                self.health_check_interval_secs
            );
        }

        if let Some(node_id) = self.node_id {
            if node_id < 0 {
                anyhow::bail!("node_id must be non-negative, got {}", node_id);
            }
        }

        if self.session_interests.is_empty() {
            anyhow::bail!("at least one session interest must be configured");
        }

        if self.producers.is_empty() {
            anyhow::bail!("at least one producer must be configured");
        }

        let mut seen = HashSet::new();
        for producer in &self.producers {
            if producer.id == 0 {
                anyhow::bail!("producer '{}' has invalid id 0", producer.name);
            }
            if !seen.insert(producer.id) {
                anyhow::bail!("producer {} configured more than once", producer.id);
            }
            if producer.scopes.is_empty() {
                anyhow::bail!("producer {} has no scopes", producer.id);
            }
            if producer.max_inactivity_seconds == Some(0) {
                anyhow::bail!("producer {} max_inactivity_seconds must be positive", producer.id);
            }
        }

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}', must be one of: {:?}",
                self.logging.level,
                valid_log_levels
            );
        }

        Ok(())
    }
}
