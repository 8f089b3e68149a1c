use super::constants::*;
use crate::core::{MessageInterest, ProducerId, ProducerScope};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Longest a recovery may run before the next sweep replaces it
    #[serde(default = "default_max_recovery_duration")]
    pub max_recovery_duration_secs: u64,

    /// Inactivity budget for system alives and processing lag
    #[serde(default = "default_longest_inactivity_interval")]
    pub longest_inactivity_interval_secs: u64,

    /// Period of the health-check sweep
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_secs: u64,

    /// Disambiguates recovery requests when several consumers share a producer
    #[serde(default)]
    pub node_id: Option<i32>,

    /// Interests of the sessions this consumer opens
    #[serde(default = "default_session_interests")]
    pub session_interests: Vec<MessageInterest>,

    /// Statically configured producers
    #[serde(default)]
    pub producers: Vec<ProducerConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Static description of one upstream producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerConfig {
    pub id: ProducerId,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Traffic partitions this producer publishes on
    pub scopes: Vec<ProducerScope>,

    /// Per-producer override of `longest_inactivity_interval_secs`
    #[serde(default)]
    pub max_inactivity_seconds: Option<u64>,

    /// How far back the upstream can replay for this producer
    #[serde(default = "default_recovery_window")]
    pub recovery_window_minutes: u64,

    #[serde(default = "default_active")]
    pub active: bool,
}

impl ProducerConfig {
    /// Active producer with default budgets
    pub fn new(id: ProducerId, name: impl Into<String>, scopes: Vec<ProducerScope>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            scopes,
            max_inactivity_seconds: None,
            recovery_window_minutes: DEFAULT_RECOVERY_WINDOW_MINUTES,
            active: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json: bool,
}

impl RecoveryConfig {
    /// Configuration with defaults for everything but the producer list
    pub fn with_producers(producers: Vec<ProducerConfig>) -> Self {
        Self {
            max_recovery_duration_secs: default_max_recovery_duration(),
            longest_inactivity_interval_secs: default_longest_inactivity_interval(),
            health_check_interval_secs: default_health_check_interval(),
            node_id: None,
            session_interests: default_session_interests(),
            producers,
            logging: LoggingConfig::default(),
        }
    }

    pub fn max_recovery_duration(&self) -> Duration {
        Duration::from_secs(self.max_recovery_duration_secs)
    }

    pub fn longest_inactivity_interval(&self) -> Duration {
        Duration::from_secs(self.longest_inactivity_interval_secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

// Default value functions
fn default_max_recovery_duration() -> u64 {
    DEFAULT_MAX_RECOVERY_DURATION_SECS
}

fn default_longest_inactivity_interval() -> u64 {
    DEFAULT_LONGEST_INACTIVITY_INTERVAL_SECS
}

fn default_health_check_interval() -> u64 {
    DEFAULT_HEALTH_CHECK_INTERVAL_SECS
}

fn default_session_interests() -> Vec<MessageInterest> {
    vec![MessageInterest::AllMessages]
}

fn default_recovery_window() -> u64 {
    DEFAULT_RECOVERY_WINDOW_MINUTES
}

fn default_active() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
