use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing logger
///
/// `RUST_LOG` wins over `log_level` when set. Returns an error if a global
/// subscriber was already installed.
pub fn init_logger(log_level: &str, json_logs: bool) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(false))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .try_init()?;
    }

    Ok(())
}

/// Initialize from the `[logging]` section of the configuration
pub fn init_from_config(config: &LoggingConfig) -> anyhow::Result<()> {
    init_logger(&config.level, config.json)
}
