//! Defaults and accepted ranges for recovery configuration

// ===== RECOVERY =====

/// Longest a recovery may run before it is considered interrupted
/// Default: 60 minutes
pub const DEFAULT_MAX_RECOVERY_DURATION_SECS: u64 = 60 * 60;
pub const MIN_MAX_RECOVERY_DURATION_SECS: u64 = 10 * 60;
pub const MAX_MAX_RECOVERY_DURATION_SECS: u64 = 60 * 60;

/// Replay window the upstream keeps per producer
/// Default: 72 hours. Older replay points fall back to a full recovery.
pub const DEFAULT_RECOVERY_WINDOW_MINUTES: u64 = 72 * 60;

// ===== HEALTH CHECK =====

/// Inactivity budget for system heartbeats and processing lag
/// Default: 20 seconds
pub const DEFAULT_LONGEST_INACTIVITY_INTERVAL_SECS: u64 = 20;
pub const MIN_LONGEST_INACTIVITY_INTERVAL_SECS: u64 = 20;
pub const MAX_LONGEST_INACTIVITY_INTERVAL_SECS: u64 = 180;

/// Period of the health-check sweep
/// Default: 10 seconds
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 10;

// ===== SEQUENCE =====

/// Upper bound for the random starting point of recovery ids
pub const RECOVERY_ID_SEED_MAX: u64 = 1_000_000;
