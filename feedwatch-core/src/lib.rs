//! Feedwatch Core - Producer health tracking and recovery coordination
//!
//! Upstream producers publish state changes over a multiplexed messaging
//! channel. Network blips, producer restarts and processing backlogs can
//! silently desynchronize a consumer from the producer's truth. This crate
//! detects that per producer, requests targeted replays, certifies their
//! completion and exposes one well-ordered up/down signal per producer.
//!
//! ## Architecture
//! - **Per-producer locking**: every transition of one producer is serialized
//!   by its own `parking_lot::Mutex`; listeners are called under that lock
//! - **Lock-free hot path**: message-processing hooks only touch a `DashMap`
//!   until the message is finished
//! - **Deferred I/O**: recovery requests run on the scheduler's one-shot worker,
//!   never under a producer lock
//! - **Injectable collaborators**: clock, id sequence, scheduler, issuer and
//!   listener are traits, so the state machine is driven deterministically in tests
//!
//! ## Core Modules
//! - `core`: identifiers, interests, reason taxonomies, errors
//! - `config`: TOML + environment configuration
//! - `producer`: producer records and the registry
//! - `recovery`: the recovery manager, attempts and the health check
//! - `status`: status listener seam
//! - `runtime`: clock, id sequence, task scheduler
//! - `monitoring`: Prometheus metrics
//! - `testing`: manual clock/scheduler and recording collaborators

pub mod config;
pub mod core;
pub mod monitoring;
pub mod producer;
pub mod recovery;
pub mod runtime;
pub mod status;
pub mod testing;
pub mod utils;

// Re-export core types
pub use crate::core::{
    CommunicationError, MessageInterest, ProducerDownReason, ProducerId, ProducerScope,
    ProducerStatusReason, ProducerUpReason, RecoveryId, RegistryError, SessionId, Timestamp,
};

pub use config::{ProducerConfig, RecoveryConfig};
pub use producer::{Producer, ProducerManager, ProducerRegistry};
pub use recovery::{
    RecoveryManager, RecoveryRequest, RecoveryRequestIssuer, RecoveryStats, ShutdownSignal,
};
pub use status::{LoggingStatusListener, StatusListener};

// Re-export error types
pub use anyhow::{Error, Result};

/// Prelude for convenient imports
pub mod prelude {
    // Core types
    pub use crate::core::{
        MessageInterest, ProducerDownReason, ProducerId, ProducerScope, ProducerStatusReason,
        ProducerUpReason, RecoveryId, Timestamp,
    };

    // Recovery
    pub use crate::recovery::{
        RecoveryManager, RecoveryRequest, RecoveryRequestIssuer, ShutdownSignal,
    };
    pub use crate::producer::{ProducerManager, ProducerRegistry};
    pub use crate::status::StatusListener;

    // Runtime
    pub use crate::runtime::{SystemClock, TaskScheduler, ThreadTaskScheduler, TimeSource};

    // Configuration
    pub use crate::config::RecoveryConfig;

    // Error types
    pub use crate::{Error, Result};
}
