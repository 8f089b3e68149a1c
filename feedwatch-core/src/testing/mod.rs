//! Testing utilities and mocks for integration tests
//!
//! Provides:
//! - ManualClock / ManualScheduler: deterministic time and task execution
//! - RecordingIssuer / RecordingListener: capture outbound calls
//! - TestHarness: recovery manager wired to all of the above

pub mod helpers;
pub mod mocks;

pub use helpers::*;
pub use mocks::{
    ManualClock, ManualScheduler, RecordingIssuer, RecordingListener, StatusEvent,
    DEFAULT_START_MILLIS,
};
