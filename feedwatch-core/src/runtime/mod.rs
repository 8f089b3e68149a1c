//! Collaborators the recovery core is driven by
//!
//! - `TimeSource`: injectable clock
//! - `SequenceGenerator`: recovery id allocation
//! - `TaskScheduler`: health-check tick and deferred recovery requests

pub mod scheduler;
pub mod sequence;
pub mod time;

pub use scheduler::{OneShotTask, PeriodicTask, TaskScheduler, ThreadTaskScheduler};
pub use sequence::{AtomicSequenceGenerator, SequenceGenerator};
pub use time::{SystemClock, TimeSource};
