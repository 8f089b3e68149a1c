//! Producer status notifications
//!
//! Listeners are called while the producer's lock is held, so the
//! up/down/status-change sequence of one producer is totally ordered. A
//! panicking listener is logged and skipped.

use crate::core::{ProducerDownReason, ProducerId, ProducerStatusReason, ProducerUpReason};
use crate::utils::panic::panic_message;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info, warn};

/// Receives producer transitions
pub trait StatusListener: Send + Sync {
    fn on_producer_up(&self, producer_id: ProducerId, reason: ProducerUpReason);

    fn on_producer_down(&self, producer_id: ProducerId, reason: ProducerDownReason);

    fn on_producer_status_change(&self, producer_id: ProducerId, reason: ProducerStatusReason);
}

fn guarded<F: FnOnce()>(producer_id: ProducerId, callback: &str, f: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        error!(
            producer_id,
            callback,
            message = %panic_message(payload.as_ref()),
            "Status listener panicked"
        );
    }
}

pub(crate) fn notify_up(listener: &dyn StatusListener, producer_id: ProducerId, reason: ProducerUpReason) {
    guarded(producer_id, "on_producer_up", || {
        listener.on_producer_up(producer_id, reason)
    });
}

pub(crate) fn notify_down(
    listener: &dyn StatusListener,
    producer_id: ProducerId,
    reason: ProducerDownReason,
) {
    guarded(producer_id, "on_producer_down", || {
        listener.on_producer_down(producer_id, reason)
    });
}

pub(crate) fn notify_status_change(
    listener: &dyn StatusListener,
    producer_id: ProducerId,
    reason: ProducerStatusReason,
) {
    guarded(producer_id, "on_producer_status_change", || {
        listener.on_producer_status_change(producer_id, reason)
    });
}

/// Listener that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingStatusListener;

impl StatusListener for LoggingStatusListener {
    fn on_producer_up(&self, producer_id: ProducerId, reason: ProducerUpReason) {
        info!(producer_id, ?reason, "Producer up");
    }

    fn on_producer_down(&self, producer_id: ProducerId, reason: ProducerDownReason) {
        warn!(producer_id, ?reason, "Producer down");
    }

    fn on_producer_status_change(&self, producer_id: ProducerId, reason: ProducerStatusReason) {
        info!(producer_id, reason = %reason, "Producer status changed");
    }
}
