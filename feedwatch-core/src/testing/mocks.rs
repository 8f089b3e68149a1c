//! Deterministic stand-ins for the recovery manager's collaborators

use crate::core::{
    CommunicationError, ProducerDownReason, ProducerId, ProducerStatusReason, ProducerUpReason,
    Timestamp,
};
use crate::recovery::{RecoveryRequest, RecoveryRequestIssuer};
use crate::runtime::scheduler::run_guarded;
use crate::runtime::time::from_millis;
use crate::runtime::{OneShotTask, PeriodicTask, TaskScheduler, TimeSource};
use crate::status::StatusListener;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

/// 2023-11-14T22:13:20Z
pub const DEFAULT_START_MILLIS: Timestamp = 1_700_000_000_000;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn set(&self, millis: Timestamp) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DEFAULT_START_MILLIS)
    }
}

impl TimeSource for ManualClock {
    fn now_millis(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }

    fn now_instant(&self) -> SystemTime {
        from_millis(self.now_millis())
    }
}

/// Scheduler that runs one-shots inline and fires the periodic task on `tick()`
#[derive(Default)]
pub struct ManualScheduler {
    periodic: Mutex<Vec<(String, PeriodicTask)>>,
    one_shot_runs: AtomicUsize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire every registered periodic task once
    pub fn tick(&self) {
        let periodic = self.periodic.lock();
        for (name, task) in periodic.iter() {
            run_guarded(name, task);
        }
    }

    pub fn periodic_names(&self) -> Vec<String> {
        self.periodic.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// One-shot tasks executed so far
    pub fn one_shot_runs(&self) -> usize {
        self.one_shot_runs.load(Ordering::SeqCst)
    }
}

impl TaskScheduler for ManualScheduler {
    fn run_periodic(&self, name: &str, _interval: Duration, task: PeriodicTask) {
        self.periodic.lock().push((name.to_string(), task));
    }

    fn run_once(&self, name: &str, task: OneShotTask) {
        self.one_shot_runs.fetch_add(1, Ordering::SeqCst);
        run_guarded(name, task);
    }
}

/// Issuer that records every request and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingIssuer {
    requests: Mutex<Vec<RecoveryRequest>>,
    failures_left: AtomicUsize,
}

impl RecordingIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` requests with a transport error
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<RecoveryRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, producer_id: ProducerId) -> Vec<RecoveryRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.producer_id == producer_id)
            .cloned()
            .collect()
    }

    pub fn last_request(&self, producer_id: ProducerId) -> Option<RecoveryRequest> {
        self.requests_for(producer_id).pop()
    }
}

impl RecoveryRequestIssuer for RecordingIssuer {
    fn request_recovery(&self, request: &RecoveryRequest) -> Result<(), CommunicationError> {
        self.requests.lock().push(request.clone());

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            Err(CommunicationError::Transport {
                producer_id: request.producer_id,
                recovery_id: request.recovery_id,
                message: "injected failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// One listener callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Up(ProducerId, ProducerUpReason),
    Down(ProducerId, ProducerDownReason),
    StatusChange(ProducerId, ProducerStatusReason),
}

impl StatusEvent {
    pub fn producer_id(&self) -> ProducerId {
        match self {
            StatusEvent::Up(id, _) | StatusEvent::Down(id, _) | StatusEvent::StatusChange(id, _) => *id,
        }
    }
}

/// Listener that keeps every callback in arrival order
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().clone()
    }

    pub fn events_for(&self, producer_id: ProducerId) -> Vec<StatusEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.producer_id() == producer_id)
            .copied()
            .collect()
    }

    pub fn up_events(&self, producer_id: ProducerId) -> Vec<ProducerUpReason> {
        self.events_for(producer_id)
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::Up(_, reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    pub fn down_events(&self, producer_id: ProducerId) -> Vec<ProducerDownReason> {
        self.events_for(producer_id)
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::Down(_, reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    pub fn status_events(&self, producer_id: ProducerId) -> Vec<ProducerStatusReason> {
        self.events_for(producer_id)
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::StatusChange(_, reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    pub fn total_events(&self) -> usize {
        self.events.lock().len()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl StatusListener for RecordingListener {
    fn on_producer_up(&self, producer_id: ProducerId, reason: ProducerUpReason) {
        self.events.lock().push(StatusEvent::Up(producer_id, reason));
    }

    fn on_producer_down(&self, producer_id: ProducerId, reason: ProducerDownReason) {
        self.events.lock().push(StatusEvent::Down(producer_id, reason));
    }

    fn on_producer_status_change(&self, producer_id: ProducerId, reason: ProducerStatusReason) {
        self.events
            .lock()
            .push(StatusEvent::StatusChange(producer_id, reason));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_manual_clock_moves_only_when_told() {
        let clock = ManualClock::default();
        assert_eq!(clock.now_millis(), DEFAULT_START_MILLIS);
        clock.advance(Duration::from_secs(3));
        assert_eq!(clock.now_millis(), DEFAULT_START_MILLIS + 3_000);
        clock.set(42);
        assert_eq!(clock.now_millis(), 42);
    }

    #[test]
    fn test_manual_scheduler_ticks_on_demand() {
        let scheduler = ManualScheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        scheduler.run_periodic(
            "tick",
            Duration::from_secs(10),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        scheduler.tick();
        scheduler.tick();
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.periodic_names(), vec!["tick".to_string()]);
    }

    #[test]
    fn test_recording_issuer_injected_failures() {
        let issuer = RecordingIssuer::new();
        issuer.fail_next(1);
        let request = RecoveryRequest {
            producer_id: 1,
            recovery_id: 10,
            since: None,
            interests: Default::default(),
            node_id: None,
            requested_at: 0,
        };

        assert!(issuer.request_recovery(&request).is_err());
        assert!(issuer.request_recovery(&request).is_ok());
        assert_eq!(issuer.requests().len(), 2);
    }
}
