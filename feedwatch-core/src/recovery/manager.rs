//! Recovery manager: event handlers and the per-producer state machine
//!
//! Every transition of one producer happens under that producer's mutex and
//! status callbacks are dispatched before the lock is released. Recovery
//! requests are handed to the scheduler's one-shot worker after the lock is
//! dropped; a failed request is rolled back if its id is still current.
//!
//! ```text
//!            alive / sweep                 snapshot complete (all interests)
//!  DOWN ──────────────────────▶ RECOVERING ───────────────────────────────▶ UP
//!   ▲                             │  timeout / disconnect / stale alives      │
//!   │                             ▼                                           │
//!   │                        INTERRUPTED ──(next alive or sweep)──▶ RECOVERING│
//!   └───────────── alive violation / unsubscribed / queue delay ──────────────┘
//! ```

use super::channel::{ChannelState, ShutdownSignal};
use super::issuer::{RecoveryRequest, RecoveryRequestIssuer};
use super::RecoveryAttempt;
use crate::config::RecoveryConfig;
use crate::core::{
    MessageInterest, ProducerDownReason, ProducerId, ProducerStatusReason, ProducerUpReason,
    RecoveryId, SessionId, Timestamp,
};
use crate::monitoring::RecoveryMetrics;
use crate::producer::{AliveChannel, Producer, ProducerHandle, ProducerManager};
use crate::runtime::{
    AtomicSequenceGenerator, SequenceGenerator, SystemClock, TaskScheduler, ThreadTaskScheduler,
    TimeSource,
};
use crate::status::{self, LoggingStatusListener, StatusListener};
use anyhow::{Context, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Message currently in the processing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    pub received_at: Timestamp,
    pub recovery_id: Option<RecoveryId>,
}

/// Counters shared with deferred recovery tasks
#[derive(Debug, Default)]
pub(crate) struct RecoveryCounters {
    pub(crate) recoveries_started: AtomicU64,
    pub(crate) recoveries_completed: AtomicU64,
    pub(crate) recoveries_failed: AtomicU64,
    pub(crate) stale_completions: AtomicU64,
    pub(crate) health_checks: AtomicU64,
    pub(crate) transitions: AtomicU64,
}

/// Point-in-time view of the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryStats {
    pub recoveries_started: u64,
    pub recoveries_completed: u64,
    pub recoveries_failed: u64,
    pub stale_completions: u64,
    pub health_checks: u64,
    pub transitions: u64,
    pub producers_up: usize,
    pub producers_down: usize,
    pub messages_in_flight: usize,
    pub connected: bool,
}

impl RecoveryStats {
    /// Completed recoveries as a percentage of those issued
    pub fn completion_rate(&self) -> f64 {
        if self.recoveries_started == 0 {
            100.0
        } else {
            (self.recoveries_completed as f64 / self.recoveries_started as f64) * 100.0
        }
    }

    pub fn log(&self) {
        info!(
            started = self.recoveries_started,
            completed = self.recoveries_completed,
            failed = self.recoveries_failed,
            stale = self.stale_completions,
            health_checks = self.health_checks,
            transitions = self.transitions,
            up = self.producers_up,
            down = self.producers_down,
            in_flight = self.messages_in_flight,
            connected = self.connected,
            "Recovery stats: {:.1}% completion rate",
            self.completion_rate()
        );
    }
}

/// Builder wiring the manager to its collaborators
///
/// Clock, sequence, scheduler and listener default to the production
/// implementations.
pub struct RecoveryManagerBuilder {
    config: RecoveryConfig,
    producers: Arc<dyn ProducerManager>,
    issuer: Arc<dyn RecoveryRequestIssuer>,
    listener: Option<Arc<dyn StatusListener>>,
    clock: Option<Arc<dyn TimeSource>>,
    sequence: Option<Arc<dyn SequenceGenerator>>,
    scheduler: Option<Arc<dyn TaskScheduler>>,
    metrics: Option<RecoveryMetrics>,
}

impl RecoveryManagerBuilder {
    pub fn new(
        config: RecoveryConfig,
        producers: Arc<dyn ProducerManager>,
        issuer: Arc<dyn RecoveryRequestIssuer>,
    ) -> Self {
        Self {
            config,
            producers,
            issuer,
            listener: None,
            clock: None,
            sequence: None,
            scheduler: None,
            metrics: None,
        }
    }

    pub fn listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn sequence(mut self, sequence: Arc<dyn SequenceGenerator>) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn TaskScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn metrics(mut self, metrics: RecoveryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Arc<RecoveryManager>> {
        let scheduler: Arc<dyn TaskScheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(
                ThreadTaskScheduler::new().context("Failed to start recovery scheduler")?,
            ),
        };

        Ok(Arc::new(RecoveryManager {
            max_recovery_duration: self.config.max_recovery_duration(),
            inactivity_interval: self.config.longest_inactivity_interval(),
            health_check_interval: self.config.health_check_interval(),
            node_id: self.config.node_id,
            session_interests: self.config.session_interests,
            producers: self.producers,
            issuer: self.issuer,
            listener: self.listener.unwrap_or_else(|| Arc::new(LoggingStatusListener)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            sequence: self
                .sequence
                .unwrap_or_else(|| Arc::new(AtomicSequenceGenerator::seeded())),
            scheduler,
            metrics: self.metrics,
            in_flight: DashMap::new(),
            channel: Mutex::new(ChannelState::Connected),
            counters: Arc::new(RecoveryCounters::default()),
        }))
    }
}

/// Tracks producer health, issues recoveries and certifies their completion
pub struct RecoveryManager {
    pub(crate) max_recovery_duration: Duration,
    pub(crate) inactivity_interval: Duration,
    health_check_interval: Duration,
    node_id: Option<i32>,
    session_interests: Vec<MessageInterest>,

    pub(crate) producers: Arc<dyn ProducerManager>,
    issuer: Arc<dyn RecoveryRequestIssuer>,
    listener: Arc<dyn StatusListener>,
    pub(crate) clock: Arc<dyn TimeSource>,
    sequence: Arc<dyn SequenceGenerator>,
    scheduler: Arc<dyn TaskScheduler>,
    metrics: Option<RecoveryMetrics>,

    in_flight: DashMap<(SessionId, ProducerId), InFlight>,
    channel: Mutex<ChannelState>,
    pub(crate) counters: Arc<RecoveryCounters>,
}

impl RecoveryManager {
    pub fn builder(
        config: RecoveryConfig,
        producers: Arc<dyn ProducerManager>,
        issuer: Arc<dyn RecoveryRequestIssuer>,
    ) -> RecoveryManagerBuilder {
        RecoveryManagerBuilder::new(config, producers, issuer)
    }

    /// Register the periodic health check
    ///
    /// The task holds a weak reference; dropping the last `Arc` stops the sweep.
    pub fn start(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.scheduler.run_periodic(
            "health-check",
            self.health_check_interval,
            Box::new(move || {
                if let Some(manager) = weak.upgrade() {
                    manager.run_health_check();
                }
            }),
        );
        info!(
            interval_secs = self.health_check_interval.as_secs(),
            inactivity_secs = self.inactivity_interval.as_secs(),
            "Recovery manager started"
        );
    }

    pub fn producers(&self) -> &Arc<dyn ProducerManager> {
        &self.producers
    }

    pub fn is_connected(&self) -> bool {
        self.channel.lock().is_connected()
    }

    // ===== Event handlers =====

    /// Heartbeat from a producer on the system or a per-session channel
    pub fn on_alive_received(
        &self,
        producer_id: ProducerId,
        gen_timestamp: Timestamp,
        received_timestamp: Timestamp,
        subscribed: bool,
        is_system_channel: bool,
    ) {
        let Some(handle) = self.producers.producer(producer_id) else {
            debug!(producer_id, "Alive for unknown producer ignored");
            return;
        };

        let now = self.clock.now_millis();
        let request = {
            let mut producer = handle.lock();
            if !producer.is_active() {
                trace!(producer_id, "Alive for inactive producer ignored");
                return;
            }

            let channel = if is_system_channel {
                AliveChannel::System
            } else {
                AliveChannel::Session
            };
            producer.record_alive(channel, gen_timestamp, received_timestamp);

            if !subscribed {
                self.flag_unsubscribed(&mut producer);
            } else if is_system_channel && !producer.is_flagged_down() {
                producer.set_timestamp_for_recovery(gen_timestamp);
            }

            // Delivery works again even if the transport has not reported recovery yet
            if producer.needs_recovery() && !producer.has_live_recovery(now) {
                Some(self.begin_recovery(&mut producer, now))
            } else {
                None
            }
        };

        if let Some(request) = request {
            self.dispatch(handle, request);
        }
    }

    fn flag_unsubscribed(&self, producer: &mut Producer) {
        let producer_id = producer.id();
        let was_up = !producer.is_flagged_down();
        let was_queue_delay = producer.is_down_for_queue_delay();
        producer.set_down(ProducerDownReason::Other);

        if was_up {
            warn!(producer_id, "Producer reported unsubscribed channel");
            self.emit_down(producer_id, ProducerDownReason::Other);
        } else if was_queue_delay {
            warn!(producer_id, "Producer reported unsubscribed channel while lagging");
            self.emit_status(producer_id, ProducerStatusReason::Other, false);
        }
    }

    /// Snapshot-complete marker for a recovery request
    pub fn on_snapshot_complete_received(
        &self,
        producer_id: ProducerId,
        timestamp: Timestamp,
        recovery_id: RecoveryId,
        message_interest: MessageInterest,
    ) {
        let Some(handle) = self.producers.producer(producer_id) else {
            debug!(producer_id, recovery_id, "Snapshot complete for unknown producer ignored");
            return;
        };

        let now = self.clock.now_millis();
        let mut producer = handle.lock();

        let stale = match producer.recovery() {
            None => Some("no recovery in progress"),
            Some(attempt) if attempt.recovery_id() != recovery_id => Some("superseded"),
            Some(attempt) if attempt.is_interrupted(now) => Some("interrupted"),
            Some(_) => None,
        };
        if let Some(why) = stale {
            debug!(
                producer_id,
                recovery_id,
                current = ?producer.current_recovery_id(),
                why,
                "Ignoring stale snapshot complete"
            );
            self.counters.stale_completions.fetch_add(1, Ordering::Relaxed);
            if let Some(metrics) = &self.metrics {
                metrics.record_stale_completion();
            }
            return;
        }

        let complete = producer
            .recovery_mut()
            .is_some_and(|attempt| attempt.confirm(message_interest));
        if !complete {
            debug!(
                producer_id,
                recovery_id,
                interest = %message_interest,
                "Snapshot complete recorded, waiting for remaining interests"
            );
            return;
        }

        let Some(attempt) = producer.take_recovery() else {
            return;
        };

        let system_alive = producer.alive(AliveChannel::System);
        let replay_point = if system_alive.is_set() {
            system_alive.generated
        } else {
            attempt.started_at()
        };
        producer.set_timestamp_for_recovery(replay_point);

        let reason = if producer.ever_up() {
            ProducerUpReason::ReturnedFromInactivity
        } else {
            ProducerUpReason::FirstRecoveryCompleted
        };
        producer.set_up(now);

        let elapsed = attempt.elapsed(now);
        self.counters.recoveries_completed.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.record_recovery_completed(producer_id, elapsed);
        }
        info!(
            producer_id,
            recovery_id,
            marker_timestamp = timestamp,
            elapsed_ms = elapsed.as_millis() as u64,
            "Recovery completed"
        );

        self.emit_up(producer_id, reason);
    }

    /// A message entered the processing pipeline
    pub fn on_message_processing_started(
        &self,
        session_id: SessionId,
        producer_id: ProducerId,
        recovery_id: Option<RecoveryId>,
        received_at: Timestamp,
    ) {
        self.in_flight.insert(
            (session_id, producer_id),
            InFlight {
                received_at,
                recovery_id,
            },
        );
    }

    /// The message started on `session_id` finished processing
    pub fn on_message_processing_ended(
        &self,
        session_id: SessionId,
        producer_id: ProducerId,
        gen_timestamp: Timestamp,
        event_id: Option<&str>,
    ) {
        let in_flight = self
            .in_flight
            .remove(&(session_id, producer_id))
            .map(|(_, in_flight)| in_flight);

        let received_at = match in_flight {
            Some(in_flight) => in_flight.received_at,
            None => {
                debug!(session_id, producer_id, ?event_id, "Processing ended without matching start");
                self.clock.now_millis()
            }
        };

        let Some(handle) = self.producers.producer(producer_id) else {
            return;
        };
        let mut producer = handle.lock();

        if let Some(recovery_id) = in_flight.and_then(|in_flight| in_flight.recovery_id) {
            if producer.current_recovery_id() != Some(recovery_id) {
                trace!(producer_id, recovery_id, ?event_id, "Processed message of a superseded recovery");
            }
        }

        producer.record_processed(session_id, received_at, gen_timestamp);
    }

    /// Transport channel came back
    pub fn handle_recovery(&self, channel: &str) {
        let now = self.clock.now_millis();
        let previous = std::mem::replace(&mut *self.channel.lock(), ChannelState::Connected);
        match previous {
            ChannelState::Disconnected { since } => info!(
                channel,
                downtime_ms = now - since,
                "Channel recovered, resuming alive-interval checks"
            ),
            ChannelState::Connected => debug!(channel, "Channel recovery while already connected"),
        }
    }

    /// Transport channel is gone; evaluation pauses and in-flight recoveries are interrupted
    pub fn shutdown_completed(&self, signal: ShutdownSignal) {
        let now = self.clock.now_millis();
        {
            let mut channel = self.channel.lock();
            if channel.is_connected() {
                *channel = ChannelState::Disconnected { since: now };
            }
        }
        warn!(signal = %signal, "Channel down, suspending alive-interval checks");

        for producer_id in self.producers.producer_ids() {
            let Some(handle) = self.producers.producer(producer_id) else {
                continue;
            };
            let mut producer = handle.lock();
            if let Some(attempt) = producer.recovery_mut() {
                if !attempt.is_interrupted(now) {
                    info!(producer_id, recovery_id = attempt.recovery_id(), "Recovery interrupted by disconnect");
                }
                attempt.interrupt();
            }
        }
    }

    pub fn stats(&self) -> RecoveryStats {
        let mut producers_up = 0;
        let mut producers_down = 0;
        for id in self.producers.producer_ids() {
            if self.producers.is_producer_down(id) {
                producers_down += 1;
            } else {
                producers_up += 1;
            }
        }

        RecoveryStats {
            recoveries_started: self.counters.recoveries_started.load(Ordering::Relaxed),
            recoveries_completed: self.counters.recoveries_completed.load(Ordering::Relaxed),
            recoveries_failed: self.counters.recoveries_failed.load(Ordering::Relaxed),
            stale_completions: self.counters.stale_completions.load(Ordering::Relaxed),
            health_checks: self.counters.health_checks.load(Ordering::Relaxed),
            transitions: self.counters.transitions.load(Ordering::Relaxed),
            producers_up,
            producers_down,
            messages_in_flight: self.in_flight.len(),
            connected: self.is_connected(),
        }
    }

    // ===== Recovery issuance =====

    /// Install a fresh attempt; caller holds the producer lock
    pub(crate) fn begin_recovery(&self, producer: &mut Producer, now: Timestamp) -> RecoveryRequest {
        let recovery_id = self.sequence.next();
        let since = producer.recovery_since(now);
        let required = RecoveryAttempt::required_interests(producer.scopes(), &self.session_interests);
        let attempt = RecoveryAttempt::new(
            recovery_id,
            producer.id(),
            now,
            self.max_recovery_duration,
            since,
            required,
        );
        let request = RecoveryRequest::from_attempt(&attempt, self.node_id);

        if let Some(previous) = producer.begin_recovery(attempt) {
            info!(
                producer_id = producer.id(),
                previous = previous.recovery_id(),
                recovery_id,
                "Replacing interrupted recovery"
            );
        }

        self.counters.recoveries_started.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.record_recovery_started(producer.id());
        }
        info!(
            producer_id = producer.id(),
            recovery_id,
            since = ?since,
            down_reason = ?producer.down_reason(),
            "Starting recovery"
        );

        request
    }

    /// Issue the request off the caller's thread; roll back on failure
    pub(crate) fn dispatch(&self, handle: ProducerHandle, request: RecoveryRequest) {
        let issuer = Arc::clone(&self.issuer);
        let counters = Arc::clone(&self.counters);
        let metrics = self.metrics.clone();

        self.scheduler.run_once(
            "recovery-request",
            Box::new(move || {
                let Err(e) = issuer.request_recovery(&request) else {
                    return;
                };

                warn!(
                    producer_id = request.producer_id,
                    recovery_id = request.recovery_id,
                    "Recovery request failed: {}",
                    e
                );
                counters.recoveries_failed.fetch_add(1, Ordering::Relaxed);
                if let Some(metrics) = &metrics {
                    metrics.record_recovery_failed(request.producer_id);
                }

                let mut producer = handle.lock();
                if producer.current_recovery_id() == Some(request.recovery_id) {
                    producer.take_recovery();
                }
            }),
        );
    }

    // ===== Notifications =====

    pub(crate) fn emit_up(&self, producer_id: ProducerId, reason: ProducerUpReason) {
        info!(producer_id, ?reason, "Producer up");
        status::notify_up(self.listener.as_ref(), producer_id, reason);
        self.emit_status(producer_id, reason.into(), true);
    }

    pub(crate) fn emit_down(&self, producer_id: ProducerId, reason: ProducerDownReason) {
        warn!(producer_id, ?reason, "Producer down");
        status::notify_down(self.listener.as_ref(), producer_id, reason);
        self.emit_status(producer_id, reason.into(), false);
    }

    pub(crate) fn emit_status(&self, producer_id: ProducerId, reason: ProducerStatusReason, up: bool) {
        self.counters.transitions.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.record_transition(producer_id, reason, up);
        }
        status::notify_status_change(self.listener.as_ref(), producer_id, reason);
    }
}
