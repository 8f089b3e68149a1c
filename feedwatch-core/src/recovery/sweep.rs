//! Periodic health check
//!
//! Stateless: every run recomputes violations from the producer timestamps and
//! the clock. Per producer, in id order:
//! 1. start (or restart) recovery when one is needed and the system alives are fresh
//! 2. flag alive-interval violations (suspended while the channel is down)
//! 3. flag or clear processing-queue-delay violations

use super::RecoveryManager;
use crate::core::{ProducerDownReason, ProducerStatusReason, ProducerUpReason, Timestamp};
use crate::producer::{AliveChannel, ProducerHandle};
use std::sync::atomic::Ordering;
use tracing::{info, trace, warn};

impl RecoveryManager {
    /// One sweep over all active producers
    pub fn run_health_check(&self) {
        self.counters.health_checks.fetch_add(1, Ordering::Relaxed);
        let now = self.clock.now_millis();

        for producer_id in self.producers.producer_ids() {
            if let Some(handle) = self.producers.producer(producer_id) {
                self.check_producer(handle, now);
            }
        }
    }

    fn check_producer(&self, handle: ProducerHandle, now: Timestamp) {
        let request = {
            let mut producer = handle.lock();
            if !producer.is_active() {
                return;
            }
            // Transport downtime must not read as producer silence
            let connected = self.is_connected();

            let producer_id = producer.id();
            let budget_ms = producer.inactivity_budget(self.inactivity_interval).as_millis() as i64;
            let system_alive = producer.alive(AliveChannel::System);
            let alive_fresh = system_alive.is_set() && now - system_alive.generated <= budget_ms;

            // 1. Recovery bootstrap / restart
            let mut request = None;
            if producer.needs_recovery() {
                if producer.has_live_recovery(now) {
                    if connected && !alive_fresh {
                        if let Some(attempt) = producer.recovery_mut() {
                            warn!(
                                producer_id,
                                recovery_id = attempt.recovery_id(),
                                "System alives stalled during recovery, interrupting"
                            );
                            attempt.interrupt();
                        }
                    }
                } else if alive_fresh {
                    request = Some(self.begin_recovery(&mut producer, now));
                } else {
                    trace!(producer_id, "Recovery needed, waiting for fresh system alive");
                }
            }

            // 2. Alive interval
            let alive_reference = system_alive.generated.max(producer.up_since());
            let alive_violated = connected && now - alive_reference > budget_ms;
            if !connected {
                trace!(producer_id, "Channel down, alive interval not evaluated");
            }
            if alive_violated {
                if !producer.is_flagged_down() {
                    warn!(
                        producer_id,
                        last_alive = system_alive.generated,
                        silent_ms = now - alive_reference,
                        budget_ms,
                        "Alive interval violated"
                    );
                    producer.set_down(ProducerDownReason::AliveIntervalViolation);
                    self.emit_down(producer_id, ProducerDownReason::AliveIntervalViolation);
                } else if producer.is_down_for_queue_delay() {
                    warn!(producer_id, "Alive interval violated while lagging, escalating");
                    producer.set_down(ProducerDownReason::AliveIntervalViolation);
                    self.emit_status(producer_id, ProducerStatusReason::AliveIntervalViolation, false);
                }
            }

            // 3. Processing queue delay
            if let Some(delay_ms) = producer.processing_delay(now) {
                let delay_violated = delay_ms > budget_ms;
                producer.set_queue_delay_violated(delay_violated);

                if delay_violated && !producer.is_flagged_down() {
                    warn!(
                        producer_id,
                        delay_ms,
                        budget_ms,
                        worst_session_lag_ms = ?producer.max_session_lag(),
                        "Processing queue delay violated"
                    );
                    producer.set_down(ProducerDownReason::ProcessingQueueDelayViolation);
                    self.emit_down(producer_id, ProducerDownReason::ProcessingQueueDelayViolation);
                } else if !delay_violated && !alive_violated && producer.is_down_for_queue_delay() {
                    info!(producer_id, delay_ms, "Processing queue delay stabilized");
                    producer.set_up(now);
                    self.emit_up(producer_id, ProducerUpReason::ProcessingQueDelayStabilized);
                }
            }

            request
        };

        if let Some(request) = request {
            self.dispatch(handle, request);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{MessageInterest, ProducerDownReason, ProducerStatusReason, ProducerUpReason};
    use crate::producer::ProducerManager;
    use crate::recovery::ShutdownSignal;
    use crate::runtime::TimeSource;
    use crate::testing::{TestHarness, CTRL, LIVE_ODDS};
    use std::time::Duration;

    #[test]
    fn test_sweep_without_alive_starts_nothing() {
        let harness = TestHarness::new();
        harness.manager.run_health_check();
        assert_eq!(harness.scheduler.one_shot_runs(), 0);
        assert_eq!(harness.listener.total_events(), 0);
    }

    #[test]
    fn test_sweep_restarts_expired_recovery() {
        let harness = TestHarness::new();
        let first = harness.start_recovery(CTRL);

        harness.clock.advance(Duration::from_secs(3600));
        let now = harness.clock.now_millis();
        // Alive arrives before the attempt is replaced
        {
            let handle = harness.manager.producers().producer(CTRL).unwrap();
            handle.lock().record_alive(crate::producer::AliveChannel::System, now, now);
        }
        harness.manager.run_health_check();

        let requests = harness.issuer.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].recovery_id > first);

        harness.complete(CTRL, first, MessageInterest::AllMessages);
        assert!(harness.manager.producers().is_producer_down(CTRL));
        assert_eq!(harness.listener.total_events(), 0);

        // The replacement id resolves normally
        harness.complete(CTRL, requests[1].recovery_id, MessageInterest::AllMessages);
        assert!(!harness.manager.producers().is_producer_down(CTRL));
        assert_eq!(
            harness.listener.up_events(CTRL),
            vec![ProducerUpReason::FirstRecoveryCompleted]
        );
    }

    #[test]
    fn test_stale_alive_flags_up_producer() {
        let harness = TestHarness::new();
        harness.bring_up(LIVE_ODDS);
        harness.listener.clear();

        harness.clock.advance(Duration::from_secs(21));
        harness.manager.run_health_check();

        assert_eq!(
            harness.listener.down_events(LIVE_ODDS),
            vec![ProducerDownReason::AliveIntervalViolation]
        );
        assert_eq!(
            harness.listener.status_events(LIVE_ODDS),
            vec![ProducerStatusReason::AliveIntervalViolation]
        );
    }

    #[test]
    fn test_alive_interval_suspended_while_disconnected() {
        let harness = TestHarness::new();
        harness.bring_up(LIVE_ODDS);
        harness.listener.clear();

        harness.manager.shutdown_completed(ShutdownSignal::Requested);
        harness.clock.advance(Duration::from_secs(60));
        harness.manager.run_health_check();
        assert_eq!(harness.listener.total_events(), 0);
        assert_eq!(harness.manager.stats().health_checks, 1);
    }

    #[test]
    fn test_queue_delay_evaluated_while_disconnected() {
        let harness = TestHarness::new();
        harness.bring_up(LIVE_ODDS);
        harness.listener.clear();

        harness.manager.shutdown_completed(ShutdownSignal::Requested);
        let now = harness.clock.now_millis();
        harness
            .manager
            .on_message_processing_started(-1, LIVE_ODDS, None, now);
        harness
            .manager
            .on_message_processing_ended(-1, LIVE_ODDS, now - 60_000, None);
        harness.manager.run_health_check();

        assert_eq!(
            harness.listener.down_events(LIVE_ODDS),
            vec![ProducerDownReason::ProcessingQueueDelayViolation]
        );
    }
}
