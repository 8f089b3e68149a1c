//! Tests for the periodic health check
//!
//! Alive-interval and processing-queue-delay violations, their tie-breaks,
//! and behavior across transport disconnects.

use feedwatch_core::config::ProducerConfig;
use feedwatch_core::core::{
    MessageInterest, ProducerDownReason, ProducerScope, ProducerStatusReason, ProducerUpReason,
};
use feedwatch_core::producer::ProducerManager;
use feedwatch_core::recovery::ShutdownSignal;
use feedwatch_core::runtime::TimeSource;
use feedwatch_core::testing::{test_config, StatusEvent, TestHarness, CTRL, LIVE_ODDS};
use std::time::Duration;

fn process_message(harness: &TestHarness, producer_id: u32, lag: Duration) {
    let now = harness.clock.now_millis();
    harness
        .manager
        .on_message_processing_started(-1, producer_id, None, now);
    harness.manager.on_message_processing_ended(
        -1,
        producer_id,
        now - lag.as_millis() as i64,
        Some("sr:match:42"),
    );
}

#[test]
fn test_periodic_task_registered() {
    let harness = TestHarness::new();
    assert_eq!(
        harness.scheduler.periodic_names(),
        vec!["health-check".to_string()]
    );

    harness.scheduler.tick();
    harness.scheduler.tick();
    assert_eq!(harness.manager.stats().health_checks, 2);
}

#[test]
fn test_alive_interval_boundary() {
    let harness = TestHarness::new();
    harness.bring_up(LIVE_ODDS);
    harness.listener.clear();

    // Exactly at the budget is still fine
    harness.clock.advance(Duration::from_secs(20));
    harness.manager.run_health_check();
    assert!(!harness.is_down(LIVE_ODDS));

    harness.clock.advance(Duration::from_millis(1));
    harness.manager.run_health_check();
    assert_eq!(
        harness.listener.events_for(LIVE_ODDS),
        vec![
            StatusEvent::Down(LIVE_ODDS, ProducerDownReason::AliveIntervalViolation),
            StatusEvent::StatusChange(LIVE_ODDS, ProducerStatusReason::AliveIntervalViolation),
        ]
    );

    // Already down: further sweeps stay quiet
    harness.manager.run_health_check();
    assert_eq!(harness.listener.events_for(LIVE_ODDS).len(), 2);
}

#[test]
fn test_fresh_alives_keep_producer_up() {
    let harness = TestHarness::new();
    harness.bring_up(LIVE_ODDS);

    for _ in 0..10 {
        harness.clock.advance(Duration::from_secs(10));
        harness.system_alive(LIVE_ODDS);
        harness.manager.run_health_check();
    }

    assert!(!harness.is_down(LIVE_ODDS));
    assert_eq!(harness.listener.events_for(LIVE_ODDS).len(), 2);
    assert_eq!(harness.issuer.requests_for(LIVE_ODDS).len(), 1);
}

#[test]
fn test_per_producer_inactivity_override() {
    let mut config = test_config();
    for producer in &mut config.producers {
        if producer.id == CTRL {
            producer.max_inactivity_seconds = Some(60);
        }
    }
    let harness = TestHarness::with_config(config);
    harness.bring_up(CTRL);
    harness.bring_up(LIVE_ODDS);

    harness.clock.advance(Duration::from_secs(30));
    harness.manager.run_health_check();
    assert!(harness.is_down(LIVE_ODDS));
    assert!(!harness.is_down(CTRL));

    harness.clock.advance(Duration::from_secs(31));
    harness.manager.run_health_check();
    assert!(harness.is_down(CTRL));
}

#[test]
fn test_queue_delay_violation_and_stabilization() {
    let harness = TestHarness::new();
    harness.bring_up(LIVE_ODDS);
    harness.listener.clear();

    process_message(&harness, LIVE_ODDS, Duration::from_secs(25));
    harness.manager.run_health_check();
    assert!(harness.is_down(LIVE_ODDS));

    harness.clock.advance(Duration::from_secs(5));
    harness.system_alive(LIVE_ODDS);
    process_message(&harness, LIVE_ODDS, Duration::from_secs(1));
    harness.manager.run_health_check();

    assert!(!harness.is_down(LIVE_ODDS));
    assert_eq!(
        harness.listener.events_for(LIVE_ODDS),
        vec![
            StatusEvent::Down(LIVE_ODDS, ProducerDownReason::ProcessingQueueDelayViolation),
            StatusEvent::StatusChange(
                LIVE_ODDS,
                ProducerStatusReason::ProcessingQueueDelayViolation
            ),
            StatusEvent::Up(LIVE_ODDS, ProducerUpReason::ProcessingQueDelayStabilized),
            StatusEvent::StatusChange(LIVE_ODDS, ProducerStatusReason::ProcessingQueDelayStabilized),
        ]
    );
    // Lag alone never triggers a recovery
    assert_eq!(harness.issuer.requests_for(LIVE_ODDS).len(), 1);
}

#[test]
fn test_fresh_alives_do_not_hide_lagging_message() {
    let harness = TestHarness::new();
    harness.bring_up(LIVE_ODDS);
    harness.listener.clear();

    process_message(&harness, LIVE_ODDS, Duration::from_secs(22));
    harness.clock.advance(Duration::from_secs(1));
    let now = harness.clock.now_millis();
    harness.manager.on_alive_received(LIVE_ODDS, now, now, true, true);
    harness.manager.on_alive_received(LIVE_ODDS, now, now, true, false);
    harness.manager.run_health_check();

    assert_eq!(
        harness.listener.down_events(LIVE_ODDS),
        vec![ProducerDownReason::ProcessingQueueDelayViolation]
    );

    // A promptly processed message clears it
    harness.clock.advance(Duration::from_secs(1));
    process_message(&harness, LIVE_ODDS, Duration::ZERO);
    harness.manager.run_health_check();
    assert_eq!(
        harness.listener.up_events(LIVE_ODDS),
        vec![ProducerUpReason::ProcessingQueDelayStabilized]
    );
    assert_eq!(harness.scheduler.one_shot_runs(), 1);
}

#[test]
fn test_lagging_session_alive_flags_queue_delay() {
    let harness = TestHarness::new();
    harness.bring_up(LIVE_ODDS);

    harness.clock.advance(Duration::from_secs(10));
    harness.system_alive(LIVE_ODDS);
    assert!(!harness.is_down(LIVE_ODDS));

    harness.clock.advance(Duration::from_secs(5));
    let now = harness.clock.now_millis();
    harness
        .manager
        .on_alive_received(LIVE_ODDS, now - 25_000, now, true, false);
    harness.manager.run_health_check();

    assert!(harness.is_down(LIVE_ODDS));
    assert_eq!(
        harness.listener.down_events(LIVE_ODDS),
        vec![ProducerDownReason::ProcessingQueueDelayViolation]
    );
    assert_eq!(harness.issuer.requests_for(LIVE_ODDS).len(), 1);

    // Session alives catching up stabilize it
    harness.session_alive(LIVE_ODDS);
    harness.manager.run_health_check();
    assert!(!harness.is_down(LIVE_ODDS));
}

#[test]
fn test_alive_violation_escalates_queue_delay() {
    let harness = TestHarness::new();
    harness.bring_up(LIVE_ODDS);
    harness.listener.clear();

    process_message(&harness, LIVE_ODDS, Duration::from_secs(25));
    harness.manager.run_health_check();

    harness.clock.advance(Duration::from_secs(21));
    harness.manager.run_health_check();

    assert_eq!(
        harness.listener.events_for(LIVE_ODDS),
        vec![
            StatusEvent::Down(LIVE_ODDS, ProducerDownReason::ProcessingQueueDelayViolation),
            StatusEvent::StatusChange(
                LIVE_ODDS,
                ProducerStatusReason::ProcessingQueueDelayViolation
            ),
            StatusEvent::StatusChange(LIVE_ODDS, ProducerStatusReason::AliveIntervalViolation),
        ]
    );

    // Processing catching up does not lift an alive violation
    process_message(&harness, LIVE_ODDS, Duration::from_millis(100));
    harness.manager.run_health_check();
    assert!(harness.is_down(LIVE_ODDS));

    // Now a recovery is required
    harness.system_alive(LIVE_ODDS);
    assert_eq!(harness.issuer.requests_for(LIVE_ODDS).len(), 2);
}

#[test]
fn test_stabilization_never_lifts_unrecovered_producer() {
    let harness = TestHarness::new();
    process_message(&harness, CTRL, Duration::from_secs(1));
    harness.manager.run_health_check();

    assert!(harness.is_down(CTRL));
    assert!(harness.listener.events().is_empty());
}

#[test]
fn test_disconnect_suspends_evaluation() {
    let harness = TestHarness::new();
    harness.bring_up(LIVE_ODDS);
    harness.listener.clear();

    harness.manager.shutdown_completed(ShutdownSignal::ConnectionLost {
        reason: "socket closed".to_string(),
    });
    harness.clock.advance(Duration::from_secs(60));
    harness.manager.run_health_check();
    assert!(!harness.is_down(LIVE_ODDS));
    assert!(harness.listener.events().is_empty());

    // After reconnect the stale alive is evaluated against real elapsed time
    harness.manager.handle_recovery("amqp");
    harness.manager.run_health_check();
    assert_eq!(
        harness.listener.down_events(LIVE_ODDS),
        vec![ProducerDownReason::AliveIntervalViolation]
    );
}

#[test]
fn test_short_disconnect_keeps_producer_up() {
    let harness = TestHarness::new();
    harness.bring_up(LIVE_ODDS);

    harness.manager.shutdown_completed(ShutdownSignal::Requested);
    harness.clock.advance(Duration::from_secs(5));
    harness.manager.handle_recovery("amqp");
    harness.system_alive(LIVE_ODDS);
    harness.manager.run_health_check();

    assert!(!harness.is_down(LIVE_ODDS));
}

#[test]
fn test_alive_during_outage_restarts_recovery() {
    let harness = TestHarness::new();
    let first = harness.start_recovery(LIVE_ODDS);

    harness.clock.advance(Duration::from_secs(5));
    harness.manager.shutdown_completed(ShutdownSignal::Requested);
    harness.clock.advance(Duration::from_secs(5));

    // No channel recovery notice: the alive alone proves delivery works
    harness.system_alive(LIVE_ODDS);
    let requests = harness.issuer.requests_for(LIVE_ODDS);
    assert_eq!(requests.len(), 2);
    assert!(harness.is_down(LIVE_ODDS));

    harness.complete(LIVE_ODDS, first, MessageInterest::AllMessages);
    assert!(harness.is_down(LIVE_ODDS));
    harness.complete(LIVE_ODDS, requests[1].recovery_id, MessageInterest::AllMessages);
    assert!(!harness.is_down(LIVE_ODDS));
}

#[test]
fn test_sweep_bootstraps_recovery_while_disconnected() {
    let harness = TestHarness::new();
    harness.issuer.fail_next(1);
    harness.system_alive(CTRL);
    assert_eq!(harness.issuer.requests_for(CTRL).len(), 1);

    harness.manager.shutdown_completed(ShutdownSignal::Requested);
    harness.manager.run_health_check();

    assert_eq!(harness.issuer.requests_for(CTRL).len(), 2);
    assert!(harness.issuer.requests_for(LIVE_ODDS).is_empty());
}

#[test]
fn test_queue_delay_detected_during_outage() {
    let harness = TestHarness::new();
    harness.bring_up(LIVE_ODDS);
    harness.listener.clear();

    harness.manager.shutdown_completed(ShutdownSignal::ConnectionLost {
        reason: "socket closed".to_string(),
    });
    process_message(&harness, LIVE_ODDS, Duration::from_secs(60));
    harness.manager.run_health_check();

    assert_eq!(
        harness.listener.events_for(LIVE_ODDS),
        vec![
            StatusEvent::Down(LIVE_ODDS, ProducerDownReason::ProcessingQueueDelayViolation),
            StatusEvent::StatusChange(
                LIVE_ODDS,
                ProducerStatusReason::ProcessingQueueDelayViolation
            ),
        ]
    );
}

#[test]
fn test_stalled_alives_interrupt_recovery() {
    let harness = TestHarness::new();
    let first = harness.start_recovery(LIVE_ODDS);

    harness.clock.advance(Duration::from_secs(18));
    harness.manager.run_health_check();

    let handle = harness.manager.producers().producer(LIVE_ODDS).unwrap();
    assert!(!handle.lock().has_live_recovery(harness.clock.now_millis()));

    harness.complete(LIVE_ODDS, first, MessageInterest::AllMessages);
    assert!(harness.is_down(LIVE_ODDS));

    harness.system_alive(LIVE_ODDS);
    let second = harness.issuer.last_request(LIVE_ODDS).unwrap().recovery_id;
    assert!(second > first);
    harness.complete(LIVE_ODDS, second, MessageInterest::AllMessages);
    assert!(!harness.is_down(LIVE_ODDS));
}

#[test]
fn test_inactive_producer_ignored() {
    let mut config = test_config();
    let mut inactive = ProducerConfig::new(7, "Retired", vec![ProducerScope::Live]);
    inactive.active = false;
    config.producers.push(inactive);
    let harness = TestHarness::with_config(config);

    harness.system_alive(7);
    harness.manager.run_health_check();

    assert!(harness.issuer.requests_for(7).is_empty());
    assert!(harness.manager.producers().is_producer_down(7));
    assert!(harness.listener.events_for(7).is_empty());
}

#[test]
fn test_unknown_producer_events_ignored() {
    let harness = TestHarness::new();
    let now = harness.clock.now_millis();

    harness.manager.on_alive_received(99, now, now, true, true);
    harness
        .manager
        .on_snapshot_complete_received(99, now, 55, MessageInterest::AllMessages);
    harness.manager.on_message_processing_ended(-3, 99, now, None);

    assert!(harness.issuer.requests().is_empty());
    assert!(harness.manager.producers().is_producer_down(99));
}
