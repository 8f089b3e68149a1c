//! Standard producer set and a fully wired manager for tests

use super::mocks::{ManualClock, ManualScheduler, RecordingIssuer, RecordingListener};
use crate::config::{ProducerConfig, RecoveryConfig};
use crate::core::{MessageInterest, ProducerId, ProducerScope, RecoveryId};
use crate::monitoring::RecoveryMetrics;
use crate::producer::{ProducerManager, ProducerRegistry};
use crate::recovery::RecoveryManager;
use crate::runtime::{AtomicSequenceGenerator, TimeSource};
use std::sync::Arc;

/// Live-only producer
pub const LIVE_ODDS: ProducerId = 1;
/// Prematch-only producer
pub const CTRL: ProducerId = 3;
/// Producer publishing on both prematch and live
pub const PREMIUM_CRICKET: ProducerId = 5;

/// First recovery id handed out by the harness
pub const FIRST_RECOVERY_ID: RecoveryId = 55;

pub fn standard_producers() -> Vec<ProducerConfig> {
    vec![
        ProducerConfig::new(LIVE_ODDS, "LiveOdds", vec![ProducerScope::Live]),
        ProducerConfig::new(CTRL, "Ctrl", vec![ProducerScope::Prematch]),
        ProducerConfig::new(
            PREMIUM_CRICKET,
            "PremiumCricket",
            vec![ProducerScope::Prematch, ProducerScope::Live],
        ),
    ]
}

pub fn test_config() -> RecoveryConfig {
    RecoveryConfig::with_producers(standard_producers())
}

/// Recovery manager wired to manual clock, inline scheduler and recording collaborators
pub struct TestHarness {
    pub manager: Arc<RecoveryManager>,
    pub clock: Arc<ManualClock>,
    pub scheduler: Arc<ManualScheduler>,
    pub issuer: Arc<RecordingIssuer>,
    pub listener: Arc<RecordingListener>,
    pub metrics: RecoveryMetrics,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Build and start a manager; the periodic sweep fires on `scheduler.tick()`
    pub fn with_config(config: RecoveryConfig) -> Self {
        let clock = Arc::new(ManualClock::default());
        let scheduler = Arc::new(ManualScheduler::new());
        let issuer = Arc::new(RecordingIssuer::new());
        let listener = Arc::new(RecordingListener::new());
        let metrics = RecoveryMetrics::new().expect("Failed to create test metrics");
        let registry =
            Arc::new(ProducerRegistry::from_config(&config).expect("Invalid test producers"));

        let manager = RecoveryManager::builder(config, registry, issuer.clone())
            .listener(listener.clone())
            .clock(clock.clone())
            .sequence(Arc::new(AtomicSequenceGenerator::starting_at(FIRST_RECOVERY_ID)))
            .scheduler(scheduler.clone())
            .metrics(metrics.clone())
            .build()
            .expect("Failed to build recovery manager");
        manager.start();

        Self {
            manager,
            clock,
            scheduler,
            issuer,
            listener,
            metrics,
        }
    }

    /// Fresh subscribed system alive generated 3s ago
    pub fn system_alive(&self, producer_id: ProducerId) {
        let now = self.clock.now_millis();
        self.manager
            .on_alive_received(producer_id, now - 3_000, now, true, true);
    }

    /// Fresh subscribed per-session alive
    pub fn session_alive(&self, producer_id: ProducerId) {
        let now = self.clock.now_millis();
        self.manager
            .on_alive_received(producer_id, now - 3_000, now, true, false);
    }

    /// Trigger a recovery through a system alive and return its id
    pub fn start_recovery(&self, producer_id: ProducerId) -> RecoveryId {
        self.system_alive(producer_id);
        self.issuer
            .last_request(producer_id)
            .map(|r| r.recovery_id)
            .expect("Alive did not start a recovery")
    }

    pub fn complete(&self, producer_id: ProducerId, recovery_id: RecoveryId, interest: MessageInterest) {
        let now = self.clock.now_millis();
        self.manager
            .on_snapshot_complete_received(producer_id, now, recovery_id, interest);
    }

    /// Drive a producer through its first recovery
    pub fn bring_up(&self, producer_id: ProducerId) -> RecoveryId {
        let recovery_id = self.start_recovery(producer_id);
        self.complete(producer_id, recovery_id, MessageInterest::AllMessages);
        recovery_id
    }

    pub fn is_down(&self, producer_id: ProducerId) -> bool {
        self.manager.producers().is_producer_down(producer_id)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
