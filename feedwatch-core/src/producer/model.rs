//! Producer record: static configuration plus the runtime fields the
//! recovery manager mutates under the per-producer lock

use crate::config::ProducerConfig;
use crate::core::{ProducerDownReason, ProducerId, ProducerScope, RecoveryId, SessionId, Timestamp};
use crate::recovery::RecoveryAttempt;
use std::collections::HashMap;
use std::time::Duration;

/// Which alive stream a heartbeat arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliveChannel {
    /// Dedicated system session; drives alive-interval checks
    System,
    /// Per-session heartbeat travelling through the processing pipeline
    Session,
}

/// Last heartbeat seen on one channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AliveTimestamps {
    /// Producer-side generation time, 0 until the first alive
    pub generated: Timestamp,
    /// Local receipt time
    pub received: Timestamp,
}

impl AliveTimestamps {
    pub fn is_set(&self) -> bool {
        self.generated > 0
    }
}

/// One upstream producer
#[derive(Debug, Clone)]
pub struct Producer {
    config: ProducerConfig,

    flagged_down: bool,
    down_reason: Option<ProducerDownReason>,
    ever_up: bool,
    up_since: Timestamp,

    recovery: Option<RecoveryAttempt>,
    timestamp_for_recovery: Timestamp,

    last_message_timestamp: Timestamp,
    last_processed_message_gen_timestamp: Timestamp,

    system_alive: AliveTimestamps,
    session_alive: AliveTimestamps,

    session_lag: HashMap<SessionId, i64>,
    queue_delay_violated: bool,
}

impl Producer {
    /// Fresh producer: flagged down, never recovered
    pub fn new(config: ProducerConfig) -> Self {
        Self {
            config,
            flagged_down: true,
            down_reason: None,
            ever_up: false,
            up_since: 0,
            recovery: None,
            timestamp_for_recovery: 0,
            last_message_timestamp: 0,
            last_processed_message_gen_timestamp: 0,
            system_alive: AliveTimestamps::default(),
            session_alive: AliveTimestamps::default(),
            session_lag: HashMap::new(),
            queue_delay_violated: false,
        }
    }

    pub fn id(&self) -> ProducerId {
        self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn description(&self) -> &str {
        &self.config.description
    }

    pub fn scopes(&self) -> &[ProducerScope] {
        &self.config.scopes
    }

    pub fn is_active(&self) -> bool {
        self.config.active
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// Inactivity budget: per-producer override or the global default
    pub fn inactivity_budget(&self, global: Duration) -> Duration {
        self.config
            .max_inactivity_seconds
            .map(Duration::from_secs)
            .unwrap_or(global)
    }

    pub fn recovery_window(&self) -> Duration {
        Duration::from_secs(self.config.recovery_window_minutes.saturating_mul(60))
    }

    // ===== Status =====

    pub fn is_flagged_down(&self) -> bool {
        self.flagged_down
    }

    pub fn down_reason(&self) -> Option<ProducerDownReason> {
        self.down_reason
    }

    pub fn ever_up(&self) -> bool {
        self.ever_up
    }

    pub fn up_since(&self) -> Timestamp {
        self.up_since
    }

    /// Down for a reason that needs a replay (including never recovered)
    pub fn needs_recovery(&self) -> bool {
        self.flagged_down && self.down_reason.map_or(true, |r| r.requires_recovery())
    }

    /// Down only because processing lagged
    pub fn is_down_for_queue_delay(&self) -> bool {
        self.flagged_down && self.down_reason == Some(ProducerDownReason::ProcessingQueueDelayViolation)
    }

    pub fn set_down(&mut self, reason: ProducerDownReason) {
        self.flagged_down = true;
        self.down_reason = Some(reason);
        if reason != ProducerDownReason::ProcessingQueueDelayViolation {
            self.queue_delay_violated = false;
        }
    }

    pub fn set_up(&mut self, now: Timestamp) {
        self.flagged_down = false;
        self.down_reason = None;
        self.ever_up = true;
        self.up_since = now;
        self.queue_delay_violated = false;
    }

    // ===== Recovery =====

    pub fn recovery(&self) -> Option<&RecoveryAttempt> {
        self.recovery.as_ref()
    }

    pub fn recovery_mut(&mut self) -> Option<&mut RecoveryAttempt> {
        self.recovery.as_mut()
    }

    pub fn current_recovery_id(&self) -> Option<RecoveryId> {
        self.recovery.as_ref().map(RecoveryAttempt::recovery_id)
    }

    /// Attempt exists, is not interrupted and has not timed out
    pub fn has_live_recovery(&self, now: Timestamp) -> bool {
        self.recovery
            .as_ref()
            .is_some_and(|attempt| !attempt.is_interrupted(now))
    }

    /// Install a new attempt; the previous one (if any) is superseded
    pub fn begin_recovery(&mut self, attempt: RecoveryAttempt) -> Option<RecoveryAttempt> {
        self.recovery.replace(attempt)
    }

    pub fn take_recovery(&mut self) -> Option<RecoveryAttempt> {
        self.recovery.take()
    }

    pub fn timestamp_for_recovery(&self) -> Timestamp {
        self.timestamp_for_recovery
    }

    pub fn set_timestamp_for_recovery(&mut self, timestamp: Timestamp) {
        self.timestamp_for_recovery = timestamp;
    }

    /// Replay-from point for a new request, `None` when a full recovery is needed
    pub fn recovery_since(&self, now: Timestamp) -> Option<Timestamp> {
        if self.timestamp_for_recovery <= 0 {
            return None;
        }
        let window_ms = self.recovery_window().as_millis() as i64;
        if now - self.timestamp_for_recovery > window_ms {
            None
        } else {
            Some(self.timestamp_for_recovery)
        }
    }

    // ===== Timestamps =====

    pub fn last_message_timestamp(&self) -> Timestamp {
        self.last_message_timestamp
    }

    pub fn last_processed_message_gen_timestamp(&self) -> Timestamp {
        self.last_processed_message_gen_timestamp
    }

    pub fn alive(&self, channel: AliveChannel) -> AliveTimestamps {
        match channel {
            AliveChannel::System => self.system_alive,
            AliveChannel::Session => self.session_alive,
        }
    }

    pub fn record_alive(&mut self, channel: AliveChannel, generated: Timestamp, received: Timestamp) {
        let slot = match channel {
            AliveChannel::System => &mut self.system_alive,
            AliveChannel::Session => &mut self.session_alive,
        };
        *slot = AliveTimestamps { generated, received };
    }

    /// Record a fully processed message
    pub fn record_processed(&mut self, session_id: SessionId, received_at: Timestamp, generated: Timestamp) {
        self.last_message_timestamp = received_at;
        self.last_processed_message_gen_timestamp = generated;
        self.session_lag.insert(session_id, received_at - generated);
    }

    /// Most recent processing lag per session (ms)
    pub fn session_lag(&self, session_id: SessionId) -> Option<i64> {
        self.session_lag.get(&session_id).copied()
    }

    /// Worst lag among the last completed message of each session
    pub fn max_session_lag(&self) -> Option<i64> {
        self.session_lag.values().copied().max()
    }

    /// Processing queue delay (ms), `None` until something was processed
    ///
    /// Age of the last fully processed message, or the receive lag of the last
    /// session alive when that is worse.
    pub fn processing_delay(&self, now: Timestamp) -> Option<i64> {
        let processed = (self.last_processed_message_gen_timestamp > 0)
            .then(|| now - self.last_processed_message_gen_timestamp);
        let session_alive = self
            .session_alive
            .is_set()
            .then(|| self.session_alive.received - self.session_alive.generated);

        match (processed, session_alive) {
            (Some(processed), Some(alive)) => Some(processed.max(alive)),
            (processed, alive) => processed.or(alive),
        }
    }

    pub fn queue_delay_violated(&self) -> bool {
        self.queue_delay_violated
    }

    pub fn set_queue_delay_violated(&mut self, violated: bool) {
        self.queue_delay_violated = violated;
    }
}
