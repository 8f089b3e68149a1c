//! A single recovery request and its completion bookkeeping

use crate::core::{MessageInterest, ProducerId, ProducerScope, RecoveryId, Timestamp};
use std::collections::BTreeSet;
use std::time::Duration;

/// In-flight recovery for one producer
///
/// Terminal when every required interest is confirmed (success) or when it is
/// interrupted: `timeout_at` elapsed or the transport dropped it. An
/// interrupted attempt keeps its id until replaced, but completions for it are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryAttempt {
    recovery_id: RecoveryId,
    producer_id: ProducerId,
    started_at: Timestamp,
    timeout_at: Timestamp,
    since: Option<Timestamp>,
    required: BTreeSet<MessageInterest>,
    confirmed: BTreeSet<MessageInterest>,
    interrupted: bool,
}

impl RecoveryAttempt {
    pub fn new(
        recovery_id: RecoveryId,
        producer_id: ProducerId,
        started_at: Timestamp,
        max_duration: Duration,
        since: Option<Timestamp>,
        required: BTreeSet<MessageInterest>,
    ) -> Self {
        Self {
            recovery_id,
            producer_id,
            started_at,
            timeout_at: started_at.saturating_add(max_duration.as_millis() as Timestamp),
            since,
            required,
            confirmed: BTreeSet::new(),
            interrupted: false,
        }
    }

    /// Interests that must confirm before the producer is trusted again
    ///
    /// One scoped interest per producer scope that some open session receives.
    /// A producer whose scopes no session narrows down needs a full confirmation.
    pub fn required_interests(
        scopes: &[ProducerScope],
        sessions: &[MessageInterest],
    ) -> BTreeSet<MessageInterest> {
        let required: BTreeSet<_> = scopes
            .iter()
            .filter(|scope| sessions.iter().any(|session| session.covers(**scope)))
            .map(ProducerScope::interest)
            .collect();
        if required.is_empty() {
            BTreeSet::from([MessageInterest::AllMessages])
        } else {
            required
        }
    }

    pub fn recovery_id(&self) -> RecoveryId {
        self.recovery_id
    }

    pub fn producer_id(&self) -> ProducerId {
        self.producer_id
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn timeout_at(&self) -> Timestamp {
        self.timeout_at
    }

    /// Replay-from point, `None` for a full recovery
    pub fn since(&self) -> Option<Timestamp> {
        self.since
    }

    pub fn required(&self) -> &BTreeSet<MessageInterest> {
        &self.required
    }

    pub fn confirmed(&self) -> &BTreeSet<MessageInterest> {
        &self.confirmed
    }

    /// Record a snapshot-complete and report whether the attempt is now complete
    ///
    /// A completion confirms every required interest whose scope it covers, so
    /// `AllMessages` finishes a multi-scope producer in one step while scoped
    /// sessions confirm one scope each.
    pub fn confirm(&mut self, interest: MessageInterest) -> bool {
        for required in &self.required {
            let covered = match required.scope() {
                Some(scope) => interest.covers(scope),
                None => interest.covers_all_scopes(),
            };
            if covered {
                self.confirmed.insert(*required);
            }
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.required.is_subset(&self.confirmed)
    }

    /// Required interests still waiting for a snapshot-complete
    pub fn pending(&self) -> impl Iterator<Item = &MessageInterest> {
        self.required.difference(&self.confirmed)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.timeout_at
    }

    /// Mark as interrupted; the id stays current until the attempt is replaced
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    pub fn is_interrupted(&self, now: Timestamp) -> bool {
        self.interrupted || self.is_expired(now)
    }

    /// Elapsed time since the request was issued
    pub fn elapsed(&self, now: Timestamp) -> Duration {
        Duration::from_millis(now.saturating_sub(self.started_at).max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn attempt(scopes: &[ProducerScope]) -> RecoveryAttempt {
        let required = RecoveryAttempt::required_interests(scopes, &[MessageInterest::AllMessages]);
        RecoveryAttempt::new(55, 1, 1_000_000, HOUR, None, required)
    }

    #[test]
    fn test_all_messages_completes_multi_scope_producer() {
        let mut attempt = attempt(&[ProducerScope::Prematch, ProducerScope::Live]);
        assert_eq!(attempt.required().len(), 2);

        assert!(attempt.confirm(MessageInterest::AllMessages));
        assert_eq!(attempt.pending().count(), 0);
    }

    #[test]
    fn test_scoped_completions_needed_per_scope() {
        let mut attempt = attempt(&[ProducerScope::Prematch, ProducerScope::Live]);

        assert!(!attempt.confirm(MessageInterest::PrematchMessagesOnly));
        assert_eq!(
            attempt.pending().copied().collect::<Vec<_>>(),
            vec![MessageInterest::LiveMessagesOnly]
        );

        assert!(attempt.confirm(MessageInterest::LiveMessagesOnly));
    }

    #[test]
    fn test_unrelated_scope_does_not_confirm() {
        let mut attempt = attempt(&[ProducerScope::Live]);
        assert!(!attempt.confirm(MessageInterest::PrematchMessagesOnly));
        assert!(attempt.confirmed().is_empty());
    }

    #[test]
    fn test_duplicate_confirmation_is_idempotent() {
        let mut attempt = attempt(&[ProducerScope::Live]);
        assert!(attempt.confirm(MessageInterest::LiveMessagesOnly));
        assert!(attempt.confirm(MessageInterest::LiveMessagesOnly));
        assert_eq!(attempt.confirmed().len(), 1);
    }

    #[test]
    fn test_scopeless_producer_needs_full_confirmation() {
        let mut attempt = attempt(&[]);
        assert!(!attempt.confirm(MessageInterest::LiveMessagesOnly));
        assert!(attempt.confirm(MessageInterest::HiPriorityMessages));
    }

    #[test]
    fn test_required_limited_to_session_scopes() {
        let required = RecoveryAttempt::required_interests(
            &[ProducerScope::Prematch, ProducerScope::Live],
            &[MessageInterest::LiveMessagesOnly],
        );
        assert_eq!(required, BTreeSet::from([MessageInterest::LiveMessagesOnly]));

        let required = RecoveryAttempt::required_interests(
            &[ProducerScope::Virtual],
            &[MessageInterest::LiveMessagesOnly],
        );
        assert_eq!(required, BTreeSet::from([MessageInterest::AllMessages]));
    }

    #[test]
    fn test_timeout_boundary() {
        let attempt = attempt(&[ProducerScope::Live]);
        assert_eq!(attempt.timeout_at(), 1_000_000 + 3_600_000);
        assert!(!attempt.is_expired(attempt.timeout_at() - 1));
        assert!(attempt.is_expired(attempt.timeout_at()));
        assert!(attempt.is_interrupted(attempt.timeout_at()));
    }

    #[test]
    fn test_interrupt_flag() {
        let mut attempt = attempt(&[ProducerScope::Live]);
        assert!(!attempt.is_interrupted(1_000_001));
        attempt.interrupt();
        assert!(attempt.is_interrupted(1_000_001));
        assert_eq!(attempt.elapsed(1_005_000), Duration::from_secs(5));
    }
}
