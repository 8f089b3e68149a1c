//! Seam to the data-access layer that performs recovery calls

use super::RecoveryAttempt;
use crate::core::{CommunicationError, MessageInterest, ProducerId, RecoveryId, Timestamp};
use std::collections::BTreeSet;

/// Everything the upstream needs to replay one producer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryRequest {
    pub producer_id: ProducerId,
    pub recovery_id: RecoveryId,
    /// Replay-from point; `None` requests a full recovery
    pub since: Option<Timestamp>,
    pub interests: BTreeSet<MessageInterest>,
    pub node_id: Option<i32>,
    pub requested_at: Timestamp,
}

impl RecoveryRequest {
    pub fn from_attempt(attempt: &RecoveryAttempt, node_id: Option<i32>) -> Self {
        Self {
            producer_id: attempt.producer_id(),
            recovery_id: attempt.recovery_id(),
            since: attempt.since(),
            interests: attempt.required().clone(),
            node_id,
            requested_at: attempt.started_at(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.since.is_none()
    }
}

/// Performs the recovery call
///
/// Invoked on the scheduler's one-shot worker, never under a producer lock.
pub trait RecoveryRequestIssuer: Send + Sync {
    fn request_recovery(&self, request: &RecoveryRequest) -> Result<(), CommunicationError>;
}
