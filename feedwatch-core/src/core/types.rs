//! Core vocabulary for producer health tracking
//!
//! Identifiers, message interests, producer scopes, and the three reason
//! taxonomies surfaced to status listeners. Everything here is `Copy` and
//! cheap to pass across threads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an upstream producer (always positive)
pub type ProducerId = u32;

/// Identifier of a recovery request, allocated by a `SequenceGenerator`
pub type RecoveryId = u64;

/// Identifier of a message-processing session (may be negative)
pub type SessionId = i64;

/// Epoch milliseconds
pub type Timestamp = i64;

/// Traffic partition a producer publishes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerScope {
    Live,
    Prematch,
    Virtual,
}

impl ProducerScope {
    /// Interest of a session dedicated to this scope
    pub fn interest(&self) -> MessageInterest {
        match self {
            ProducerScope::Live => MessageInterest::LiveMessagesOnly,
            ProducerScope::Prematch => MessageInterest::PrematchMessagesOnly,
            ProducerScope::Virtual => MessageInterest::VirtualSports,
        }
    }
}

impl fmt::Display for ProducerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProducerScope::Live => write!(f, "live"),
            ProducerScope::Prematch => write!(f, "prematch"),
            ProducerScope::Virtual => write!(f, "virtual"),
        }
    }
}

/// Which slice of traffic a session (and its snapshot-complete) covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageInterest {
    AllMessages,
    LiveMessagesOnly,
    PrematchMessagesOnly,
    VirtualSports,
    HiPriorityMessages,
    LowPriorityMessages,
    SpecifiedMatchesOnly,
}

impl MessageInterest {
    /// Whether a completion on this interest confirms every scope at once
    ///
    /// Priority- and match-filtered sessions still carry all scopes, so their
    /// snapshot-complete certifies the whole producer.
    pub fn covers_all_scopes(&self) -> bool {
        matches!(
            self,
            MessageInterest::AllMessages
                | MessageInterest::HiPriorityMessages
                | MessageInterest::LowPriorityMessages
                | MessageInterest::SpecifiedMatchesOnly
        )
    }

    /// The single scope a scoped interest is restricted to
    pub fn scope(&self) -> Option<ProducerScope> {
        match self {
            MessageInterest::LiveMessagesOnly => Some(ProducerScope::Live),
            MessageInterest::PrematchMessagesOnly => Some(ProducerScope::Prematch),
            MessageInterest::VirtualSports => Some(ProducerScope::Virtual),
            _ => None,
        }
    }

    /// Whether a session with this interest receives traffic of `scope`
    pub fn covers(&self, scope: ProducerScope) -> bool {
        self.covers_all_scopes() || self.scope() == Some(scope)
    }
}

impl fmt::Display for MessageInterest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageInterest::AllMessages => "all",
            MessageInterest::LiveMessagesOnly => "live",
            MessageInterest::PrematchMessagesOnly => "prematch",
            MessageInterest::VirtualSports => "virtual",
            MessageInterest::HiPriorityMessages => "hi_prio",
            MessageInterest::LowPriorityMessages => "low_prio",
            MessageInterest::SpecifiedMatchesOnly => "specified_matches",
        };
        f.write_str(name)
    }
}

/// Why a producer was brought up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProducerUpReason {
    /// First recovery after startup finished
    FirstRecoveryCompleted,
    /// Recovery after an outage finished
    ReturnedFromInactivity,
    /// Processing lag fell back under the budget
    ProcessingQueDelayStabilized,
}

/// Why a producer was flagged down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProducerDownReason {
    /// No system heartbeat within the inactivity budget
    AliveIntervalViolation,
    /// Processed messages lag the producer clock by more than the budget
    ProcessingQueueDelayViolation,
    /// Producer reported the channel as unsubscribed
    Other,
}

impl ProducerDownReason {
    /// Whether data was lost and a replay is needed before trusting the producer again
    pub fn requires_recovery(&self) -> bool {
        match self {
            ProducerDownReason::AliveIntervalViolation | ProducerDownReason::Other => true,
            ProducerDownReason::ProcessingQueueDelayViolation => false,
        }
    }
}

/// Reason attached to every status change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProducerStatusReason {
    FirstRecoveryCompleted,
    ReturnedFromInactivity,
    ProcessingQueDelayStabilized,
    AliveIntervalViolation,
    ProcessingQueueDelayViolation,
    Other,
}

impl From<ProducerUpReason> for ProducerStatusReason {
    fn from(reason: ProducerUpReason) -> Self {
        match reason {
            ProducerUpReason::FirstRecoveryCompleted => ProducerStatusReason::FirstRecoveryCompleted,
            ProducerUpReason::ReturnedFromInactivity => ProducerStatusReason::ReturnedFromInactivity,
            ProducerUpReason::ProcessingQueDelayStabilized => {
                ProducerStatusReason::ProcessingQueDelayStabilized
            }
        }
    }
}

impl From<ProducerDownReason> for ProducerStatusReason {
    fn from(reason: ProducerDownReason) -> Self {
        match reason {
            ProducerDownReason::AliveIntervalViolation => ProducerStatusReason::AliveIntervalViolation,
            ProducerDownReason::ProcessingQueueDelayViolation => {
                ProducerStatusReason::ProcessingQueueDelayViolation
            }
            ProducerDownReason::Other => ProducerStatusReason::Other,
        }
    }
}

impl ProducerStatusReason {
    /// Stable label for metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ProducerStatusReason::FirstRecoveryCompleted => "first_recovery_completed",
            ProducerStatusReason::ReturnedFromInactivity => "returned_from_inactivity",
            ProducerStatusReason::ProcessingQueDelayStabilized => "processing_queue_delay_stabilized",
            ProducerStatusReason::AliveIntervalViolation => "alive_interval_violation",
            ProducerStatusReason::ProcessingQueueDelayViolation => "processing_queue_delay_violation",
            ProducerStatusReason::Other => "other",
        }
    }
}

impl fmt::Display for ProducerStatusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
