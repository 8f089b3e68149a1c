//! Domain-specific error types for recovery coordination
//!
//! None of these are fatal. Communication failures are retried by the next
//! health check; registry errors surface at startup only.

use crate::core::types::{ProducerId, RecoveryId};
use thiserror::Error;

/// Issuing a recovery request against the upstream API failed
///
/// Transient by definition: the attempt is rolled back and the next sweep
/// (or the next alive message) issues a fresh request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommunicationError {
    /// Upstream answered with a non-success status
    #[error("recovery request {recovery_id} for producer {producer_id} rejected with status {status}")]
    Rejected {
        producer_id: ProducerId,
        recovery_id: RecoveryId,
        status: u16,
    },

    /// Request never reached upstream or timed out
    #[error("recovery request {recovery_id} for producer {producer_id} failed: {message}")]
    Transport {
        producer_id: ProducerId,
        recovery_id: RecoveryId,
        message: String,
    },
}

impl CommunicationError {
    /// Recovery id of the request that failed
    pub fn recovery_id(&self) -> RecoveryId {
        match self {
            CommunicationError::Rejected { recovery_id, .. }
            | CommunicationError::Transport { recovery_id, .. } => *recovery_id,
        }
    }
}

/// Producer table could not be built from configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("producer id must be positive (producer '{name}')")]
    InvalidProducerId { name: String },

    #[error("producer {0} configured more than once")]
    DuplicateProducer(ProducerId),

    #[error("no producers configured")]
    Empty,
}
