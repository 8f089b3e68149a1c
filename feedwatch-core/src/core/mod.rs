//! Core types shared by every module
//!
//! - Identifiers (`ProducerId`, `RecoveryId`, `SessionId`, `Timestamp`)
//! - Message interests and producer scopes
//! - Up / down / status-change reason taxonomies
//! - Error types

pub mod errors;
pub mod types;

// Re-export commonly used types
pub use errors::{CommunicationError, RegistryError};
pub use types::{
    MessageInterest, ProducerDownReason, ProducerId, ProducerScope, ProducerStatusReason,
    ProducerUpReason, RecoveryId, SessionId, Timestamp,
};
