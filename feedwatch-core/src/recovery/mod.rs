//! Recovery coordination
//!
//! - `RecoveryManager`: event handlers plus the periodic health check
//! - `RecoveryAttempt`: one in-flight request and its confirmations
//! - `RecoveryRequestIssuer`: seam to the API performing the replay
//! - `ChannelState` / `ShutdownSignal`: transport connectivity

pub mod attempt;
pub mod channel;
pub mod issuer;
pub mod manager;
mod sweep;

pub use attempt::RecoveryAttempt;
pub use channel::{ChannelState, ShutdownSignal};
pub use issuer::{RecoveryRequest, RecoveryRequestIssuer};
pub use manager::{InFlight, RecoveryManager, RecoveryManagerBuilder, RecoveryStats};
