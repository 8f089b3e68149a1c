//! Recovery id allocation

use crate::config::constants::RECOVERY_ID_SEED_MAX;
use crate::core::RecoveryId;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Produces unique, strictly increasing recovery ids
pub trait SequenceGenerator: Send + Sync {
    fn next(&self) -> RecoveryId;
}

/// Lock-free counter
///
/// Seeded from a random start so a restarted process does not reuse ids that
/// upstream may still be replaying for.
#[derive(Debug)]
pub struct AtomicSequenceGenerator {
    next: AtomicU64,
}

impl AtomicSequenceGenerator {
    /// Generator whose first id is `start`
    pub fn starting_at(start: RecoveryId) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Generator with a random first id in `[1, RECOVERY_ID_SEED_MAX)`
    pub fn seeded() -> Self {
        let start = rand::thread_rng().gen_range(1..RECOVERY_ID_SEED_MAX);
        Self::starting_at(start)
    }
}

impl Default for AtomicSequenceGenerator {
    fn default() -> Self {
        Self::seeded()
    }
}

impl SequenceGenerator for AtomicSequenceGenerator {
    #[inline]
    fn next(&self) -> RecoveryId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
