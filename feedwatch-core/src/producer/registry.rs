//! Producer lookup and the per-producer lock

use super::Producer;
use crate::config::{ProducerConfig, RecoveryConfig};
use crate::core::{ProducerId, RegistryError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Shared producer record; the mutex serializes every transition of one producer
pub type ProducerHandle = Arc<Mutex<Producer>>;

/// Owns the configured producers
pub trait ProducerManager: Send + Sync {
    fn producer(&self, id: ProducerId) -> Option<ProducerHandle>;

    /// Unknown and inactive producers count as down
    fn is_producer_down(&self, id: ProducerId) -> bool {
        match self.producer(id) {
            Some(handle) => {
                let producer = handle.lock();
                !producer.is_active() || producer.is_flagged_down()
            }
            None => true,
        }
    }

    /// Ids in ascending order
    fn producer_ids(&self) -> Vec<ProducerId>;
}

/// Static producer set built from configuration
pub struct ProducerRegistry {
    producers: BTreeMap<ProducerId, ProducerHandle>,
}

impl ProducerRegistry {
    pub fn new(configs: Vec<ProducerConfig>) -> Result<Self, RegistryError> {
        if configs.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut producers = BTreeMap::new();
        for config in configs {
            if config.id == 0 {
                return Err(RegistryError::InvalidProducerId { name: config.name });
            }
            let id = config.id;
            if producers
                .insert(id, Arc::new(Mutex::new(Producer::new(config))))
                .is_some()
            {
                return Err(RegistryError::DuplicateProducer(id));
            }
        }

        info!(count = producers.len(), "Producer registry initialized");
        Ok(Self { producers })
    }

    pub fn from_config(config: &RecoveryConfig) -> Result<Self, RegistryError> {
        Self::new(config.producers.clone())
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}

impl ProducerManager for ProducerRegistry {
    fn producer(&self, id: ProducerId) -> Option<ProducerHandle> {
        self.producers.get(&id).cloned()
    }

    fn producer_ids(&self) -> Vec<ProducerId> {
        self.producers.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProducerScope;

    fn config(id: ProducerId) -> ProducerConfig {
        ProducerConfig::new(id, format!("p{}", id), vec![ProducerScope::Live])
    }

    #[test]
    fn test_ids_sorted() {
        let registry = ProducerRegistry::new(vec![config(5), config(1), config(3)]).unwrap();
        assert_eq!(registry.producer_ids(), vec![1, 3, 5]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_rejects_duplicate_and_zero() {
        assert!(matches!(
            ProducerRegistry::new(vec![config(1), config(1)]),
            Err(RegistryError::DuplicateProducer(1))
        ));
        assert!(matches!(
            ProducerRegistry::new(vec![config(0)]),
            Err(RegistryError::InvalidProducerId { .. })
        ));
        assert!(matches!(ProducerRegistry::new(vec![]), Err(RegistryError::Empty)));
    }

    #[test]
    fn test_unknown_and_inactive_are_down() {
        let mut inactive = config(7);
        inactive.active = false;
        let registry = ProducerRegistry::new(vec![config(1), inactive]).unwrap();

        assert!(registry.is_producer_down(42));
        assert!(registry.is_producer_down(7));

        // Fresh producers start down
        assert!(registry.is_producer_down(1));
        registry.producer(1).unwrap().lock().set_up(1_000);
        assert!(!registry.is_producer_down(1));
    }

    #[test]
    fn test_handles_share_state() {
        let registry = ProducerRegistry::new(vec![config(1)]).unwrap();
        let a = registry.producer(1).unwrap();
        let b = registry.producer(1).unwrap();
        a.lock().set_timestamp_for_recovery(99);
        assert_eq!(b.lock().timestamp_for_recovery(), 99);
    }
}
