//! Producer records and their registry

pub mod model;
pub mod registry;

pub use model::{AliveChannel, AliveTimestamps, Producer};
pub use registry::{ProducerHandle, ProducerManager, ProducerRegistry};
