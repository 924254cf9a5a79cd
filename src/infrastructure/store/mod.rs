//! Configuration and log store implementations

mod in_memory;
mod rest;

pub use in_memory::{InMemoryStore, StoreSeed};
pub use rest::RestStore;
