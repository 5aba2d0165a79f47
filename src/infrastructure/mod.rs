//! Adapters for the domain ports: data stores, clocks and the sync endpoint.

pub mod clock;
pub mod in_memory;
mod ordering;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod sink;
