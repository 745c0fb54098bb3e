//! Infrastructure Layer
//!
//! Key-value store implementations.

pub mod etcd;
pub mod memory;

pub use etcd::{EtcdConfig, EtcdStore};
pub use memory::MemoryStore;
