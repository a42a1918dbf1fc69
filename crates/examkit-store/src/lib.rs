//! examkit-store — Result store backends.
//!
//! Implements the `ResultStore` trait for a REST-backed remote store
//! and an in-memory store used offline and in tests.

pub mod config;
pub mod memory;
pub mod rest;

pub use config::{create_store, load_config, ExamkitConfig, StoreConfig};
pub use memory::MemoryStore;
pub use rest::RestStore;
