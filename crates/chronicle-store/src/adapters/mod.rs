//! Adapters: concrete store implementations.

pub mod memory;
