//! Adapters: concrete raw-storage implementations.

pub mod memory;
