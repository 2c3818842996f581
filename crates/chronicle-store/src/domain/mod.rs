//! Domain layer: error taxonomy for store operations.

pub mod errors;
