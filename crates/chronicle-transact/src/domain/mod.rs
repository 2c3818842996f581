//! Domain layer: transaction lifecycle and error taxonomy.

pub mod errors;
pub mod state;
