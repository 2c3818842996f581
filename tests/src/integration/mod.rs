//! Cross-crate integration scenarios.

pub mod archive_restore;
pub mod cluster_commit;
pub mod transaction_flow;
pub mod wire_flow;
