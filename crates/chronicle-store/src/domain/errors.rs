//! Error types for the block store subsystem.

use shared_types::BlockId;

/// Errors raised by sources, stores, and their decorators.
///
/// Absence of a block on `try_get` is NOT an error; only callers that
/// require presence (via `get`) see [`StoreError::MissingBlock`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A required block id was not found where presence was assumed.
    #[error("missing block: {id}")]
    MissingBlock { id: BlockId },

    /// The backing storage failed to read or write.
    #[error("storage fault: {message}")]
    StorageFault { message: String },
}

impl StoreError {
    pub fn missing(id: &BlockId) -> Self {
        StoreError::MissingBlock { id: id.clone() }
    }
}
