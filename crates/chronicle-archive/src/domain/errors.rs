//! Error types for the revision-range manager.

use shared_types::{BlockId, Revision};

/// Errors raised by the revision manager and its raw-storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    /// The needed historical data could not be obtained: no restore
    /// callback configured, or the callback yielded nothing. Fatal for the
    /// operation.
    #[error("revision {rev} of block {block_id} not found")]
    RevisionNotFound { block_id: BlockId, rev: Revision },

    /// The raw-storage collaborator failed to read or write.
    #[error("raw storage fault: {message}")]
    StorageFault { message: String },

    /// The restore callback failed outright (as opposed to finding nothing).
    #[error("restore failure: {message}")]
    RestoreFailure { message: String },
}
