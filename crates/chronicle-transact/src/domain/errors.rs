//! Error types for the transaction protocol.
//!
//! Staleness is NOT here: a behind revision is an expected domain outcome
//! returned inside `PendResult`/`CommitResult`. These variants are genuine
//! faults that propagate up the calling chain.

use chronicle_store::StoreError;
use shared_types::TrxId;

/// Errors raised by repo implementations, local and remote.
#[derive(Debug, thiserror::Error)]
pub enum TransactError {
    /// Underlying block storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Commit or cancel referenced a transaction this repo never pended.
    #[error("unknown transaction: {trx_id}")]
    UnknownTransaction { trx_id: TrxId },

    /// The request is malformed (empty transform, revision ahead of head).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A message failed to encode or decode.
    #[error("codec failure: {0}")]
    Codec(#[from] serde_json::Error),

    /// An inbound frame exceeded the size bound.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Dialing the peer failed.
    #[error("dial failure: {0}")]
    Dial(String),

    /// The stream closed before a response arrived.
    #[error("stream closed without a response")]
    StreamClosed,

    /// The operation was cancelled via its cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation's expiration passed before it completed.
    #[error("operation expired")]
    Expired,

    /// Raw stream I/O failed.
    #[error("stream i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// The remote peer reported a failure executing the operation.
    #[error("remote failure: {0}")]
    Remote(String),

    /// The response did not match the request shape.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl TransactError {
    /// Whether this is a transport-level failure, subject to caller-level
    /// retry policy.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TransactError::Dial(_)
                | TransactError::StreamClosed
                | TransactError::Cancelled
                | TransactError::Expired
                | TransactError::Io(_)
        )
    }
}
