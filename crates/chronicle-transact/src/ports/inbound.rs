//! # Inbound Port: Repo
//!
//! The four operations of the transaction protocol. Implemented locally by
//! [`crate::Transactor`] and remotely by [`crate::NetworkRepo`]; callers
//! program against this trait and never care which they hold.

use async_trait::async_trait;
use shared_types::{
    BlockGet, CommitRequest, CommitResult, GetBlockResult, PendRequest, PendResult, TrxRef,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

use crate::domain::errors::TransactError;

/// Options threaded through every repo operation.
#[derive(Debug, Clone, Default)]
pub struct RepoOptions {
    /// Deadline in milliseconds since the epoch; `None` means no deadline.
    pub expiration: Option<u64>,
    /// Cooperative cancellation signal. A cancelled operation must still
    /// release its stream before returning.
    pub cancellation: CancellationToken,
}

impl RepoOptions {
    pub fn with_expiration(expiration: u64) -> Self {
        Self {
            expiration: Some(expiration),
            ..Self::default()
        }
    }

    /// Fail fast when the operation is already cancelled or expired.
    pub fn check(&self) -> Result<(), TransactError> {
        if self.cancellation.is_cancelled() {
            return Err(TransactError::Cancelled);
        }
        if let Some(expiration) = self.expiration {
            let now_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            if now_ms > expiration {
                return Err(TransactError::Expired);
            }
        }
        Ok(())
    }
}

/// The transaction protocol contract.
#[async_trait]
pub trait Repo: Send + Sync {
    /// Fetch blocks by id, optionally pinned to a transaction context.
    /// Never mutates any version pointer.
    async fn get(
        &self,
        gets: Vec<BlockGet>,
        options: &RepoOptions,
    ) -> Result<Vec<GetBlockResult>, TransactError>;

    /// Optimistically stage a transform against an expected revision.
    async fn pend(
        &self,
        request: PendRequest,
        options: &RepoOptions,
    ) -> Result<PendResult, TransactError>;

    /// Finalize a previously pended transaction against the same revision.
    async fn commit(
        &self,
        request: CommitRequest,
        options: &RepoOptions,
    ) -> Result<CommitResult, TransactError>;

    /// Void a pended, not-yet-committed transaction. Cancelling an unknown
    /// or already-settled transaction is a no-op, never a staleness error.
    async fn cancel(&self, trx: TrxRef, options: &RepoOptions) -> Result<(), TransactError>;
}
