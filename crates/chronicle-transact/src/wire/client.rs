//! # Network Repo Client
//!
//! [`NetworkRepo`] implements the [`Repo`] contract against a remote peer:
//! each operation becomes one [`RepoMessage`] carrying a one-element
//! discriminated union, written as a single length-prefixed frame on a
//! freshly dialed stream; exactly one response frame is read back.
//!
//! The stream is shut down on success, failure, and cancellation paths.

use async_trait::async_trait;
use shared_types::{
    BlockGet, CommitRequest, CommitResult, GetBlockResult, OperationResult, PendRequest,
    PendResult, PeerId, RepoMessage, RepoOperation, RepoResponse, TrxRef,
};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::domain::errors::TransactError;
use crate::ports::inbound::{Repo, RepoOptions};
use crate::ports::outbound::PeerNetwork;
use crate::wire::framing::{read_frame, write_frame};
use crate::wire::REPO_PROTOCOL;

/// Repo implementation that forwards every operation to one remote peer.
pub struct NetworkRepo {
    network: Arc<dyn PeerNetwork>,
    peer: PeerId,
}

impl NetworkRepo {
    pub fn new(network: Arc<dyn PeerNetwork>, peer: PeerId) -> Self {
        Self { network, peer }
    }

    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    /// One message/response exchange on a fresh stream.
    async fn exchange(
        &self,
        operation: RepoOperation,
        options: &RepoOptions,
    ) -> Result<OperationResult, TransactError> {
        options.check()?;
        let token = options.cancellation.clone();

        let mut stream = tokio::select! {
            _ = token.cancelled() => return Err(TransactError::Cancelled),
            dialed = self.network.dial_protocol(&self.peer, REPO_PROTOCOL, options) => dialed?,
        };

        let message = RepoMessage::single(operation, options.expiration);
        let outcome = tokio::select! {
            _ = token.cancelled() => Err(TransactError::Cancelled),
            exchanged = async {
                write_frame(&mut stream, &message).await?;
                read_frame::<_, RepoResponse>(&mut stream).await
            } => exchanged,
        };

        // Release the stream on every path before surfacing the outcome.
        let _ = stream.shutdown().await;

        let mut response = outcome?;
        if response.results.len() != 1 {
            return Err(TransactError::Protocol(format!(
                "expected 1 result, got {}",
                response.results.len()
            )));
        }
        match response.results.remove(0) {
            OperationResult::Error(message) => Err(TransactError::Remote(message)),
            result => Ok(result),
        }
    }
}

#[async_trait]
impl Repo for NetworkRepo {
    async fn get(
        &self,
        gets: Vec<BlockGet>,
        options: &RepoOptions,
    ) -> Result<Vec<GetBlockResult>, TransactError> {
        match self.exchange(RepoOperation::Get(gets), options).await? {
            OperationResult::Get(results) => Ok(results),
            other => Err(mismatch("get", &other)),
        }
    }

    async fn pend(
        &self,
        request: PendRequest,
        options: &RepoOptions,
    ) -> Result<PendResult, TransactError> {
        match self.exchange(RepoOperation::Pend(request), options).await? {
            OperationResult::Pend(result) => Ok(result),
            other => Err(mismatch("pend", &other)),
        }
    }

    async fn commit(
        &self,
        request: CommitRequest,
        options: &RepoOptions,
    ) -> Result<CommitResult, TransactError> {
        match self.exchange(RepoOperation::Commit(request), options).await? {
            OperationResult::Commit(result) => Ok(result),
            other => Err(mismatch("commit", &other)),
        }
    }

    async fn cancel(&self, trx: TrxRef, options: &RepoOptions) -> Result<(), TransactError> {
        match self.exchange(RepoOperation::Cancel(trx), options).await? {
            OperationResult::Cancel => Ok(()),
            other => Err(mismatch("cancel", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &OperationResult) -> TransactError {
    TransactError::Protocol(format!("{expected} answered with {got:?}"))
}
