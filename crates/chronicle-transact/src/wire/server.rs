//! # Per-Stream Server Dispatch
//!
//! The receiving half of the wire protocol: read one request frame, execute
//! its operations against a local [`Repo`], answer with one response frame.
//! Peers register this under [`crate::REPO_PROTOCOL`] with their stream
//! multiplexer; tests drive it over an in-memory duplex stream.

use shared_types::{OperationResult, RepoMessage, RepoOperation, RepoResponse};
use tokio::io::AsyncWriteExt;

use crate::domain::errors::TransactError;
use crate::ports::inbound::{Repo, RepoOptions};
use crate::ports::outbound::ProtocolStream;
use crate::wire::framing::{read_frame, write_frame};

/// Serve one message/response exchange, then shut the stream down.
pub async fn serve_repo_stream<R, S>(repo: &R, stream: &mut S) -> Result<(), TransactError>
where
    R: Repo + ?Sized,
    S: ProtocolStream + ?Sized,
{
    let outcome = async {
        let message: RepoMessage = read_frame(stream).await?;
        let options = RepoOptions {
            expiration: message.expiration,
            ..RepoOptions::default()
        };
        let mut results = Vec::with_capacity(message.operations.len());
        for operation in message.operations {
            results.push(execute(repo, operation, &options).await);
        }
        write_frame(stream, &RepoResponse { results }).await
    }
    .await;

    let _ = stream.shutdown().await;
    outcome
}

/// Run one operation; faults become `Error` results so the batch's other
/// operations still answer.
async fn execute<R: Repo + ?Sized>(
    repo: &R,
    operation: RepoOperation,
    options: &RepoOptions,
) -> OperationResult {
    match operation {
        RepoOperation::Get(gets) => match repo.get(gets, options).await {
            Ok(results) => OperationResult::Get(results),
            Err(err) => OperationResult::Error(err.to_string()),
        },
        RepoOperation::Pend(request) => match repo.pend(request, options).await {
            Ok(result) => OperationResult::Pend(result),
            Err(err) => OperationResult::Error(err.to_string()),
        },
        RepoOperation::Cancel(trx) => match repo.cancel(trx, options).await {
            Ok(()) => OperationResult::Cancel,
            Err(err) => OperationResult::Error(err.to_string()),
        },
        RepoOperation::Commit(request) => match repo.commit(request, options).await {
            Ok(result) => OperationResult::Commit(result),
            Err(err) => OperationResult::Error(err.to_string()),
        },
    }
}
