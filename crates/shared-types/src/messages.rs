//! # Repo Message Types
//!
//! The request/response contract of the transaction protocol, shared by the
//! local transactor, the wire client, and the cluster consensus layer. These
//! types are the wire format: one [`RepoMessage`] is serialized as a single
//! length-prefixed JSON frame.

use crate::ids::{BlockId, PeerId, Revision, TrxId};
use crate::transform::Transform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reference to a pended transaction, used by `cancel` and in conflict
/// reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrxRef {
    pub block_ids: Vec<BlockId>,
    pub trx_id: TrxId,
    pub rev: Revision,
}

/// A committed or pending transaction together with its transform, the unit
/// carried in stale-miss lists and revision archives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrxTransform {
    pub trx_id: TrxId,
    pub rev: Revision,
    pub transform: Transform,
}

/// Pin a block read to a transaction context or collection revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockTrxContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trx_id: Option<TrxId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<Revision>,
}

/// A single block fetch within a `get` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockGet {
    pub block_id: BlockId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BlockTrxContext>,
}

/// Result of one block fetch. Absence is an explicit `None`, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetBlockResult {
    pub block_id: BlockId,
    pub block: Option<crate::block::Block>,
}

/// How a pend treats transactions already pending on touched blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendPolicy {
    /// Fail the pend when any touched block already has a pending
    /// transaction.
    Fail,
    /// Tolerate concurrent pends; overlaps are reported in the result.
    #[default]
    Continue,
}

/// Propose a transform against an expected collection revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendRequest {
    pub transform: Transform,
    pub trx_id: TrxId,
    pub rev: Revision,
    #[serde(default)]
    pub policy: PendPolicy,
}

/// Outcome of a pend. Staleness is an expected domain outcome, not a fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendResult {
    /// The transform was staged. Carries transactions already pending on
    /// touched blocks and the new transaction's affected block ids.
    Pending {
        pending: Vec<TrxRef>,
        block_ids: BTreeSet<BlockId>,
    },
    /// The caller's revision is behind; `missing` lists the transactions
    /// committed after it. Resync and retry.
    Stale { missing: Vec<TrxTransform> },
}

impl PendResult {
    pub fn is_pending(&self) -> bool {
        matches!(self, PendResult::Pending { .. })
    }
}

/// Finalize a previously pended transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRequest {
    /// Present only when the transaction creates a brand-new collection head.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_id: Option<BlockId>,
    /// Tail block of the collection the transaction belongs to.
    pub tail_id: BlockId,
    pub block_ids: Vec<BlockId>,
    pub trx_id: TrxId,
    pub rev: Revision,
}

/// Outcome of a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitResult {
    /// The transaction is final. `coordinator_id` names the peer that
    /// coordinated the commit, when one was involved.
    Committed {
        #[serde(skip_serializing_if = "Option::is_none")]
        coordinator_id: Option<PeerId>,
    },
    /// The head advanced between pend and commit; the pending entry aborts.
    Stale { missing: Vec<TrxTransform> },
}

impl CommitResult {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitResult::Committed { .. })
    }
}

/// One repo operation, serialized as a one-element discriminated union:
/// `{"get":...}`, `{"pend":...}`, `{"cancel":...}`, or `{"commit":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoOperation {
    Get(Vec<BlockGet>),
    Pend(PendRequest),
    Cancel(TrxRef),
    Commit(CommitRequest),
}

/// The body of one wire frame: a batch of operations plus an optional
/// expiration (milliseconds since the epoch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMessage {
    pub operations: Vec<RepoOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
}

impl RepoMessage {
    pub fn single(operation: RepoOperation, expiration: Option<u64>) -> Self {
        Self {
            operations: vec![operation],
            expiration,
        }
    }
}

/// Result of one repo operation, mirroring [`RepoOperation`] variant for
/// variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationResult {
    Get(Vec<GetBlockResult>),
    Pend(PendResult),
    Cancel,
    Commit(CommitResult),
    /// The peer could not execute the operation at all (storage fault,
    /// malformed request). Transport-level, not a domain outcome.
    Error(String),
}

/// The body of one wire response frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoResponse {
    pub results: Vec<OperationResult>,
}
