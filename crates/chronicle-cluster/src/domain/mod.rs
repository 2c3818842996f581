//! # Cluster Domain
//!
//! The shared consensus record, its signatures, and the pure evaluation
//! rules. Everything here is deterministic; signing and transport live in
//! the service and coordinator layers.

pub mod errors;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};
use shared_types::{ClusterPeers, PeerId, RepoMessage};
use std::collections::BTreeMap;

use errors::ClusterError;

/// The verdict a peer signs over a proposed message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureKind {
    Approve,
    Reject,
}

/// One peer's signature for one phase of the protocol.
///
/// The signed payload is `"{phase}:{message_hash}:{kind}"`, so a promise
/// signature cannot be replayed as a commit and an approval cannot be
/// reinterpreted as a rejection.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSignature {
    pub kind: SignatureKind,
    /// Ed25519 signature bytes (64).
    #[serde_as(as = "Bytes")]
    pub signature: Vec<u8>,
    /// Human-readable reason, present only on rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

impl PeerSignature {
    pub fn is_approval(&self) -> bool {
        self.kind == SignatureKind::Approve
    }
}

/// Canonical content hash of a repo message: base64url of the SHA-256 of
/// its JSON encoding.
pub fn message_hash(message: &RepoMessage) -> Result<String, ClusterError> {
    let canonical = serde_json::to_vec(message)?;
    let digest = Sha256::digest(&canonical);
    Ok(URL_SAFE_NO_PAD.encode(digest))
}

/// The payload a peer signs for a given phase and verdict.
pub fn signing_payload(phase: &str, hash: &str, kind: SignatureKind) -> Vec<u8> {
    let verdict = match kind {
        SignatureKind::Approve => "approve",
        SignatureKind::Reject => "reject",
    };
    format!("{phase}:{hash}:{verdict}").into_bytes()
}

/// How many of the responsible peers must sign each phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuorumPolicy {
    /// Every responsible peer must approve.
    #[default]
    All,
    /// A strict majority of responsible peers must approve.
    Majority,
}

impl QuorumPolicy {
    pub fn satisfied(&self, approvals: usize, total: usize) -> bool {
        match self {
            QuorumPolicy::All => total > 0 && approvals >= total,
            QuorumPolicy::Majority => approvals * 2 > total,
        }
    }
}

/// Where a record stands under a given quorum policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsensusStatus {
    /// Still gathering promise signatures.
    Promising,
    /// Promise quorum met; gathering commit signatures.
    Committing,
    /// Commit quorum met with no rejections. Terminal.
    Accepted,
    /// A responsible peer rejected the message. Terminal.
    Rejected {
        peer: PeerId,
        reason: Option<String>,
    },
}

impl ConsensusStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConsensusStatus::Accepted | ConsensusStatus::Rejected { .. })
    }
}

/// The record passed between peers during a clustered transaction.
///
/// Signature maps are keyed by peer so merging two copies of the record is
/// a union. A peer never signs twice for the same phase, so first-wins on
/// conflict preserves whichever verdict was recorded first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Content hash of `message`, the record's identity.
    pub message_hash: String,
    /// The peers responsible for this message's key, with their addresses
    /// and public keys.
    pub peers: ClusterPeers,
    /// The proposed repo message.
    pub message: RepoMessage,
    pub promises: BTreeMap<PeerId, PeerSignature>,
    pub commits: BTreeMap<PeerId, PeerSignature>,
}

impl ClusterRecord {
    pub fn new(message: RepoMessage, peers: ClusterPeers) -> Result<Self, ClusterError> {
        Ok(Self {
            message_hash: message_hash(&message)?,
            peers,
            message,
            promises: BTreeMap::new(),
            commits: BTreeMap::new(),
        })
    }

    /// Confirm the declared hash still matches the message body.
    pub fn verify_hash(&self) -> Result<(), ClusterError> {
        let computed = message_hash(&self.message)?;
        if computed != self.message_hash {
            return Err(ClusterError::HashMismatch {
                declared: self.message_hash.clone(),
                computed,
            });
        }
        Ok(())
    }

    /// Union another copy's signatures into this one. Existing entries win.
    pub fn merge(&mut self, other: &ClusterRecord) {
        for (peer, signature) in &other.promises {
            self.promises
                .entry(peer.clone())
                .or_insert_with(|| signature.clone());
        }
        for (peer, signature) in &other.commits {
            self.commits
                .entry(peer.clone())
                .or_insert_with(|| signature.clone());
        }
    }

    fn first_rejection(&self) -> Option<(&PeerId, &PeerSignature)> {
        self.promises
            .iter()
            .chain(self.commits.iter())
            .find(|(_, sig)| !sig.is_approval())
    }

    fn approvals(map: &BTreeMap<PeerId, PeerSignature>) -> usize {
        map.values().filter(|sig| sig.is_approval()).count()
    }
}

/// Evaluate where a record stands. Rejections dominate: one reject from a
/// responsible peer settles the record regardless of other signatures.
pub fn evaluate(record: &ClusterRecord, policy: QuorumPolicy) -> ConsensusStatus {
    if let Some((peer, signature)) = record.first_rejection() {
        return ConsensusStatus::Rejected {
            peer: peer.clone(),
            reason: signature.reject_reason.clone(),
        };
    }
    let total = record.peers.len();
    if policy.satisfied(ClusterRecord::approvals(&record.commits), total) {
        return ConsensusStatus::Accepted;
    }
    if policy.satisfied(ClusterRecord::approvals(&record.promises), total) {
        return ConsensusStatus::Committing;
    }
    ConsensusStatus::Promising
}
