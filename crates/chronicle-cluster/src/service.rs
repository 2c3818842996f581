//! # Cluster Service
//!
//! The per-peer signing service behind the [`Cluster`] port. Each replica
//! runs one; incoming records are hash-checked, their signatures verified
//! against the record's peer set, merged with any locally known copy, and
//! then extended with this peer's own promise and commit signatures.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use parking_lot::Mutex;
use shared_types::{PeerId, RepoMessage};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::errors::ClusterError;
use crate::domain::{
    evaluate, signing_payload, ClusterRecord, ConsensusStatus, PeerSignature, QuorumPolicy,
    SignatureKind,
};
use crate::ports::{Cluster, MessageReviewer};
use async_trait::async_trait;

const PROMISE_PHASE: &str = "promise";
const COMMIT_PHASE: &str = "commit";

/// One peer's view of the consensus protocol.
pub struct ClusterService {
    peer_id: PeerId,
    signing_key: SigningKey,
    policy: QuorumPolicy,
    reviewer: Arc<dyn MessageReviewer>,
    records: Mutex<HashMap<String, ClusterRecord>>,
}

impl ClusterService {
    pub fn new(
        peer_id: PeerId,
        signing_key: SigningKey,
        policy: QuorumPolicy,
        reviewer: Arc<dyn MessageReviewer>,
    ) -> Self {
        Self {
            peer_id,
            signing_key,
            policy,
            reviewer,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn public_key(&self) -> Vec<u8> {
        self.signing_key.verifying_key().to_bytes().to_vec()
    }

    /// This peer's current copy of a record, if it has seen the hash.
    pub fn record(&self, message_hash: &str) -> Option<ClusterRecord> {
        self.records.lock().get(message_hash).cloned()
    }

    fn sign(&self, phase: &str, hash: &str, verdict: Result<(), String>) -> PeerSignature {
        let (kind, reject_reason) = match verdict {
            Ok(()) => (SignatureKind::Approve, None),
            Err(reason) => (SignatureKind::Reject, Some(reason)),
        };
        let signature = self.signing_key.sign(&signing_payload(phase, hash, kind));
        PeerSignature {
            kind,
            signature: signature.to_bytes().to_vec(),
            reject_reason,
        }
    }

    fn review_for(&self, message: &RepoMessage) -> Result<(), String> {
        self.reviewer.review(message)
    }

    /// Add this peer's signatures where they are due: a promise on first
    /// sight, a commit once the promise quorum is met and this peer's own
    /// promise was an approval.
    fn contribute(&self, record: &mut ClusterRecord) {
        if !record.peers.contains_key(&self.peer_id) {
            return;
        }
        if !record.promises.contains_key(&self.peer_id) {
            let verdict = self.review_for(&record.message);
            let signature = self.sign(PROMISE_PHASE, &record.message_hash, verdict);
            record.promises.insert(self.peer_id.clone(), signature);
        }

        let promised_approve = record
            .promises
            .get(&self.peer_id)
            .is_some_and(PeerSignature::is_approval);
        let ready_to_commit = matches!(
            evaluate(record, self.policy),
            ConsensusStatus::Committing | ConsensusStatus::Accepted
        );
        if promised_approve && ready_to_commit && !record.commits.contains_key(&self.peer_id) {
            let signature = self.sign(COMMIT_PHASE, &record.message_hash, Ok(()));
            record.commits.insert(self.peer_id.clone(), signature);
        }
    }
}

/// Verify every signature in the record against the public keys of its
/// peer set.
pub fn verify_record(record: &ClusterRecord) -> Result<(), ClusterError> {
    verify_phase(record, PROMISE_PHASE, &record.promises)?;
    verify_phase(record, COMMIT_PHASE, &record.commits)
}

fn verify_phase(
    record: &ClusterRecord,
    phase: &'static str,
    signatures: &BTreeMap<PeerId, PeerSignature>,
) -> Result<(), ClusterError> {
    for (peer, entry) in signatures {
        let registered = record
            .peers
            .get(peer)
            .ok_or_else(|| ClusterError::UnknownPeer { peer: peer.clone() })?;
        let key_bytes: [u8; 32] = registered
            .public_key
            .as_slice()
            .try_into()
            .map_err(|_| ClusterError::MalformedKey { peer: peer.clone() })?;
        let key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|_| ClusterError::MalformedKey { peer: peer.clone() })?;
        let signature = Signature::from_slice(&entry.signature).map_err(|_| {
            ClusterError::InvalidSignature {
                peer: peer.clone(),
                phase,
            }
        })?;
        let payload = signing_payload(phase, &record.message_hash, entry.kind);
        key.verify(&payload, &signature)
            .map_err(|_| ClusterError::InvalidSignature {
                peer: peer.clone(),
                phase,
            })?;
    }
    Ok(())
}

#[async_trait]
impl Cluster for ClusterService {
    async fn update(&self, record: ClusterRecord) -> Result<ClusterRecord, ClusterError> {
        // A record whose message no longer matches its declared hash is
        // answered with a signed rejection and kept out of local state.
        if let Err(err) = record.verify_hash() {
            let mut refused = record;
            if refused.peers.contains_key(&self.peer_id)
                && !refused.promises.contains_key(&self.peer_id)
            {
                let signature =
                    self.sign(PROMISE_PHASE, &refused.message_hash, Err(err.to_string()));
                refused.promises.insert(self.peer_id.clone(), signature);
            }
            tracing::warn!(
                peer = %self.peer_id,
                hash = %refused.message_hash,
                "rejected record with mismatched hash"
            );
            return Ok(refused);
        }
        verify_record(&record)?;

        let mut records = self.records.lock();
        let merged = records
            .entry(record.message_hash.clone())
            .and_modify(|known| known.merge(&record))
            .or_insert(record);
        self.contribute(merged);
        let result = merged.clone();
        tracing::debug!(
            peer = %self.peer_id,
            hash = %result.message_hash,
            promises = result.promises.len(),
            commits = result.commits.len(),
            "updated cluster record"
        );
        // A settled record has nothing left to gather; drop it so the map
        // only tracks in-flight consensus. The returned copy still circulates
        // and would re-enter here if a late peer forwards it.
        if evaluate(&result, self.policy).is_terminal() {
            records.remove(&result.message_hash);
        }
        Ok(result)
    }
}
