//! Cluster error types.

use shared_types::PeerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    /// The record's declared hash does not match its message.
    #[error("record hash mismatch: declared {declared}, computed {computed}")]
    HashMismatch { declared: String, computed: String },

    /// A signature was presented for a peer outside the record's peer set.
    #[error("unknown peer {peer}")]
    UnknownPeer { peer: PeerId },

    /// A signature failed verification against the peer's public key.
    #[error("invalid {phase} signature from {peer}")]
    InvalidSignature { peer: PeerId, phase: &'static str },

    /// The peer's registered public key is not a valid Ed25519 key.
    #[error("malformed public key for {peer}")]
    MalformedKey { peer: PeerId },

    /// Failed to canonicalize the message for hashing.
    #[error("codec failure: {0}")]
    Codec(#[from] serde_json::Error),

    /// A transport-level failure while exchanging records.
    #[error("transport failure: {0}")]
    Transport(String),
}
