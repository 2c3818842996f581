//! # Peer Entities
//!
//! The view of a replica set this substrate consumes. Peer discovery and
//! routing live in an external collaborator; per transaction it supplies the
//! set of peers responsible for a key, each with a dialable address and the
//! public key its signatures verify against.

use crate::ids::PeerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One peer of a cluster: where to reach it and how to verify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPeer {
    /// Dialable multiaddress of the peer.
    pub address: String,
    /// Ed25519 public key (32 bytes) used to verify the peer's signatures.
    pub public_key: Vec<u8>,
}

/// The set of peers jointly responsible for a key.
pub type ClusterPeers = BTreeMap<PeerId, ClusterPeer>;
