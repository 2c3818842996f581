//! # Cluster Consensus
//!
//! The record-based promise/commit signature protocol run across the set of
//! peers responsible for a key.
//!
//! ## Protocol
//!
//! A [`ClusterRecord`] identifies one clustered transaction attempt by the
//! hash of its repo message and carries the peer set plus two signature
//! maps:
//!
//! 1. **Promise phase**: each responsible peer examines the proposed
//!    message and signs `approve` (or `reject` with a reason) into
//!    `promises`.
//! 2. **Commit phase**: once the promise quorum is met, each peer
//!    re-validates and signs into `commits`.
//!
//! The transaction is durably accepted once the commit quorum is met with
//! approvals only; a single `reject` from a required peer blocks closure
//! regardless of other signatures. The quorum rule is an explicit,
//! configurable [`QuorumPolicy`].
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Record, signatures, hashing, status evaluation
//! - `ports/` - `Cluster` API, transport SPI, message review hook
//! - `service` - Per-peer signing service
//! - `coordinator` - Drives a record through both phases across a cluster

pub mod coordinator;
pub mod domain;
pub mod ports;
pub mod service;

pub use coordinator::ClusterCoordinator;
pub use domain::errors::ClusterError;
pub use domain::{
    evaluate, message_hash, ClusterRecord, ConsensusStatus, PeerSignature, QuorumPolicy,
    SignatureKind,
};
pub use ports::{ApproveAll, Cluster, ClusterTransport, MessageReviewer};
pub use service::{verify_record, ClusterService};
