//! # Outbound Port: Peer Network
//!
//! Dependencies on the peer-discovery/routing collaborator. This subsystem
//! only consumes streams and peer lookups; it never implements discovery.

use async_trait::async_trait;
use shared_types::{BlockId, ClusterPeers, PeerId};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::domain::errors::TransactError;
use crate::ports::inbound::RepoOptions;

/// A bidirectional peer stream bound to one protocol id.
pub trait ProtocolStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ProtocolStream for T {}

/// The peer-to-peer network collaborator.
#[async_trait]
pub trait PeerNetwork: Send + Sync {
    /// Open a stream to `peer` speaking `protocol`. Cancellation aborts the
    /// dial via the options' token.
    async fn dial_protocol(
        &self,
        peer: &PeerId,
        protocol: &str,
        options: &RepoOptions,
    ) -> Result<Box<dyn ProtocolStream>, TransactError>;

    /// Find the peer currently coordinating the given key.
    async fn find_coordinator(
        &self,
        key: &BlockId,
        options: &RepoOptions,
    ) -> Result<PeerId, TransactError>;

    /// Find the replica set responsible for the given key.
    async fn find_cluster(&self, key: &BlockId) -> Result<ClusterPeers, TransactError>;
}
