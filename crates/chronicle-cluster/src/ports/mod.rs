//! # Ports (Hexagonal Architecture)
//!
//! - Inbound: [`Cluster`], how a peer receives consensus records.
//! - Outbound: [`ClusterTransport`], how the coordinator reaches other
//!   peers, and [`MessageReviewer`], the local policy hook deciding whether
//!   this peer approves a proposed message.

use async_trait::async_trait;
use shared_types::{PeerId, RepoMessage};

use crate::domain::errors::ClusterError;
use crate::domain::ClusterRecord;

/// Inbound port: accept a (possibly partially signed) record from another
/// peer, contribute this peer's signatures, and return the enriched copy.
#[async_trait]
pub trait Cluster: Send + Sync {
    async fn update(&self, record: ClusterRecord) -> Result<ClusterRecord, ClusterError>;
}

/// Outbound port: deliver a record to a named peer and collect its reply.
#[async_trait]
pub trait ClusterTransport: Send + Sync {
    async fn update(
        &self,
        peer: &PeerId,
        record: ClusterRecord,
    ) -> Result<ClusterRecord, ClusterError>;
}

/// Local review policy: decide whether this peer approves a message.
///
/// `Ok(())` approves; `Err(reason)` produces a signed rejection carrying
/// the reason.
pub trait MessageReviewer: Send + Sync {
    fn review(&self, message: &RepoMessage) -> Result<(), String>;
}

/// Reviewer that approves everything. Suitable when validation already
/// happened upstream of the cluster layer.
pub struct ApproveAll;

impl MessageReviewer for ApproveAll {
    fn review(&self, _message: &RepoMessage) -> Result<(), String> {
        Ok(())
    }
}
