//! # Cluster Coordinator
//!
//! Drives a record through the promise and commit phases by circulating it
//! among the responsible peers over a [`ClusterTransport`], merging each
//! reply back into the working copy. Terminal statuses short-circuit the
//! remaining round.

use shared_types::PeerId;
use std::sync::Arc;

use crate::domain::errors::ClusterError;
use crate::domain::{evaluate, ClusterRecord, ConsensusStatus, QuorumPolicy};
use crate::ports::ClusterTransport;
use crate::service::verify_record;

pub struct ClusterCoordinator<T> {
    transport: Arc<T>,
    policy: QuorumPolicy,
}

impl<T: ClusterTransport> ClusterCoordinator<T> {
    pub fn new(transport: Arc<T>, policy: QuorumPolicy) -> Self {
        Self { transport, policy }
    }

    /// Circulate the record until it reaches a terminal status or both
    /// rounds complete. Returns the final status and the fully merged
    /// record.
    pub async fn execute(
        &self,
        mut record: ClusterRecord,
    ) -> Result<(ConsensusStatus, ClusterRecord), ClusterError> {
        record.verify_hash()?;
        let peers: Vec<PeerId> = record.peers.keys().cloned().collect();

        // Promise round. Peers that see the quorum complete mid-round also
        // contribute their commit signatures here.
        let status = self.circulate(&peers, &mut record).await?;
        if status.is_terminal() {
            return Ok((status, record));
        }

        // Commit round: every peer now sees the promise quorum.
        let status = self.circulate(&peers, &mut record).await?;
        tracing::info!(
            hash = %record.message_hash,
            ?status,
            "consensus round complete"
        );
        Ok((status, record))
    }

    async fn circulate(
        &self,
        peers: &[PeerId],
        record: &mut ClusterRecord,
    ) -> Result<ConsensusStatus, ClusterError> {
        for peer in peers {
            let reply = self.transport.update(peer, record.clone()).await?;
            reply.verify_hash()?;
            verify_record(&reply)?;
            record.merge(&reply);
            let status = evaluate(record, self.policy);
            if status.is_terminal() {
                return Ok(status);
            }
        }
        Ok(evaluate(record, self.policy))
    }
}
