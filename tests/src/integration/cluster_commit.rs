//! # Consensus-Gated Commit
//!
//! A commit message circulated through the cluster before it is applied:
//! the responsible peers review and sign the exact frame that will close
//! the transaction, and the repo only executes it once the record is
//! accepted.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chronicle_cluster::{
        verify_record, ApproveAll, Cluster, ClusterCoordinator, ClusterError, ClusterRecord,
        ClusterService, ClusterTransport, ConsensusStatus, MessageReviewer, QuorumPolicy,
    };
    use chronicle_store::{BlockSource, MemoryBlockStore};
    use chronicle_transact::{Repo, RepoOptions, Transactor};
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;
    use shared_types::{
        Block, BlockType, ClusterPeer, ClusterPeers, CollectionId, CommitRequest, KeyedMutex,
        PendPolicy, PendRequest, PeerId, RepoMessage, RepoOperation, Revision, Transform, TrxId,
    };
    use std::collections::HashMap;
    use std::sync::Arc;

    struct LocalTransport {
        services: HashMap<PeerId, Arc<ClusterService>>,
    }

    #[async_trait]
    impl ClusterTransport for LocalTransport {
        async fn update(
            &self,
            peer: &PeerId,
            record: ClusterRecord,
        ) -> Result<ClusterRecord, ClusterError> {
            let service = self
                .services
                .get(peer)
                .ok_or_else(|| ClusterError::Transport(format!("no route to {peer}")))?;
            service.update(record).await
        }
    }

    /// Reviewer that refuses commit operations behind the revision it
    /// believes is current.
    struct RevisionGate {
        head: Revision,
    }

    impl MessageReviewer for RevisionGate {
        fn review(&self, message: &RepoMessage) -> Result<(), String> {
            for operation in &message.operations {
                if let RepoOperation::Commit(request) = operation {
                    if request.rev != self.head {
                        return Err("stale revision".to_string());
                    }
                }
            }
            Ok(())
        }
    }

    fn cluster(reviewers: Vec<(&str, Arc<dyn MessageReviewer>)>) -> (LocalTransport, ClusterPeers) {
        let mut services = HashMap::new();
        let mut peers = ClusterPeers::new();
        for (id, reviewer) in reviewers {
            let service = Arc::new(ClusterService::new(
                PeerId::from(id),
                SigningKey::generate(&mut OsRng),
                QuorumPolicy::All,
                reviewer,
            ));
            peers.insert(
                service.peer_id().clone(),
                ClusterPeer {
                    address: format!("/dns/{id}/tcp/4040"),
                    public_key: service.public_key(),
                },
            );
            services.insert(service.peer_id().clone(), service);
        }
        (LocalTransport { services }, peers)
    }

    /// Pend a single-insert transform and return the commit request that
    /// would close it.
    async fn pend_one(transactor: &Transactor<MemoryBlockStore>) -> CommitRequest {
        let header = transactor
            .store()
            .create_block_header(BlockType::from("LOG"), None);
        let block_id = header.id.clone();
        let mut transform = Transform::new();
        transform.insert(Block::new(header));
        let trx_id = TrxId::generate();
        let pended = transactor
            .pend(
                PendRequest {
                    transform,
                    trx_id: trx_id.clone(),
                    rev: 0,
                    policy: PendPolicy::Continue,
                },
                &RepoOptions::default(),
            )
            .await
            .expect("pend");
        assert!(pended.is_pending());
        CommitRequest {
            header_id: None,
            tail_id: block_id.clone(),
            block_ids: vec![block_id],
            trx_id,
            rev: 0,
        }
    }

    #[tokio::test]
    async fn test_accepted_record_closes_the_transaction() {
        let store = Arc::new(MemoryBlockStore::new(CollectionId::from("ledger")));
        let transactor = Arc::new(Transactor::new(store, Arc::new(KeyedMutex::new())));
        let request = pend_one(&transactor).await;
        let block_id = request.tail_id.clone();

        let (transport, peers) = cluster(vec![
            ("a", Arc::new(RevisionGate { head: 0 })),
            ("b", Arc::new(RevisionGate { head: 0 })),
            ("c", Arc::new(ApproveAll)),
        ]);
        let message = RepoMessage::single(RepoOperation::Commit(request.clone()), None);
        let record = ClusterRecord::new(message, peers).expect("record");

        let coordinator = ClusterCoordinator::new(Arc::new(transport), QuorumPolicy::All);
        let (status, record) = coordinator.execute(record).await.expect("execute");
        assert_eq!(status, ConsensusStatus::Accepted);
        verify_record(&record).expect("signatures");

        // Consensus reached: apply the approved message locally.
        let committed = transactor
            .commit(request, &RepoOptions::default())
            .await
            .expect("commit");
        assert!(committed.is_committed());
        let stored = transactor
            .store()
            .try_get(&block_id)
            .await
            .expect("get");
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_rejected_record_leaves_the_transaction_open() {
        let store = Arc::new(MemoryBlockStore::new(CollectionId::from("ledger")));
        let transactor = Arc::new(Transactor::new(store, Arc::new(KeyedMutex::new())));
        let request = pend_one(&transactor).await;
        let block_id = request.tail_id.clone();

        // Peer b believes the head already advanced.
        let (transport, peers) = cluster(vec![
            ("a", Arc::new(ApproveAll)),
            ("b", Arc::new(RevisionGate { head: 3 })),
            ("c", Arc::new(ApproveAll)),
        ]);
        let message = RepoMessage::single(RepoOperation::Commit(request), None);
        let record = ClusterRecord::new(message, peers).expect("record");

        let coordinator = ClusterCoordinator::new(Arc::new(transport), QuorumPolicy::All);
        let (status, record) = coordinator.execute(record).await.expect("execute");
        assert_eq!(
            status,
            ConsensusStatus::Rejected {
                peer: PeerId::from("b"),
                reason: Some("stale revision".to_string()),
            }
        );
        assert!(record.commits.is_empty());

        // Nothing was applied; the block is still invisible.
        let stored = transactor
            .store()
            .try_get(&block_id)
            .await
            .expect("get");
        assert!(stored.is_none());
    }
}
