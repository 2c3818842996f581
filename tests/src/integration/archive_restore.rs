//! # Restoring History Committed Elsewhere
//!
//! Committed transactions packaged as a `BlockArchive` and pulled back
//! through a `RevisionManager` on a replica that never saw them.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chronicle_archive::{
        ArchiveEntry, ArchiveError, ArchiveRestorer, BlockArchive, MemoryRawStorage, RawStorage,
        RevisionManager, RevisionRange,
    };
    use chronicle_store::{BlockSource, MemoryBlockStore};
    use chronicle_transact::{Repo, RepoOptions, Transactor};
    use serde_json::json;
    use shared_types::{
        Block, BlockId, BlockOperation, BlockType, CollectionId, CommitRequest, KeyedMutex,
        PendPolicy, PendRequest, Revision, Transform, TrxId,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingRestorer {
        archive: BlockArchive,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArchiveRestorer for CountingRestorer {
        async fn restore(
            &self,
            _block_id: &BlockId,
            _rev: Revision,
        ) -> Result<Option<BlockArchive>, ArchiveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.archive.clone()))
        }
    }

    async fn commit(
        transactor: &Transactor<MemoryBlockStore>,
        transform: Transform,
        rev: u64,
    ) -> TrxId {
        let options = RepoOptions::default();
        let trx_id = TrxId::generate();
        let block_ids = transform.block_ids();
        let pended = transactor
            .pend(
                PendRequest {
                    transform,
                    trx_id: trx_id.clone(),
                    rev,
                    policy: PendPolicy::Continue,
                },
                &options,
            )
            .await
            .expect("pend");
        assert!(pended.is_pending());
        transactor
            .commit(
                CommitRequest {
                    header_id: None,
                    tail_id: block_ids.iter().next().cloned().expect("id"),
                    block_ids: block_ids.into_iter().collect(),
                    trx_id: trx_id.clone(),
                    rev,
                },
                &options,
            )
            .await
            .expect("commit");
        trx_id
    }

    #[tokio::test]
    async fn test_committed_history_restores_onto_a_fresh_replica() {
        let collection = CollectionId::from("ledger");
        let store = Arc::new(MemoryBlockStore::new(collection.clone()));
        let transactor = Transactor::new(Arc::clone(&store), Arc::new(KeyedMutex::new()));

        // Build three revisions of one block on the source peer.
        let header = store.create_block_header(BlockType::from("LOG"), None);
        let block_id = header.id.clone();
        let mut first = Transform::new();
        first.insert(Block::new(header).with_field("entries", json!(["a"])));
        commit(&transactor, first, 0).await;
        for rev in 1..3 {
            let mut next = Transform::new();
            next.update(
                block_id.clone(),
                BlockOperation::splice("entries", rev as usize, 0, vec![json!(rev)]),
            );
            commit(&transactor, next, rev).await;
        }

        // Package the committed history, materializing only the newest state.
        let newest = store.try_get(&block_id).await.expect("get").expect("block");
        let mut archive = BlockArchive::default();
        let committed = transactor.committed_since(&collection, 0);
        assert_eq!(committed.len(), 3);
        let last_rev = committed.last().expect("last").rev;
        for trx in committed {
            let block = (trx.rev == last_rev).then(|| newest.clone());
            archive.revisions.insert(trx.rev, ArchiveEntry { trx, block });
        }

        // A fresh replica pulls revision 2 and gets the whole span.
        let storage = Arc::new(MemoryRawStorage::new());
        let restorer = Arc::new(CountingRestorer {
            archive,
            calls: AtomicUsize::new(0),
        });
        let manager = RevisionManager::new(
            Arc::clone(&storage),
            Some(restorer.clone() as Arc<dyn ArchiveRestorer>),
        );
        manager.ensure_revision(&block_id, 2).await.expect("restore");

        let metadata = storage
            .get_metadata(&block_id)
            .await
            .expect("get")
            .expect("metadata");
        assert_eq!(
            metadata.ranges,
            vec![
                RevisionRange::new(0, Some(0)),
                RevisionRange::new(1, Some(4)),
            ]
        );
        assert_eq!(metadata.latest.expect("latest").rev, 3);
        assert!(storage
            .materialized_block(&block_id, &metadata_trx(&storage, &block_id, 3))
            .is_some());

        // The whole span is now held locally; no further restores happen.
        manager.ensure_revision(&block_id, 1).await.expect("held");
        manager.ensure_revision(&block_id, 3).await.expect("held");
        assert_eq!(restorer.calls.load(Ordering::SeqCst), 1);
    }

    fn metadata_trx(storage: &MemoryRawStorage, block_id: &BlockId, rev: Revision) -> TrxId {
        storage.revision_trx(block_id, rev).expect("revision trx")
    }

    #[tokio::test]
    async fn test_unheld_revision_without_source_stays_missing() {
        let storage = Arc::new(MemoryRawStorage::new());
        let manager: RevisionManager<MemoryRawStorage> =
            RevisionManager::new(Arc::clone(&storage), None);
        let block_id = BlockId::from("never-seen");

        let err = manager
            .ensure_revision(&block_id, 5)
            .await
            .expect_err("missing");
        assert!(matches!(err, ArchiveError::RevisionNotFound { rev: 5, .. }));

        // The probe still seeded queryable metadata.
        let metadata = storage
            .get_metadata(&block_id)
            .await
            .expect("get")
            .expect("metadata");
        assert!(!metadata.holds(5));
        assert!(metadata.latest.is_none());
    }
}
