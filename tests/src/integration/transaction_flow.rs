//! # Tracker-to-Transactor Flow
//!
//! The full client-side write path: edits staged in a `Tracker`, handed off
//! via `reset`, proposed with `pend`, finalized with `commit`, and the
//! recovery paths when another writer got there first.

#[cfg(test)]
mod tests {
    use chronicle_store::{BlockSource, BlockStore, MemoryBlockStore, Tracker};
    use chronicle_transact::{Repo, RepoOptions, Transactor};
    use serde_json::json;
    use shared_types::{
        Block, BlockOperation, BlockType, CollectionId, CommitRequest, CommitResult, KeyedMutex,
        PendPolicy, PendRequest, PendResult, Transform, TrxId, TrxRef,
    };
    use std::sync::Arc;

    fn transactor() -> Arc<Transactor<MemoryBlockStore>> {
        let store = Arc::new(MemoryBlockStore::new(CollectionId::from("ledger")));
        Arc::new(Transactor::new(store, Arc::new(KeyedMutex::new())))
    }

    /// Pend then commit a transform at the given revision, panicking on any
    /// non-success outcome. Returns the transaction id.
    async fn commit_transform(
        transactor: &Transactor<MemoryBlockStore>,
        transform: Transform,
        rev: u64,
    ) -> TrxId {
        let options = RepoOptions::default();
        let trx_id = TrxId::generate();
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
        let block_ids = match pended {
            PendResult::Pending { block_ids, .. } => block_ids,
            PendResult::Stale { .. } => panic!("unexpected stale pend"),
        };
        let committed = transactor
            .commit(
                CommitRequest {
                    header_id: None,
                    tail_id: block_ids.iter().next().cloned().expect("block id"),
                    block_ids: block_ids.into_iter().collect(),
                    trx_id: trx_id.clone(),
                    rev,
                },
                &options,
            )
            .await
            .expect("commit");
        assert!(committed.is_committed());
        trx_id
    }

    #[tokio::test]
    async fn test_tracked_edits_land_in_the_store_after_commit() {
        let transactor = transactor();
        let tracker = Tracker::new(MemoryBlockStore::new(CollectionId::from("ledger")));

        // Stage an insert and an update without touching any store.
        let header = tracker.create_block_header(BlockType::from("LOG"), None);
        let block_id = header.id.clone();
        tracker
            .insert(Block::new(header).with_field("entries", json!(["opened"])))
            .await
            .expect("insert");
        tracker
            .update(
                block_id.clone(),
                BlockOperation::splice("entries", 1, 0, vec![json!("amended")]),
            )
            .await
            .expect("update");

        // The staged view is already coherent.
        let staged = tracker.try_get(&block_id).await.expect("get").expect("staged");
        assert_eq!(staged.payload["entries"], json!(["opened", "amended"]));

        // Hand off and commit; the tracker is clean afterwards.
        let transform = tracker.reset(None);
        assert!(tracker.reset(None).is_empty());
        commit_transform(&transactor, transform, 0).await;

        let stored = transactor
            .store()
            .try_get(&block_id)
            .await
            .expect("get")
            .expect("committed block");
        assert_eq!(stored.payload["entries"], json!(["opened", "amended"]));
        assert_eq!(transactor.head_revision(&CollectionId::from("ledger")), 1);
    }

    #[tokio::test]
    async fn test_stale_writer_replays_missing_and_retries() {
        let transactor = transactor();

        let header = transactor
            .store()
            .create_block_header(BlockType::from("LOG"), None);
        let mut first = Transform::new();
        first.insert(Block::new(header).with_field("entries", json!(["a"])));
        let winner = commit_transform(&transactor, first, 0).await;

        // A second writer still at revision 0 is told exactly what it missed.
        let header = transactor
            .store()
            .create_block_header(BlockType::from("LOG"), None);
        let mut second = Transform::new();
        second.insert(Block::new(header).with_field("entries", json!(["b"])));
        let stale = transactor
            .pend(
                PendRequest {
                    transform: second.clone(),
                    trx_id: TrxId::generate(),
                    rev: 0,
                    policy: PendPolicy::Continue,
                },
                &RepoOptions::default(),
            )
            .await
            .expect("pend");
        let missing = match stale {
            PendResult::Stale { missing } => missing,
            PendResult::Pending { .. } => panic!("expected stale"),
        };
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].trx_id, winner);
        assert_eq!(missing[0].rev, 1);
        assert_eq!(
            transactor.committed_since(&CollectionId::from("ledger"), 0),
            missing
        );

        // Retry against the advanced head succeeds.
        let head = transactor.head_revision(&CollectionId::from("ledger"));
        commit_transform(&transactor, second, head).await;
        assert_eq!(transactor.head_revision(&CollectionId::from("ledger")), 2);
    }

    #[tokio::test]
    async fn test_fail_policy_yields_to_pending_writer_until_cancel() {
        let transactor = transactor();
        let options = RepoOptions::default();

        let header = transactor
            .store()
            .create_block_header(BlockType::from("LOG"), None);
        let block_id = header.id.clone();
        let mut base = Transform::new();
        base.insert(Block::new(header));

        let holder = TrxId::generate();
        transactor
            .pend(
                PendRequest {
                    transform: base.clone(),
                    trx_id: holder.clone(),
                    rev: 0,
                    policy: PendPolicy::Continue,
                },
                &options,
            )
            .await
            .expect("pend");

        // Overlapping pend under Fail policy is refused, naming the holder.
        let mut overlapping = Transform::new();
        overlapping.update(
            block_id.clone(),
            BlockOperation::replace("entries", json!([])),
        );
        let refused = transactor
            .pend(
                PendRequest {
                    transform: overlapping.clone(),
                    trx_id: TrxId::generate(),
                    rev: 0,
                    policy: PendPolicy::Fail,
                },
                &options,
            )
            .await
            .expect("pend");
        match refused {
            PendResult::Stale { missing } => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].trx_id, holder);
            }
            PendResult::Pending { .. } => panic!("expected refusal"),
        }

        // Once the holder cancels, the Fail-policy writer gets through.
        transactor
            .cancel(
                TrxRef {
                    block_ids: vec![block_id.clone()],
                    trx_id: holder,
                    rev: 0,
                },
                &options,
            )
            .await
            .expect("cancel");
        let retry = transactor
            .pend(
                PendRequest {
                    transform: overlapping,
                    trx_id: TrxId::generate(),
                    rev: 0,
                    policy: PendPolicy::Fail,
                },
                &options,
            )
            .await
            .expect("pend");
        assert!(retry.is_pending());
    }

    #[tokio::test]
    async fn test_commit_after_head_moved_aborts_the_entry() {
        let transactor = transactor();
        let options = RepoOptions::default();

        // Two writers pend at revision 0 on disjoint blocks.
        let header_a = transactor
            .store()
            .create_block_header(BlockType::from("LOG"), None);
        let block_a = header_a.id.clone();
        let mut a = Transform::new();
        a.insert(Block::new(header_a));
        let trx_a = TrxId::generate();
        transactor
            .pend(
                PendRequest {
                    transform: a,
                    trx_id: trx_a.clone(),
                    rev: 0,
                    policy: PendPolicy::Continue,
                },
                &options,
            )
            .await
            .expect("pend a");

        let header_b = transactor
            .store()
            .create_block_header(BlockType::from("LOG"), None);
        let block_b = header_b.id.clone();
        let mut b = Transform::new();
        b.insert(Block::new(header_b));
        let trx_b = TrxId::generate();
        transactor
            .pend(
                PendRequest {
                    transform: b,
                    trx_id: trx_b.clone(),
                    rev: 0,
                    policy: PendPolicy::Continue,
                },
                &options,
            )
            .await
            .expect("pend b");

        // A commits first; B's commit at revision 0 is now stale and aborts.
        let committed = transactor
            .commit(
                CommitRequest {
                    header_id: None,
                    tail_id: block_a.clone(),
                    block_ids: vec![block_a],
                    trx_id: trx_a.clone(),
                    rev: 0,
                },
                &options,
            )
            .await
            .expect("commit a");
        assert!(committed.is_committed());

        let stale = transactor
            .commit(
                CommitRequest {
                    header_id: None,
                    tail_id: block_b.clone(),
                    block_ids: vec![block_b],
                    trx_id: trx_b.clone(),
                    rev: 0,
                },
                &options,
            )
            .await
            .expect("commit b");
        match stale {
            CommitResult::Stale { missing } => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].trx_id, trx_a);
            }
            CommitResult::Committed { .. } => panic!("expected stale"),
        }

        // The aborted entry is gone; a second commit attempt is unknown.
        let err = transactor
            .commit(
                CommitRequest {
                    header_id: None,
                    tail_id: shared_types::BlockId::from("gone"),
                    block_ids: vec![],
                    trx_id: trx_b,
                    rev: 1,
                },
                &options,
            )
            .await
            .expect_err("aborted entry");
        assert!(matches!(
            err,
            chronicle_transact::TransactError::UnknownTransaction { .. }
        ));
    }
}
