//! # Local Transactor
//!
//! [`Transactor`] implements the [`Repo`] contract against a local
//! [`BlockStore`]. Each collection head carries a monotonically increasing
//! revision plus the log of committed transactions; pend and commit check
//! the caller's revision against the head and answer `Stale` with the
//! missing transactions when the caller is behind.
//!
//! Pend/commit for one collection serialize through the node's
//! [`KeyedMutex`] (key = collection id) so two local pends never race;
//! unrelated collections proceed independently. The in-memory state lock is
//! never held across an await point.

use async_trait::async_trait;
use chronicle_store::{apply_transform, BlockSource, BlockStore};
use parking_lot::Mutex;
use shared_types::{
    apply_operation, Block, BlockGet, BlockId, CollectionId, CommitRequest, CommitResult,
    GetBlockResult, KeyedMutex, PendPolicy, PendRequest, PendResult, Revision, Transform, TrxId,
    TrxRef, TrxTransform,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::domain::errors::TransactError;
use crate::domain::state::TrxState;
use crate::ports::inbound::{Repo, RepoOptions};

#[derive(Default)]
struct CollectionHead {
    rev: Revision,
    committed: Vec<TrxTransform>,
}

impl CollectionHead {
    fn missing_since(&self, rev: Revision) -> Vec<TrxTransform> {
        self.committed
            .iter()
            .filter(|t| t.rev > rev)
            .cloned()
            .collect()
    }
}

struct PendingTrx {
    collection_id: CollectionId,
    rev: Revision,
    transform: Transform,
    block_ids: BTreeSet<BlockId>,
    state: TrxState,
}

#[derive(Default)]
struct TransactorState {
    heads: HashMap<CollectionId, CollectionHead>,
    pending: HashMap<TrxId, PendingTrx>,
}

impl TransactorState {
    /// Rebuild a block's state as of `rev` from the committed logs. `None`
    /// when no committed transaction ever touched the block.
    fn replay_at(&self, id: &BlockId, rev: Revision) -> Option<Option<Block>> {
        let head = self.heads.values().find(|head| {
            head.committed
                .iter()
                .any(|trx| trx.transform.block_ids().contains(id))
        })?;
        let mut block = None;
        for trx in head.committed.iter().filter(|trx| trx.rev <= rev) {
            block = overlay(block, &trx.transform, id);
        }
        Some(block)
    }
}

/// Local implementation of the transaction protocol over a block store.
pub struct Transactor<S> {
    store: Arc<S>,
    locks: Arc<KeyedMutex>,
    state: Mutex<TransactorState>,
}

impl<S: BlockStore> Transactor<S> {
    pub fn new(store: Arc<S>, locks: Arc<KeyedMutex>) -> Self {
        Self {
            store,
            locks,
            state: Mutex::new(TransactorState::default()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current head revision of a collection (0 when never written).
    pub fn head_revision(&self, collection_id: &CollectionId) -> Revision {
        self.state
            .lock()
            .heads
            .get(collection_id)
            .map(|h| h.rev)
            .unwrap_or(0)
    }

    /// Transactions committed after `rev`, for resync.
    pub fn committed_since(
        &self,
        collection_id: &CollectionId,
        rev: Revision,
    ) -> Vec<TrxTransform> {
        self.state
            .lock()
            .heads
            .get(collection_id)
            .map(|h| h.missing_since(rev))
            .unwrap_or_default()
    }

    /// Resolve the collection a transform belongs to: staged inserts name it
    /// in their headers; otherwise a touched block known to the store or
    /// held by another pending transaction does. Blocks that exist only in
    /// someone else's pending transform must still resolve here, or the
    /// pend policy never gets to rule on the overlap.
    async fn collection_of(&self, transform: &Transform) -> Result<CollectionId, TransactError> {
        if let Some(block) = transform.inserts.values().next() {
            return Ok(block.header.collection_id.clone());
        }
        {
            let state = self.state.lock();
            for id in transform.updates.keys().chain(transform.deletes.iter()) {
                if let Some(pending) = state.pending.values().find(|p| p.block_ids.contains(id)) {
                    return Ok(pending.collection_id.clone());
                }
            }
        }
        for id in transform.updates.keys().chain(transform.deletes.iter()) {
            if let Some(block) = self.store.try_get(id).await? {
                return Ok(block.header.collection_id.clone());
            }
        }
        Err(TransactError::InvalidRequest(
            "transform touches no known block".to_owned(),
        ))
    }
}

#[async_trait]
impl<S: BlockStore> Repo for Transactor<S> {
    async fn get(
        &self,
        gets: Vec<BlockGet>,
        options: &RepoOptions,
    ) -> Result<Vec<GetBlockResult>, TransactError> {
        options.check()?;
        let mut results = Vec::with_capacity(gets.len());
        for get in gets {
            let base = self.store.try_get(&get.block_id).await?;
            let block = match get.context.as_ref() {
                Some(context) => {
                    if let Some(trx_id) = context.trx_id.as_ref() {
                        let state = self.state.lock();
                        match state.pending.get(trx_id) {
                            Some(pending) => overlay(base, &pending.transform, &get.block_id),
                            None => base,
                        }
                    } else if let Some(rev) = context.rev {
                        // Pinned to a collection revision: answer with the
                        // block as of that revision, not the latest state.
                        let state = self.state.lock();
                        state.replay_at(&get.block_id, rev).unwrap_or(base)
                    } else {
                        base
                    }
                }
                None => base,
            };
            results.push(GetBlockResult {
                block_id: get.block_id,
                block,
            });
        }
        Ok(results)
    }

    async fn pend(
        &self,
        request: PendRequest,
        options: &RepoOptions,
    ) -> Result<PendResult, TransactError> {
        options.check()?;
        if request.transform.is_empty() {
            return Err(TransactError::InvalidRequest("empty transform".to_owned()));
        }
        let collection_id = self.collection_of(&request.transform).await?;
        let _guard = self.locks.acquire(collection_id.as_str()).await;
        options.check()?;

        let mut state = self.state.lock();
        let head = state.heads.entry(collection_id.clone()).or_default();
        let head_rev = head.rev;
        if request.rev > head_rev {
            return Err(TransactError::InvalidRequest(format!(
                "revision {} is ahead of head {}",
                request.rev, head_rev
            )));
        }
        if request.rev < head_rev {
            let missing = head.missing_since(request.rev);
            tracing::debug!(
                collection = %collection_id,
                trx = %request.trx_id,
                behind = missing.len(),
                "stale pend"
            );
            return Ok(PendResult::Stale { missing });
        }

        let block_ids = request.transform.block_ids();
        let overlapping: Vec<(TrxId, TrxRef, TrxTransform)> = state
            .pending
            .iter()
            .filter(|(_, p)| {
                p.collection_id == collection_id && !p.block_ids.is_disjoint(&block_ids)
            })
            .map(|(id, p)| {
                (
                    id.clone(),
                    TrxRef {
                        block_ids: p.block_ids.iter().cloned().collect(),
                        trx_id: id.clone(),
                        rev: p.rev,
                    },
                    TrxTransform {
                        trx_id: id.clone(),
                        rev: p.rev,
                        transform: p.transform.clone(),
                    },
                )
            })
            .collect();

        if request.policy == PendPolicy::Fail && !overlapping.is_empty() {
            tracing::debug!(
                collection = %collection_id,
                trx = %request.trx_id,
                conflicts = overlapping.len(),
                "pend refused under fail policy"
            );
            return Ok(PendResult::Stale {
                missing: overlapping.into_iter().map(|(_, _, t)| t).collect(),
            });
        }

        state.pending.insert(
            request.trx_id.clone(),
            PendingTrx {
                collection_id: collection_id.clone(),
                rev: request.rev,
                transform: request.transform,
                block_ids: block_ids.clone(),
                state: TrxState::Pending,
            },
        );
        tracing::debug!(collection = %collection_id, trx = %request.trx_id, "pended");
        Ok(PendResult::Pending {
            pending: overlapping.into_iter().map(|(_, r, _)| r).collect(),
            block_ids,
        })
    }

    async fn commit(
        &self,
        request: CommitRequest,
        options: &RepoOptions,
    ) -> Result<CommitResult, TransactError> {
        options.check()?;
        let collection_id = {
            let state = self.state.lock();
            let pending = state
                .pending
                .get(&request.trx_id)
                .ok_or_else(|| TransactError::UnknownTransaction {
                    trx_id: request.trx_id.clone(),
                })?;
            pending.collection_id.clone()
        };
        let _guard = self.locks.acquire(collection_id.as_str()).await;
        options.check()?;

        // Re-check under the collection lock; a concurrent cancel may have
        // removed the entry while we waited.
        let transform = {
            let mut state = self.state.lock();
            let head_rev = state
                .heads
                .get(&collection_id)
                .map(|h| h.rev)
                .unwrap_or(0);
            let pending = state
                .pending
                .get_mut(&request.trx_id)
                .ok_or_else(|| TransactError::UnknownTransaction {
                    trx_id: request.trx_id.clone(),
                })?;
            if head_rev != request.rev {
                state.pending.remove(&request.trx_id);
                let missing = state
                    .heads
                    .get(&collection_id)
                    .map(|h| h.missing_since(request.rev))
                    .unwrap_or_default();
                tracing::debug!(
                    collection = %collection_id,
                    trx = %request.trx_id,
                    "stale commit, transaction aborted"
                );
                return Ok(CommitResult::Stale { missing });
            }
            debug_assert!(pending.state.can_transition(TrxState::Committed));
            pending.transform.clone()
        };

        // Apply outside the state lock; the keyed guard still serializes the
        // collection.
        apply_transform(&*self.store, &transform).await?;

        {
            let mut state = self.state.lock();
            let head = state.heads.entry(collection_id.clone()).or_default();
            head.rev += 1;
            let new_rev = head.rev;
            head.committed.push(TrxTransform {
                trx_id: request.trx_id.clone(),
                rev: new_rev,
                transform,
            });
            state.pending.remove(&request.trx_id);
            tracing::info!(collection = %collection_id, trx = %request.trx_id, rev = new_rev, "committed");
        }
        Ok(CommitResult::Committed {
            coordinator_id: None,
        })
    }

    async fn cancel(&self, trx: TrxRef, options: &RepoOptions) -> Result<(), TransactError> {
        options.check()?;
        let mut state = self.state.lock();
        if state.pending.remove(&trx.trx_id).is_some() {
            tracing::debug!(trx = %trx.trx_id, "cancelled");
        }
        // Cancelling an unknown or already-settled transaction is a no-op.
        Ok(())
    }
}

/// Replay the slice of a pending transform that touches one block over its
/// base state.
fn overlay(base: Option<Block>, transform: &Transform, id: &BlockId) -> Option<Block> {
    let projected = transform.for_block(id);
    if projected.deletes.contains(id) {
        return None;
    }
    if let Some(inserted) = projected.inserts.get(id) {
        return Some(inserted.clone());
    }
    let mut block = base?;
    if let Some(operations) = projected.updates.get(id) {
        for operation in operations {
            apply_operation(&mut block, operation);
        }
    }
    Some(block)
}
