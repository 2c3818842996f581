//! # Tracker (Staging Layer)
//!
//! A [`Tracker`] wraps a read-only [`BlockSource`] and accumulates a
//! [`Transform`] without ever mutating the source. Readers see the
//! transformed view: staged updates applied over source blocks, staged
//! inserts for blocks the source lacks, and absence for staged deletes.
//!
//! `reset` is the hand-off point to the transaction protocol: it atomically
//! swaps in a fresh transform and returns the accumulated one.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    apply_operation, Block, BlockHeader, BlockId, BlockOperation, BlockType, Transform,
};
use std::collections::BTreeSet;

use crate::domain::errors::StoreError;
use crate::ports::{BlockSource, BlockStore};

/// Staging decorator over a read-only source.
pub struct Tracker<S> {
    source: S,
    transform: Mutex<Transform>,
}

impl<S> Tracker<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            transform: Mutex::new(Transform::new()),
        }
    }

    /// Swap in `next` (or a fresh transform) and return the accumulated one.
    pub fn reset(&self, next: Option<Transform>) -> Transform {
        std::mem::replace(&mut self.transform.lock(), next.unwrap_or_default())
    }

    /// Block ids this tracker has touched.
    pub fn transformed_block_ids(&self) -> BTreeSet<BlockId> {
        self.transform.lock().block_ids()
    }

    /// Intersection of this tracker's touched ids with `ids`, used to detect
    /// whether a concurrent transform overlaps this one.
    pub fn conflicts(&self, ids: &BTreeSet<BlockId>) -> BTreeSet<BlockId> {
        self.transformed_block_ids()
            .intersection(ids)
            .cloned()
            .collect()
    }

    /// Copy of the staged transform, without consuming it.
    pub fn snapshot(&self) -> Transform {
        self.transform.lock().clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: BlockSource> BlockSource for Tracker<S> {
    async fn try_get(&self, id: &BlockId) -> Result<Option<Block>, StoreError> {
        let from_source = self.source.try_get(id).await?;
        let transform = self.transform.lock();

        if transform.deletes.contains(id) {
            return Ok(None);
        }
        if let Some(mut block) = from_source {
            if let Some(operations) = transform.updates.get(id) {
                for operation in operations {
                    apply_operation(&mut block, operation);
                }
            }
            return Ok(Some(block));
        }
        // Deep copy: handing out the staged insert itself would let callers
        // corrupt the staged state.
        Ok(transform.inserts.get(id).cloned())
    }

    fn generate_id(&self) -> BlockId {
        self.source.generate_id()
    }

    fn create_block_header(&self, block_type: BlockType, id: Option<BlockId>) -> BlockHeader {
        self.source.create_block_header(block_type, id)
    }
}

#[async_trait]
impl<S: BlockSource> BlockStore for Tracker<S> {
    async fn insert(&self, block: Block) -> Result<(), StoreError> {
        self.transform.lock().insert(block);
        Ok(())
    }

    async fn update(&self, id: BlockId, operation: BlockOperation) -> Result<(), StoreError> {
        let mut transform = self.transform.lock();
        if transform.deletes.contains(&id) {
            return Err(StoreError::missing(&id));
        }
        transform.update(id, operation);
        Ok(())
    }

    async fn delete(&self, id: &BlockId) -> Result<(), StoreError> {
        self.transform.lock().delete(id.clone());
        Ok(())
    }
}
