//! In-memory block store.
//!
//! Backs the local transactor and the test suites. Single-node shared state
//! behind a `parking_lot` lock; safe under cooperative scheduling because no
//! lock is held across an await point.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{apply_operation, Block, BlockHeader, BlockId, BlockOperation, BlockType, CollectionId};
use std::collections::HashMap;

use crate::domain::errors::StoreError;
use crate::ports::{header_for, BlockSource, BlockStore};

/// Map-backed [`BlockStore`] scoped to one collection.
pub struct MemoryBlockStore {
    collection_id: CollectionId,
    blocks: RwLock<HashMap<BlockId, Block>>,
}

impl MemoryBlockStore {
    pub fn new(collection_id: CollectionId) -> Self {
        Self {
            collection_id,
            blocks: RwLock::new(HashMap::new()),
        }
    }

    pub fn collection_id(&self) -> &CollectionId {
        &self.collection_id
    }

    /// Number of blocks currently held.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

#[async_trait]
impl BlockSource for MemoryBlockStore {
    async fn try_get(&self, id: &BlockId) -> Result<Option<Block>, StoreError> {
        Ok(self.blocks.read().get(id).cloned())
    }

    fn create_block_header(&self, block_type: BlockType, id: Option<BlockId>) -> BlockHeader {
        header_for(&self.collection_id, block_type, id)
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn insert(&self, block: Block) -> Result<(), StoreError> {
        self.blocks.write().insert(block.header.id.clone(), block);
        Ok(())
    }

    async fn update(&self, id: BlockId, operation: BlockOperation) -> Result<(), StoreError> {
        let mut blocks = self.blocks.write();
        let block = blocks.get_mut(&id).ok_or_else(|| StoreError::missing(&id))?;
        apply_operation(block, &operation);
        Ok(())
    }

    async fn delete(&self, id: &BlockId) -> Result<(), StoreError> {
        self.blocks.write().remove(id);
        Ok(())
    }
}
