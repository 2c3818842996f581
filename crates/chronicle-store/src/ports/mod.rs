//! # Ports
//!
//! The two capability levels of block storage. Implementations range from
//! the in-memory adapter in this crate to network-backed sources in
//! `chronicle-transact`; decorators ([`crate::Tracker`],
//! [`crate::BlockCache`]) wrap any of them.

use async_trait::async_trait;
use shared_types::{
    Block, BlockHeader, BlockId, BlockOperation, BlockType, CollectionId, Transform,
};

use crate::domain::errors::StoreError;

/// Read-only access to identified blocks.
///
/// `try_get` on a missing id returns `Ok(None)`, never an error; `get` is
/// the convenience wrapper for callers that require presence.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Fetch a block, or `None` when the id is unknown.
    async fn try_get(&self, id: &BlockId) -> Result<Option<Block>, StoreError>;

    /// Generate a fresh block id.
    fn generate_id(&self) -> BlockId {
        BlockId::generate()
    }

    /// Create a header for a new block in this source's collection.
    fn create_block_header(&self, block_type: BlockType, id: Option<BlockId>) -> BlockHeader;

    /// Fetch a block, failing with [`StoreError::MissingBlock`] on absence.
    async fn get(&self, id: &BlockId) -> Result<Block, StoreError> {
        self.try_get(id)
            .await?
            .ok_or_else(|| StoreError::missing(id))
    }
}

/// A source that also accepts mutations.
///
/// Mutations are fire-and-forget against the store's own backing; whether
/// they are durable depends on the decorator stack composing the store.
#[async_trait]
pub trait BlockStore: BlockSource {
    async fn insert(&self, block: Block) -> Result<(), StoreError>;

    async fn update(&self, id: BlockId, operation: BlockOperation) -> Result<(), StoreError>;

    async fn delete(&self, id: &BlockId) -> Result<(), StoreError>;
}

/// Apply a whole transform to a store: inserts, then updates in recorded
/// order, then deletes. Used at commit time and when replaying archives.
pub async fn apply_transform<S: BlockStore + ?Sized>(
    store: &S,
    transform: &Transform,
) -> Result<(), StoreError> {
    for block in transform.inserts.values() {
        store.insert(block.clone()).await?;
    }
    for (id, operations) in &transform.updates {
        for operation in operations {
            store.update(id.clone(), operation.clone()).await?;
        }
    }
    for id in &transform.deletes {
        store.delete(id).await?;
    }
    Ok(())
}

/// Build a header the way every source does: given type and optional id,
/// under a fixed collection.
pub(crate) fn header_for(
    collection_id: &CollectionId,
    block_type: BlockType,
    id: Option<BlockId>,
) -> BlockHeader {
    BlockHeader {
        id: id.unwrap_or_else(BlockId::generate),
        block_type,
        collection_id: collection_id.clone(),
    }
}
