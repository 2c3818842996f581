//! # Cache Layers
//!
//! Read-through ([`BlockCache`]) and write-through ([`CachedStore`])
//! memoization around a source or store. Cached entries are returned as
//! clones so a caller mutating the returned block never corrupts the cache.
//!
//! `transform_cache` keeps a cache coherent with a transform applied
//! elsewhere (after a transaction is known to have committed on another
//! peer) without touching the underlying source.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    apply_operation, Block, BlockHeader, BlockId, BlockOperation, BlockType, Transform,
};
use std::collections::HashMap;

use crate::domain::errors::StoreError;
use crate::ports::{BlockSource, BlockStore};

/// Read-through cache over a [`BlockSource`].
pub struct BlockCache<S> {
    source: S,
    cached: RwLock<HashMap<BlockId, Block>>,
}

impl<S> BlockCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: RwLock::new(HashMap::new()),
        }
    }

    /// Evict specific ids, or everything when `ids` is `None`.
    pub fn clear(&self, ids: Option<&[BlockId]>) {
        let mut cached = self.cached.write();
        match ids {
            Some(ids) => {
                for id in ids {
                    cached.remove(id);
                }
            }
            None => cached.clear(),
        }
    }

    /// Apply a transform's effects directly to cached entries.
    ///
    /// Inserts overwrite, updates apply to entries already cached, deletes
    /// evict. The underlying source is never touched.
    pub fn transform_cache(&self, transform: &Transform) {
        let mut cached = self.cached.write();
        for (id, block) in &transform.inserts {
            cached.insert(id.clone(), block.clone());
        }
        for (id, operations) in &transform.updates {
            if let Some(block) = cached.get_mut(id) {
                for operation in operations {
                    apply_operation(block, operation);
                }
            }
        }
        for id in &transform.deletes {
            cached.remove(id);
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.cached.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cached.read().is_empty()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn cache_insert(&self, block: &Block) {
        self.cached
            .write()
            .insert(block.header.id.clone(), block.clone());
    }
}

#[async_trait]
impl<S: BlockSource> BlockSource for BlockCache<S> {
    async fn try_get(&self, id: &BlockId) -> Result<Option<Block>, StoreError> {
        if let Some(block) = self.cached.read().get(id) {
            return Ok(Some(block.clone()));
        }
        let fetched = self.source.try_get(id).await?;
        if let Some(block) = &fetched {
            self.cache_insert(block);
        }
        Ok(fetched)
    }

    fn generate_id(&self) -> BlockId {
        self.source.generate_id()
    }

    fn create_block_header(&self, block_type: BlockType, id: Option<BlockId>) -> BlockHeader {
        self.source.create_block_header(block_type, id)
    }
}

/// Write-through cache over a full [`BlockStore`]: same read behavior as
/// [`BlockCache`], plus the cache is updated on every local mutation.
pub struct CachedStore<S> {
    cache: BlockCache<S>,
}

impl<S> CachedStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            cache: BlockCache::new(store),
        }
    }

    pub fn clear(&self, ids: Option<&[BlockId]>) {
        self.cache.clear(ids);
    }

    pub fn transform_cache(&self, transform: &Transform) {
        self.cache.transform_cache(transform);
    }

    pub fn store(&self) -> &S {
        self.cache.source()
    }
}

#[async_trait]
impl<S: BlockStore> BlockSource for CachedStore<S> {
    async fn try_get(&self, id: &BlockId) -> Result<Option<Block>, StoreError> {
        self.cache.try_get(id).await
    }

    fn generate_id(&self) -> BlockId {
        self.cache.generate_id()
    }

    fn create_block_header(&self, block_type: BlockType, id: Option<BlockId>) -> BlockHeader {
        self.cache.create_block_header(block_type, id)
    }
}

#[async_trait]
impl<S: BlockStore> BlockStore for CachedStore<S> {
    async fn insert(&self, block: Block) -> Result<(), StoreError> {
        self.cache.source.insert(block.clone()).await?;
        self.cache.cache_insert(&block);
        Ok(())
    }

    async fn update(&self, id: BlockId, operation: BlockOperation) -> Result<(), StoreError> {
        self.cache.source.update(id.clone(), operation.clone()).await?;
        let mut cached = self.cache.cached.write();
        if let Some(block) = cached.get_mut(&id) {
            apply_operation(block, &operation);
        }
        Ok(())
    }

    async fn delete(&self, id: &BlockId) -> Result<(), StoreError> {
        self.cache.source.delete(id).await?;
        self.cache.cached.write().remove(id);
        Ok(())
    }
}
