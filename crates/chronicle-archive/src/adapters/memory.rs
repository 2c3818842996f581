//! In-memory raw storage, used by tests and single-process deployments.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Block, BlockId, Revision, Transform, TrxId};
use std::collections::HashMap;

use crate::domain::errors::ArchiveError;
use crate::domain::BlockMetadata;
use crate::ports::RawStorage;

#[derive(Default)]
struct Tables {
    metadata: HashMap<BlockId, BlockMetadata>,
    revisions: HashMap<(BlockId, Revision), TrxId>,
    transactions: HashMap<(BlockId, TrxId), Transform>,
    materialized: HashMap<(BlockId, TrxId), Block>,
}

/// Map-backed [`RawStorage`].
#[derive(Default)]
pub struct MemoryRawStorage {
    tables: RwLock<Tables>,
}

impl MemoryRawStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision_trx(&self, block_id: &BlockId, rev: Revision) -> Option<TrxId> {
        self.tables
            .read()
            .revisions
            .get(&(block_id.clone(), rev))
            .cloned()
    }

    pub fn transaction(&self, block_id: &BlockId, trx_id: &TrxId) -> Option<Transform> {
        self.tables
            .read()
            .transactions
            .get(&(block_id.clone(), trx_id.clone()))
            .cloned()
    }

    pub fn materialized_block(&self, block_id: &BlockId, trx_id: &TrxId) -> Option<Block> {
        self.tables
            .read()
            .materialized
            .get(&(block_id.clone(), trx_id.clone()))
            .cloned()
    }
}

#[async_trait]
impl RawStorage for MemoryRawStorage {
    async fn get_metadata(
        &self,
        block_id: &BlockId,
    ) -> Result<Option<BlockMetadata>, ArchiveError> {
        Ok(self.tables.read().metadata.get(block_id).cloned())
    }

    async fn save_metadata(
        &self,
        block_id: &BlockId,
        metadata: &BlockMetadata,
    ) -> Result<(), ArchiveError> {
        self.tables
            .write()
            .metadata
            .insert(block_id.clone(), metadata.clone());
        Ok(())
    }

    async fn save_revision(
        &self,
        block_id: &BlockId,
        rev: Revision,
        trx_id: &TrxId,
    ) -> Result<(), ArchiveError> {
        self.tables
            .write()
            .revisions
            .insert((block_id.clone(), rev), trx_id.clone());
        Ok(())
    }

    async fn save_transaction(
        &self,
        block_id: &BlockId,
        trx_id: &TrxId,
        transform: &Transform,
    ) -> Result<(), ArchiveError> {
        self.tables
            .write()
            .transactions
            .insert((block_id.clone(), trx_id.clone()), transform.clone());
        Ok(())
    }

    async fn save_materialized_block(
        &self,
        block_id: &BlockId,
        trx_id: &TrxId,
        block: &Block,
    ) -> Result<(), ArchiveError> {
        self.tables
            .write()
            .materialized
            .insert((block_id.clone(), trx_id.clone()), block.clone());
        Ok(())
    }
}
