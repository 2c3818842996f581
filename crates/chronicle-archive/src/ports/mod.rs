//! # Ports
//!
//! Outbound contracts of the revision manager. Persistence mechanics (files,
//! database tables) belong to the host; only these call contracts matter.

use async_trait::async_trait;
use shared_types::{Block, BlockId, Revision, Transform, TrxId};

use crate::domain::errors::ArchiveError;
use crate::domain::{BlockArchive, BlockMetadata};

/// The raw persistent-storage collaborator.
#[async_trait]
pub trait RawStorage: Send + Sync {
    async fn get_metadata(&self, block_id: &BlockId)
        -> Result<Option<BlockMetadata>, ArchiveError>;

    async fn save_metadata(
        &self,
        block_id: &BlockId,
        metadata: &BlockMetadata,
    ) -> Result<(), ArchiveError>;

    /// Record that `rev` of the block was produced by `trx_id`.
    async fn save_revision(
        &self,
        block_id: &BlockId,
        rev: Revision,
        trx_id: &TrxId,
    ) -> Result<(), ArchiveError>;

    async fn save_transaction(
        &self,
        block_id: &BlockId,
        trx_id: &TrxId,
        transform: &Transform,
    ) -> Result<(), ArchiveError>;

    async fn save_materialized_block(
        &self,
        block_id: &BlockId,
        trx_id: &TrxId,
        block: &Block,
    ) -> Result<(), ArchiveError>;
}

/// Optional collaborator supplying historical data this replica lacks.
#[async_trait]
pub trait ArchiveRestorer: Send + Sync {
    /// Fetch an archive covering `rev` for the block, or `None` when the
    /// archival source has nothing.
    async fn restore(
        &self,
        block_id: &BlockId,
        rev: Revision,
    ) -> Result<Option<BlockArchive>, ArchiveError>;
}
