//! # Revision Manager
//!
//! The application service tying raw storage, metadata, and the restore
//! callback together. Metadata for a block is lazily initialized on first
//! use and persisted immediately; `ensure_revision` restores missing
//! history on demand.

use shared_types::{BlockId, Revision};
use std::sync::Arc;

use crate::domain::errors::ArchiveError;
use crate::domain::ranges::merge_ranges;
use crate::domain::{BlockArchive, BlockMetadata, RevisionPointer};
use crate::ports::{ArchiveRestorer, RawStorage};

/// Per-block revision-range manager for one replica.
pub struct RevisionManager<R> {
    storage: Arc<R>,
    restorer: Option<Arc<dyn ArchiveRestorer>>,
}

impl<R: RawStorage> RevisionManager<R> {
    pub fn new(storage: Arc<R>, restorer: Option<Arc<dyn ArchiveRestorer>>) -> Self {
        Self { storage, restorer }
    }

    pub fn storage(&self) -> &Arc<R> {
        &self.storage
    }

    /// Fetch the block's metadata, seeding and persisting the initial value
    /// on first use.
    pub async fn metadata(&self, block_id: &BlockId) -> Result<BlockMetadata, ArchiveError> {
        if let Some(metadata) = self.storage.get_metadata(block_id).await? {
            return Ok(metadata);
        }
        let metadata = BlockMetadata::initial();
        self.storage.save_metadata(block_id, &metadata).await?;
        tracing::debug!(block = %block_id, "seeded initial metadata");
        Ok(metadata)
    }

    /// Make sure `rev` of the block is locally available, restoring it from
    /// the archival source when it is not.
    pub async fn ensure_revision(
        &self,
        block_id: &BlockId,
        rev: Revision,
    ) -> Result<(), ArchiveError> {
        let metadata = self.metadata(block_id).await?;
        if metadata.holds(rev) {
            return Ok(());
        }

        let restorer = self.restorer.as_ref().ok_or_else(|| {
            ArchiveError::RevisionNotFound {
                block_id: block_id.clone(),
                rev,
            }
        })?;
        let archive = restorer.restore(block_id, rev).await?.ok_or_else(|| {
            ArchiveError::RevisionNotFound {
                block_id: block_id.clone(),
                rev,
            }
        })?;
        if archive.is_empty() {
            return Err(ArchiveError::RevisionNotFound {
                block_id: block_id.clone(),
                rev,
            });
        }

        let metadata = self.absorb_archive(block_id, metadata, &archive).await?;
        // The restorer answered, but with history that may still miss the
        // requested revision. Absorbed entries stay; the call itself fails.
        if !metadata.holds(rev) {
            return Err(ArchiveError::RevisionNotFound {
                block_id: block_id.clone(),
                rev,
            });
        }
        Ok(())
    }

    /// Persist every entry of a restored archive and fold its covering range
    /// into the block's metadata, returning the updated metadata.
    async fn absorb_archive(
        &self,
        block_id: &BlockId,
        mut metadata: BlockMetadata,
        archive: &BlockArchive,
    ) -> Result<BlockMetadata, ArchiveError> {
        for (rev, entry) in &archive.revisions {
            self.storage
                .save_revision(block_id, *rev, &entry.trx.trx_id)
                .await?;
            self.storage
                .save_transaction(block_id, &entry.trx.trx_id, &entry.trx.transform)
                .await?;
            if let Some(block) = &entry.block {
                self.storage
                    .save_materialized_block(block_id, &entry.trx.trx_id, block)
                    .await?;
            }
        }

        if let Some(range) = archive.covering_range() {
            metadata.ranges.push(range);
            metadata.ranges = merge_ranges(std::mem::take(&mut metadata.ranges));
        }
        if let Some((newest_rev, newest)) = archive.newest() {
            let advanced = metadata
                .latest
                .as_ref()
                .map_or(true, |latest| newest_rev > latest.rev);
            if advanced {
                metadata.latest = Some(RevisionPointer {
                    trx_id: newest.trx.trx_id.clone(),
                    rev: newest_rev,
                });
            }
        }
        self.storage.save_metadata(block_id, &metadata).await?;
        tracing::info!(
            block = %block_id,
            restored = archive.revisions.len(),
            "absorbed archive"
        );
        Ok(metadata)
    }
}
