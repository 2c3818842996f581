//! Domain layer: revision ranges, per-block metadata, and archives.

pub mod errors;
pub mod ranges;

use ranges::RevisionRange;
use serde::{Deserialize, Serialize};
use shared_types::{Block, Revision, TrxId, TrxTransform};
use std::collections::BTreeMap;

/// The most recent revision recorded for a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionPointer {
    pub trx_id: TrxId,
    pub rev: Revision,
}

/// Persisted per-block record of what this replica holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<RevisionPointer>,
    pub ranges: Vec<RevisionRange>,
}

impl BlockMetadata {
    /// Seed value for a never-before-seen block: nothing held yet, expressed
    /// as an explicit empty range at zero rather than "everything".
    pub fn initial() -> Self {
        Self {
            latest: None,
            ranges: vec![RevisionRange::new(0, Some(0))],
        }
    }

    /// Whether `rev` falls within a held range.
    pub fn holds(&self, rev: Revision) -> bool {
        self.ranges.iter().any(|range| range.contains(rev))
    }
}

/// One restored historical revision: the transaction, and the materialized
/// block snapshot when the archive carries one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub trx: TrxTransform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,
}

/// A bundle of historical revisions for one block, keyed by revision number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockArchive {
    pub revisions: BTreeMap<Revision, ArchiveEntry>,
}

impl BlockArchive {
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// The half-open range this archive covers, `None` when empty.
    pub fn covering_range(&self) -> Option<RevisionRange> {
        let first = *self.revisions.keys().next()?;
        let last = *self.revisions.keys().next_back()?;
        Some(RevisionRange::new(first, Some(last + 1)))
    }

    /// The entry at the archive's highest revision, `None` when empty.
    pub fn newest(&self) -> Option<(Revision, &ArchiveEntry)> {
        self.revisions.iter().next_back().map(|(rev, e)| (*rev, e))
    }
}
