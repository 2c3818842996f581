//! # Revision-Range Storage Manager
//!
//! Tracks, per block id, which revision ranges this replica actually holds,
//! and restores gaps on demand from an archival source.
//!
//! ## Model
//!
//! A block's locally available history is a sorted, non-overlapping list of
//! half-open [`RevisionRange`]s; an absent upper bound means "through
//! latest". A never-before-seen block starts with the explicit empty range
//! `[0, 0)` — no revisions held — persisted immediately.
//!
//! `ensure_revision` answers instantly for held revisions and otherwise
//! pulls a [`BlockArchive`] through the optional restore callback,
//! persisting every restored entry and merging the archive's covering range
//! into the metadata.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Ranges, metadata, archives, the interval-merge algorithm
//! - `ports/` - `RawStorage` SPI and the `ArchiveRestorer` callback
//! - `manager` - The `RevisionManager` application service
//! - `adapters/` - In-memory raw storage for tests

pub mod adapters;
pub mod domain;
pub mod manager;
pub mod ports;

pub use adapters::memory::MemoryRawStorage;
pub use domain::errors::ArchiveError;
pub use domain::ranges::{merge_ranges, RevisionRange};
pub use domain::{ArchiveEntry, BlockArchive, BlockMetadata, RevisionPointer};
pub use manager::RevisionManager;
pub use ports::{ArchiveRestorer, RawStorage};
