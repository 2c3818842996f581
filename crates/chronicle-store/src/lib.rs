//! # Block Store
//!
//! The block storage abstraction and its layered decorators.
//!
//! ## Architecture
//!
//! Two capability levels, composed as a decorator stack:
//!
//! ```text
//! application ──→ Tracker (staging) ──→ BlockCache (read-through) ──→ Source
//!                      │
//!                      └─ reset() hands the accumulated Transform
//!                         to the transaction protocol
//! ```
//!
//! - [`BlockSource`] — read-only: `try_get`, id generation, header creation.
//! - [`BlockStore`] — adds `insert`/`update`/`delete`.
//! - [`Tracker`] — stages a Transform against a read-only source without
//!   mutating it; readers see the transformed view.
//! - [`BlockCache`] / [`CachedStore`] — read-through and write-through
//!   memoization, kept coherent with transforms applied elsewhere via
//!   `transform_cache`.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Error taxonomy
//! - `ports/` - The `BlockSource`/`BlockStore` contracts
//! - `tracker` / `cache` - Decorator implementations
//! - `adapters/` - In-memory store for tests and the local transactor

pub mod adapters;
pub mod cache;
pub mod domain;
pub mod ports;
pub mod tracker;

pub use adapters::memory::MemoryBlockStore;
pub use cache::{BlockCache, CachedStore};
pub use domain::errors::StoreError;
pub use ports::{apply_transform, BlockSource, BlockStore};
pub use tracker::Tracker;
