//! # Shared Types Crate
//!
//! This crate contains all domain entities and repo message types shared
//! across the Chronicle subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Opaque Identifiers**: Block, collection, and transaction ids are
//!   random 256-bit values carried as base64url text; nothing ever parses
//!   their structure.
//! - **Immutable Blocks**: A [`Block`] is mutated only through
//!   [`BlockOperation`]s accumulated in a [`Transform`]; callers never assign
//!   payload fields directly.

pub mod block;
pub mod ids;
pub mod keyed_mutex;
pub mod messages;
pub mod peers;
pub mod transform;

pub use block::{Block, BlockHeader, BlockSchema, BlockType, BlockTypeRegistry, TypeRegistryError};
pub use ids::{BlockId, CollectionId, PeerId, Revision, TrxId};
pub use keyed_mutex::{KeyedGuard, KeyedMutex};
pub use messages::{
    BlockGet, BlockTrxContext, CommitRequest, CommitResult, GetBlockResult, OperationResult,
    PendPolicy, PendRequest, PendResult, RepoMessage, RepoOperation, RepoResponse, TrxRef,
    TrxTransform,
};
pub use peers::{ClusterPeer, ClusterPeers};
pub use transform::{apply_operation, BlockOperation, Transform};
