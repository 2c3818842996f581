//! # Transaction Protocol
//!
//! The pend/commit/cancel transaction protocol with revision-based
//! optimistic concurrency, exposed as the [`Repo`] trait and implemented
//! both locally ([`Transactor`]) and over the network ([`NetworkRepo`]).
//!
//! ## Protocol
//!
//! ```text
//! pend(transform, rev) ──→ Pending { pending, block_ids }   stage against head
//!        │                  Stale { missing }               resync & retry
//!        ▼
//! commit(trx_id, rev) ──→ Committed                         head advances
//!        │                 Stale { missing }                pending entry aborts
//!        ▼
//! cancel(trx_ref)     ──→ ()                                never stale
//! ```
//!
//! Per transaction: proposed → pending → committed | aborted. Terminal
//! states never transition.
//!
//! ## Wire mapping
//!
//! Each repo operation travels as a one-element discriminated union inside a
//! single length-prefixed JSON frame on a peer stream dialed with protocol
//! id [`REPO_PROTOCOL`]; exactly one response frame comes back.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Transaction state machine and error taxonomy
//! - `ports/` - Inbound `Repo` API, outbound `PeerNetwork` SPI
//! - `transactor` - Local implementation over a `BlockStore`
//! - `wire/` - Framing, client, and per-stream server dispatch

pub mod domain;
pub mod ports;
pub mod transactor;
pub mod wire;

pub use domain::errors::TransactError;
pub use domain::state::TrxState;
pub use ports::inbound::{Repo, RepoOptions};
pub use ports::outbound::{PeerNetwork, ProtocolStream};
pub use transactor::Transactor;
pub use wire::client::NetworkRepo;
pub use wire::server::serve_repo_stream;
pub use wire::REPO_PROTOCOL;
