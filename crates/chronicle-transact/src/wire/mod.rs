//! Wire protocol: length-prefixed JSON frames on a peer stream.

pub mod client;
pub mod framing;
pub mod server;

/// Protocol identifier the repo endpoint is registered under.
pub const REPO_PROTOCOL: &str = "/chronicle-repo/1.0.0";
