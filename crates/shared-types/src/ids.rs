//! # Identifiers
//!
//! Opaque identifiers for blocks, collections, transactions, and peers.
//!
//! Block and transaction ids are generated from 256 bits of randomness and
//! carried as base64url text (no padding), fully using a DHT-style address
//! space. They are treated as opaque keys everywhere: equality, ordering,
//! and hashing only — never parsed for structure.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of random bytes in a generated identifier.
const ID_ENTROPY_BYTES: usize = 32;

/// A monotonically increasing version counter for a collection head.
pub type Revision = u64;

fn random_id_text() -> String {
    let mut bytes = [0u8; ID_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh identifier from 256 bits of randomness.
            pub fn generate() -> Self {
                Self(random_id_text())
            }

            /// View the textual form of this id.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

opaque_id! {
    /// Globally unique identifier of a stored block.
    BlockId
}

opaque_id! {
    /// Identifier of the collection (logical partition) a block belongs to.
    CollectionId
}

opaque_id! {
    /// Identifier of a transaction, assigned at pend time and stable through
    /// commit or cancel.
    TrxId
}

opaque_id! {
    /// Identifier of a network peer, supplied by the peer-discovery
    /// collaborator.
    PeerId
}
