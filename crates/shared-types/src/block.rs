//! # Block Model
//!
//! Blocks are the identified, immutable-by-convention units of stored data.
//! Every block belongs to exactly one collection and carries an arbitrary
//! payload of named JSON fields. Mutation goes through
//! [`crate::transform::BlockOperation`]s only.

use crate::ids::{BlockId, CollectionId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Short discriminator string identifying a block's schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockType(pub String);

impl BlockType {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlockType {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The header every block carries: identity, schema, and owning collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub collection_id: CollectionId,
}

/// A block: header plus named payload fields.
///
/// Payload values are JSON; sequence-valued fields support splice edits,
/// everything else is replaced wholesale (see
/// [`crate::transform::apply_operation`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    #[serde(default)]
    pub payload: BTreeMap<String, serde_json::Value>,
}

impl Block {
    /// Create an empty block under the given header.
    pub fn new(header: BlockHeader) -> Self {
        Self {
            header,
            payload: BTreeMap::new(),
        }
    }

    /// Builder-style payload field, used when staging inserts.
    pub fn with_field(mut self, name: &str, value: serde_json::Value) -> Self {
        self.payload.insert(name.to_owned(), value);
        self
    }
}

/// Static schema description for a block type: its canonical name and the
/// payload fields it recognizes. Resolved once at registration time.
#[derive(Debug)]
pub struct BlockSchema {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

impl BlockSchema {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }
}

/// Errors raised by [`BlockTypeRegistry::register`].
///
/// Registration problems are configuration errors and fail immediately;
/// they are never deferred to first use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeRegistryError {
    /// The same schema was already registered under a different name.
    #[error("block type {schema:?} already registered as {existing:?}")]
    DuplicateRegistration { schema: String, existing: String },

    /// The name is already bound to a different schema.
    #[error("block type name {name:?} already bound to schema {bound:?}")]
    NameTaken { name: String, bound: String },
}

/// Process-wide registry of block types.
///
/// Owned by the node runtime and passed explicitly to components that need
/// it; there is deliberately no ambient singleton. Registering the identical
/// (name, schema) pair twice is idempotent.
#[derive(Debug, Default)]
pub struct BlockTypeRegistry {
    by_name: RwLock<BTreeMap<String, &'static str>>,
}

impl BlockTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` under `name`, returning the resulting [`BlockType`].
    pub fn register(
        &self,
        name: &str,
        schema: &'static BlockSchema,
    ) -> Result<BlockType, TypeRegistryError> {
        let mut by_name = self.by_name.write();

        if let Some((existing, _)) = by_name
            .iter()
            .find(|(n, s)| **s == schema.name && n.as_str() != name)
        {
            return Err(TypeRegistryError::DuplicateRegistration {
                schema: schema.name.to_owned(),
                existing: existing.clone(),
            });
        }

        if let Some(bound) = by_name.get(name) {
            if *bound != schema.name {
                return Err(TypeRegistryError::NameTaken {
                    name: name.to_owned(),
                    bound: (*bound).to_owned(),
                });
            }
            return Ok(BlockType::from(name));
        }

        by_name.insert(name.to_owned(), schema.name);
        Ok(BlockType::from(name))
    }

    /// Look up the schema name registered under a block type name.
    pub fn schema_of(&self, name: &str) -> Option<&'static str> {
        self.by_name.read().get(name).copied()
    }
}
