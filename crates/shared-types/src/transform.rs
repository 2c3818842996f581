//! # Transform & Operation Semantics
//!
//! A [`Transform`] is the batched description of one transaction's intended
//! effect: inserts, positional updates, and deletes across many blocks. It is
//! born empty at the start of a logical transaction, accumulates edits, and
//! is consumed exactly once by the transaction protocol at pend time.
//!
//! ## Invariant
//!
//! A block id present in `deletes` never has a live `inserts` or `updates`
//! entry: inserting after deleting clears the delete marker, and deleting
//! clears any staged insert and update list for that id.

use crate::block::Block;
use crate::ids::BlockId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A positional splice against one named field of a block.
///
/// When `inserted` is a JSON array, `delete_count` elements are removed at
/// `index` and the array's items are inserted in their place. Any other
/// value replaces the whole field. This single primitive serves both
/// list-field diffs and scalar-field replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockOperation {
    /// Name of the payload field being edited.
    pub entity: String,
    /// Splice position for sequence-valued edits.
    pub index: usize,
    /// Number of elements removed at `index` for sequence-valued edits.
    pub delete_count: usize,
    /// Items to insert (array), or the replacement value (anything else).
    pub inserted: serde_json::Value,
}

impl BlockOperation {
    /// Convenience constructor for a list splice.
    pub fn splice(
        entity: &str,
        index: usize,
        delete_count: usize,
        items: Vec<serde_json::Value>,
    ) -> Self {
        Self {
            entity: entity.to_owned(),
            index,
            delete_count,
            inserted: serde_json::Value::Array(items),
        }
    }

    /// Convenience constructor for a whole-field replacement.
    pub fn replace(entity: &str, value: serde_json::Value) -> Self {
        Self {
            entity: entity.to_owned(),
            index: 0,
            delete_count: 0,
            inserted: value,
        }
    }
}

/// Apply one operation to a block in place.
///
/// The canonical mutator: every higher-level field edit compiles down to
/// this. Splice positions are clamped to the current field length; a splice
/// against a missing or non-sequence field starts from an empty sequence.
pub fn apply_operation(block: &mut Block, operation: &BlockOperation) {
    match &operation.inserted {
        serde_json::Value::Array(items) => {
            let field = block
                .payload
                .entry(operation.entity.clone())
                .or_insert_with(|| serde_json::Value::Array(Vec::new()));
            if !field.is_array() {
                *field = serde_json::Value::Array(Vec::new());
            }
            if let serde_json::Value::Array(elements) = field {
                let index = operation.index.min(elements.len());
                let delete_count = operation.delete_count.min(elements.len() - index);
                elements.splice(index..index + delete_count, items.iter().cloned());
            }
        }
        other => {
            block
                .payload
                .insert(operation.entity.clone(), other.clone());
        }
    }
}

/// The batched effect of one transaction across many blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub inserts: BTreeMap<BlockId, Block>,
    #[serde(default)]
    pub updates: BTreeMap<BlockId, Vec<BlockOperation>>,
    #[serde(default)]
    pub deletes: BTreeSet<BlockId>,
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Record a block insert; clears any delete marker for the id.
    pub fn insert(&mut self, block: Block) {
        let id = block.header.id.clone();
        self.deletes.remove(&id);
        self.inserts.insert(id, block);
    }

    /// Record an update operation for a block.
    ///
    /// When the block is itself a staged insert, the operation is applied
    /// directly to the staged copy so readers always see a consistent view.
    pub fn update(&mut self, id: BlockId, operation: BlockOperation) {
        if let Some(staged) = self.inserts.get_mut(&id) {
            apply_operation(staged, &operation);
            return;
        }
        self.updates.entry(id).or_default().push(operation);
    }

    /// Record a delete; clears any staged insert and update list for the id.
    pub fn delete(&mut self, id: BlockId) {
        self.inserts.remove(&id);
        self.updates.remove(&id);
        self.deletes.insert(id);
    }

    /// Deduplicated set of block ids touched by this transform.
    pub fn block_ids(&self) -> BTreeSet<BlockId> {
        self.inserts
            .keys()
            .chain(self.updates.keys())
            .chain(self.deletes.iter())
            .cloned()
            .collect()
    }

    /// Merge `other` into `self`, last writer wins per field: later inserts
    /// overwrite earlier ones, update lists concatenate in order, delete
    /// sets union.
    pub fn merge(&mut self, other: Transform) {
        for (id, block) in other.inserts {
            self.deletes.remove(&id);
            self.inserts.insert(id, block);
        }
        for (id, mut ops) in other.updates {
            self.deletes.remove(&id);
            self.updates.entry(id).or_default().append(&mut ops);
        }
        for id in other.deletes {
            self.delete(id);
        }
    }

    /// Project this transform down to the entries touching one block id.
    pub fn for_block(&self, id: &BlockId) -> Transform {
        let mut projected = Transform::new();
        if let Some(block) = self.inserts.get(id) {
            projected.inserts.insert(id.clone(), block.clone());
        }
        if let Some(ops) = self.updates.get(id) {
            projected.updates.insert(id.clone(), ops.clone());
        }
        if self.deletes.contains(id) {
            projected.deletes.insert(id.clone());
        }
        projected
    }
}
