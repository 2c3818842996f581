//! Half-open revision ranges and the interval-merge algorithm.

use serde::{Deserialize, Serialize};
use shared_types::Revision;

/// A contiguous span of revisions: `[start, end)`. `end == None` means
/// open-ended, through latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRange {
    pub start: Revision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Revision>,
}

impl RevisionRange {
    pub fn new(start: Revision, end: Option<Revision>) -> Self {
        Self { start, end }
    }

    /// Open-ended range from `start` through latest.
    pub fn open(start: Revision) -> Self {
        Self { start, end: None }
    }

    pub fn contains(&self, rev: Revision) -> bool {
        rev >= self.start && self.end.map_or(true, |end| rev < end)
    }

    /// An empty range holds nothing, e.g. the `[0, 0)` metadata seed.
    pub fn is_empty(&self) -> bool {
        self.end.is_some_and(|end| end <= self.start)
    }
}

/// Merge a list of ranges into sorted, non-overlapping form.
///
/// Sort by start, then walk left to right: an open-ended range absorbs all
/// subsequent ranges; otherwise two ranges merge when the next one's start
/// falls at or before the current end, with the merged end becoming the
/// larger of the two (open-ended when either side is). Idempotent and
/// order-independent.
pub fn merge_ranges(mut ranges: Vec<RevisionRange>) -> Vec<RevisionRange> {
    ranges.sort_by_key(|range| range.start);
    let mut merged: Vec<RevisionRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        let Some(current) = merged.last_mut() else {
            merged.push(range);
            continue;
        };
        match current.end {
            // Open-ended: absorbs everything after it.
            None => {}
            Some(end) if range.start <= end => {
                current.end = match range.end {
                    None => None,
                    Some(next_end) => Some(end.max(next_end)),
                };
            }
            Some(_) => merged.push(range),
        }
    }
    merged
}
