//! Per-transaction state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle of one transaction.
///
/// `Committed` and `Aborted` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrxState {
    /// Pend has been called, not yet acknowledged.
    Proposed,
    /// Pend succeeded; commit or cancel decides the outcome.
    Pending,
    /// Terminal success.
    Committed,
    /// Terminal: cancelled, or failed a stale commit.
    Aborted,
}

impl TrxState {
    /// Whether a transition to `next` is legal.
    pub fn can_transition(self, next: TrxState) -> bool {
        use TrxState::*;
        matches!(
            (self, next),
            (Proposed, Pending) | (Pending, Committed) | (Proposed, Aborted) | (Pending, Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TrxState::Committed | TrxState::Aborted)
    }
}
