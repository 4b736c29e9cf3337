//! Per-answer vote counts.

use serde::{Deserialize, Serialize};

/// Vote counts for one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    pub total: u64,
    pub upvotes: u64,
    pub downvotes: u64,
}

impl Tally {
    pub const fn new(total: u64, upvotes: u64, downvotes: u64) -> Self {
        Self {
            total,
            upvotes,
            downvotes,
        }
    }

    /// Apply a parsed update. Fields the update does not carry keep their
    /// current value. Returns whether anything changed.
    pub fn apply(&mut self, update: TallyUpdate) -> bool {
        let next = Tally {
            total: update.total,
            upvotes: update.upvotes.unwrap_or(self.upvotes),
            downvotes: update.downvotes.unwrap_or(self.downvotes),
        };
        if next == *self {
            false
        } else {
            *self = next;
            true
        }
    }
}

/// Fields carried by one inbound tally entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallyUpdate {
    pub total: u64,
    pub upvotes: Option<u64>,
    pub downvotes: Option<u64>,
}

impl TallyUpdate {
    /// Update carrying only the total.
    pub const fn total(total: u64) -> Self {
        Self {
            total,
            upvotes: None,
            downvotes: None,
        }
    }

    /// Update carrying all three fields.
    pub const fn full(total: u64, upvotes: u64, downvotes: u64) -> Self {
        Self {
            total,
            upvotes: Some(upvotes),
            downvotes: Some(downvotes),
        }
    }
}
