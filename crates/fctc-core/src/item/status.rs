//! Item status state machine
//!
//! State transitions:
//! ```text
//! Unprocessed → NeedToProcess → InProgress → Complete
//!                     ↑              │           │
//!                     └──── repair ──┴─ rebuild ─┘
//! ```

use serde::{Deserialize, Serialize};

/// How far an item's decomposition has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Known by name only
    #[default]
    Unprocessed,
    /// Referenced and waiting to be decomposed
    #[serde(rename = "Need to process")]
    NeedToProcess,
    /// Decomposition has started but not finished
    #[serde(rename = "In Progress")]
    InProgress,
    /// Fully decomposed, or classified as a base item
    Complete,
}

impl ItemStatus {
    /// Check if a state transition is valid.
    ///
    /// Repair moves an interrupted item back to NeedToProcess; a full rebuild
    /// does the same for finished items.
    pub fn can_transition_to(&self, target: &ItemStatus) -> bool {
        matches!(
            (self, target),
            (ItemStatus::Unprocessed, ItemStatus::NeedToProcess)
                | (ItemStatus::Unprocessed, ItemStatus::Complete)
                | (ItemStatus::NeedToProcess, ItemStatus::InProgress)
                | (ItemStatus::NeedToProcess, ItemStatus::Complete)
                | (ItemStatus::InProgress, ItemStatus::Complete)
                | (ItemStatus::InProgress, ItemStatus::NeedToProcess)
                | (ItemStatus::Complete, ItemStatus::NeedToProcess)
        )
    }

    /// Complete items are left alone by normal runs
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Complete)
    }

    /// Whether the item was left unfinished
    pub fn is_incomplete(&self) -> bool {
        !self.is_terminal()
    }

    /// The name used in persisted item graphs
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Unprocessed => "Unprocessed",
            ItemStatus::NeedToProcess => "Need to process",
            ItemStatus::InProgress => "In Progress",
            ItemStatus::Complete => "Complete",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
