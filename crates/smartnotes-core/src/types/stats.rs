//! Aggregate review statistics.

use serde::{Deserialize, Serialize};

/// Per-owner card summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStats {
    /// Active cards.
    pub total: u64,
    /// Active cards whose next review is not in the future.
    pub due: u64,
    /// Active cards at or above the mastery threshold.
    pub mastered: u64,
    /// `round(mastered / total * 100)`, 0 when there are no cards.
    #[serde(rename = "completion")]
    pub completion_pct: u8,
}

impl CardStats {
    pub fn new(total: u64, due: u64, mastered: u64) -> Self {
        Self {
            total,
            due,
            mastered,
            completion_pct: completion_pct(mastered, total),
        }
    }
}

/// Percentage of mastered cards, rounded half away from zero.
pub fn completion_pct(mastered: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (mastered as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
