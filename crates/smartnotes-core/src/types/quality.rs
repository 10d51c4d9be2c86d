//! Review quality rating.

use serde::{Deserialize, Serialize};

use crate::error::{NotesError, NotesResult};

/// Lowest score that counts as a successful recall.
pub const SUCCESS_THRESHOLD: u8 = 3;

/// Highest possible score.
pub const MAX_QUALITY: u8 = 5;

/// Recall score given by the reviewer, always within 0..=5.
///
/// - 0: complete blackout
/// - 1: incorrect, answer recognised once shown
/// - 2: incorrect, answer seemed easy once shown
/// - 3: correct with serious difficulty
/// - 4: correct after hesitation
/// - 5: perfect recall
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    /// Validate a raw rating.
    pub fn new(value: i64) -> NotesResult<Self> {
        if (0..=MAX_QUALITY as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(NotesError::out_of_range(
                "quality",
                format!("quality must be an integer between 0 and {}, got {}", MAX_QUALITY, value),
            ))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether this rating counts as a successful recall.
    pub fn is_success(self) -> bool {
        self.0 >= SUCCESS_THRESHOLD
    }

    /// All ratings from 0 to 5.
    pub fn all() -> impl Iterator<Item = Quality> {
        (0..=MAX_QUALITY).map(Quality)
    }
}

impl TryFrom<i64> for Quality {
    type Error = NotesError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_full_range() {
        for raw in 0..=5 {
            assert_eq!(Quality::new(raw).unwrap().value() as i64, raw);
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(Quality::new(-1), Err(NotesError::InvalidInput { .. })));
        assert!(matches!(Quality::new(6), Err(NotesError::InvalidInput { .. })));
    }

    #[test]
    fn test_success_threshold() {
        assert!(!Quality::new(2).unwrap().is_success());
        assert!(Quality::new(3).unwrap().is_success());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Quality = serde_json::from_str("4").unwrap();
        assert_eq!(ok.value(), 4);
        assert!(serde_json::from_str::<Quality>("9").is_err());
        assert!(serde_json::from_str::<Quality>("2.5").is_err());
    }
}
