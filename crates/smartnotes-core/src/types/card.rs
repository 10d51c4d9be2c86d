//! Flashcard types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{NotesError, NotesResult};

/// Floor for the ease factor.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor given to new cards.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Author-assigned difficulty label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Note a card was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// Spaced-repetition state embedded in every card.
///
/// The four fields and their camelCase names are the persisted layout shared
/// with existing stored cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    /// Multiplicative growth rate of the interval, never below 1.3.
    pub ease_factor: f64,
    /// Days until the next review, at least 1.
    pub interval: u32,
    /// Consecutive successful reviews.
    pub repetitions: u32,
    /// The card is due once this instant has passed.
    pub next_review: DateTime<Utc>,
}

impl ReviewState {
    /// State for a card that has never been reviewed; due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            interval: 1,
            repetitions: 0,
            next_review: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }
}

/// A persisted flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub owner: String,
    pub topic_id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<CardSource>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(rename = "repetitionData")]
    pub review: ReviewState,
    /// Bumped on every write; used for conditional updates.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Card {
    /// Whether `owner` may see this card.
    pub fn is_visible_to(&self, owner: &str) -> bool {
        self.is_active && self.owner == owner
    }

    /// Whether the card is mastered under the given threshold.
    pub fn is_mastered(&self, threshold: u32) -> bool {
        self.review.repetitions >= threshold
    }
}

/// Caller-supplied content for a new card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<CardSource>,
}

impl CardDraft {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            difficulty: Difficulty::default(),
            tags: Vec::new(),
            source: None,
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Check required fields and normalise whitespace.
    pub fn validate(mut self) -> NotesResult<Self> {
        self.question = self.question.trim().to_string();
        self.answer = self.answer.trim().to_string();
        if self.question.is_empty() {
            return Err(NotesError::missing_field("question"));
        }
        if self.answer.is_empty() {
            return Err(NotesError::missing_field("answer"));
        }
        self.tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Ok(self)
    }
}

/// A validated card waiting for the store to assign its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub owner: String,
    pub topic_id: String,
    pub draft: CardDraft,
    pub review: ReviewState,
    pub created_at: DateTime<Utc>,
}

impl NewCard {
    pub fn new(
        owner: impl Into<String>,
        topic_id: impl Into<String>,
        draft: CardDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            owner: owner.into(),
            topic_id: topic_id.into(),
            draft,
            review: ReviewState::new(now),
            created_at: now,
        }
    }

    /// Materialise the card under a store-assigned id.
    pub fn into_card(self, id: impl Into<String>) -> Card {
        Card {
            id: id.into(),
            owner: self.owner,
            topic_id: self.topic_id,
            question: self.draft.question,
            answer: self.draft.answer,
            difficulty: self.draft.difficulty,
            tags: self.draft.tags,
            source: self.draft.source,
            is_active: true,
            review: self.review,
            version: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
