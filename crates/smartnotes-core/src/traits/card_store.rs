//! Card store trait and query type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::NotesResult;
use crate::types::{Card, NewCard};

/// Filter over one owner's active cards.
///
/// Results are always ordered by `nextReview` ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardQuery {
    pub owner: String,
    pub topic_id: Option<String>,
    /// Only cards with `nextReview <= due_at`.
    pub due_at: Option<DateTime<Utc>>,
    /// Only cards with at least this many consecutive successes.
    pub min_repetitions: Option<u32>,
    pub limit: Option<usize>,
}

impl CardQuery {
    pub fn for_owner(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..Default::default()
        }
    }

    pub fn topic(mut self, topic_id: Option<String>) -> Self {
        self.topic_id = topic_id;
        self
    }

    pub fn due_at(mut self, now: DateTime<Utc>) -> Self {
        self.due_at = Some(now);
        self
    }

    pub fn min_repetitions(mut self, repetitions: u32) -> Self {
        self.min_repetitions = Some(repetitions);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a card passes every filter (the limit is not considered).
    pub fn matches(&self, card: &Card) -> bool {
        if !card.is_visible_to(&self.owner) {
            return false;
        }
        if let Some(ref topic) = self.topic_id {
            if &card.topic_id != topic {
                return false;
            }
        }
        if let Some(due_at) = self.due_at {
            if !card.review.is_due(due_at) {
                return false;
            }
        }
        match self.min_repetitions {
            Some(threshold) => card.is_mastered(threshold),
            None => true,
        }
    }
}

/// Persistence for cards.
///
/// Implementations must make `replace_if_version` atomic per card so that two
/// concurrent reviews of the same card cannot both succeed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Insert new cards, assigning ids. Returns them in input order.
    async fn insert_many(&self, cards: Vec<NewCard>) -> NotesResult<Vec<Card>>;

    /// Fetch a card by id regardless of owner or active flag.
    async fn get(&self, id: &str) -> NotesResult<Option<Card>>;

    /// Replace the stored card only if its version still equals `expected_version`.
    ///
    /// Returns `false` when the card is missing or was changed in between.
    async fn replace_if_version(&self, card: &Card, expected_version: u64) -> NotesResult<bool>;

    /// Active cards matching the query, ordered by next review ascending.
    async fn find(&self, query: &CardQuery) -> NotesResult<Vec<Card>>;

    /// Number of active cards matching the query. The limit is ignored.
    async fn count(&self, query: &CardQuery) -> NotesResult<u64>;

    /// Flip the active flag of one of `owner`'s cards, stamping `at` as the update time.
    ///
    /// Returns `false` if `owner` has no card with this id.
    async fn set_active(
        &self,
        id: &str,
        owner: &str,
        active: bool,
        at: DateTime<Utc>,
    ) -> NotesResult<bool>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> NotesResult<()> {
        Ok(())
    }

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CardDraft;
    use chrono::{Duration, TimeZone};

    fn card(owner: &str, repetitions: u32) -> Card {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut card = NewCard::new(owner, "t1", CardDraft::new("Q", "A"), now).into_card("c1");
        card.review.repetitions = repetitions;
        card.review.next_review = now + Duration::days(2);
        card
    }

    #[test]
    fn test_matches_mastery_threshold() {
        let query = CardQuery::for_owner("alice").min_repetitions(5);
        assert!(!query.matches(&card("alice", 4)));
        assert!(query.matches(&card("alice", 5)));
        assert!(query.matches(&card("alice", 9)));
        assert!(!query.matches(&card("bob", 9)));
    }

    #[test]
    fn test_matches_due_and_topic() {
        let c = card("alice", 0);
        let due = c.review.next_review;

        assert!(CardQuery::for_owner("alice").due_at(due).matches(&c));
        assert!(!CardQuery::for_owner("alice")
            .due_at(due - Duration::seconds(1))
            .matches(&c));
        assert!(!CardQuery::for_owner("alice")
            .topic(Some("t2".into()))
            .matches(&c));
    }
}
