//! Review service: fetch, schedule, persist.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::scheduler::{next_review_state, IntervalPreview, ReviewScheduler};
use crate::clock::Clock;
use crate::config::ReviewConfig;
use crate::error::{NotesError, NotesResult};
use crate::generation::{CardGenerator, GenerationRequest, SourceNote};
use crate::traits::{CardQuery, CardStore};
use crate::types::{Card, CardDraft, CardStats, Difficulty, NewCard, Quality};

/// Result of a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    #[serde(rename = "flashcard")]
    pub card: Card,
    pub next_review: DateTime<Utc>,
}

/// Owner-scoped flashcard operations.
///
/// Cards that are missing, inactive or owned by someone else are reported as
/// not found without distinguishing between the three.
pub struct ReviewService {
    store: Arc<dyn CardStore>,
    scheduler: ReviewScheduler,
    config: ReviewConfig,
    generator: Option<CardGenerator>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn CardStore>, clock: Arc<dyn Clock>, config: ReviewConfig) -> Self {
        Self {
            store,
            scheduler: ReviewScheduler::new(clock),
            config,
            generator: None,
        }
    }

    /// Enable `generate_cards`.
    pub fn with_generator(mut self, generator: CardGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn generation_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub fn store(&self) -> &Arc<dyn CardStore> {
        &self.store
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Record a review of one of `owner`'s cards.
    ///
    /// The write is conditional on the card's version so a concurrent review
    /// of the same card yields `Conflict` instead of a lost update.
    pub async fn review_card(
        &self,
        owner: &str,
        card_id: &str,
        quality: i64,
    ) -> NotesResult<ReviewOutcome> {
        let quality = Quality::new(quality)?;
        let card = self.visible_card(owner, card_id).await?;

        let now = self.scheduler.now();
        let review = next_review_state(&card.review, quality, now)?;
        let expected_version = card.version;
        let updated = Card {
            review,
            version: expected_version + 1,
            updated_at: now,
            ..card
        };

        if !self.store.replace_if_version(&updated, expected_version).await? {
            warn!(card_id, owner, "Review lost a concurrent update race");
            return Err(NotesError::conflict(card_id));
        }

        info!(
            card_id,
            quality = quality.value(),
            interval = updated.review.interval,
            repetitions = updated.review.repetitions,
            "Card reviewed"
        );
        Ok(ReviewOutcome {
            next_review: updated.review.next_review,
            card: updated,
        })
    }

    /// Due cards, most overdue first.
    pub async fn list_due(
        &self,
        owner: &str,
        topic_id: Option<String>,
        limit: Option<usize>,
    ) -> NotesResult<Vec<Card>> {
        self.list_cards(owner, topic_id, true, limit).await
    }

    /// Active cards ordered by next review, optionally only the due ones.
    pub async fn list_cards(
        &self,
        owner: &str,
        topic_id: Option<String>,
        due_only: bool,
        limit: Option<usize>,
    ) -> NotesResult<Vec<Card>> {
        let limit = self.effective_limit(limit)?;
        let mut query = CardQuery::for_owner(owner).topic(topic_id).limit(limit);
        if due_only {
            query = query.due_at(self.scheduler.now());
        }
        let cards = self.store.find(&query).await?;
        debug!(owner, due_only, count = cards.len(), "Listed cards");
        Ok(cards)
    }

    pub async fn get_card(&self, owner: &str, card_id: &str) -> NotesResult<Card> {
        self.visible_card(owner, card_id).await
    }

    /// Interval each rating would give the card right now.
    pub async fn preview(&self, owner: &str, card_id: &str) -> NotesResult<Vec<IntervalPreview>> {
        let card = self.visible_card(owner, card_id).await?;
        self.scheduler.preview(&card.review)
    }

    pub async fn stats(&self, owner: &str) -> NotesResult<CardStats> {
        let all = CardQuery::for_owner(owner);
        let due = all.clone().due_at(self.scheduler.now());
        let mastered = all.clone().min_repetitions(self.config.mastered_repetitions);

        let (total, due, mastered) = tokio::try_join!(
            self.store.count(&all),
            self.store.count(&due),
            self.store.count(&mastered),
        )?;
        Ok(CardStats::new(total, due, mastered))
    }

    /// Create a batch of cards under one topic.
    pub async fn create_cards(
        &self,
        owner: &str,
        topic_id: &str,
        drafts: Vec<CardDraft>,
    ) -> NotesResult<Vec<Card>> {
        let topic_id = topic_id.trim();
        if topic_id.is_empty() {
            return Err(NotesError::missing_field("topicId"));
        }
        if drafts.is_empty() {
            return Err(NotesError::invalid_input("At least one card is required")
                .with_detail("cards", "empty"));
        }

        let now = self.scheduler.now();
        let new_cards = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                draft
                    .validate()
                    .map(|d| NewCard::new(owner, topic_id, d, now))
                    .map_err(|e| e.with_detail("index", index.to_string()))
            })
            .collect::<NotesResult<Vec<_>>>()?;

        let cards = self.store.insert_many(new_cards).await?;
        info!(owner, topic_id, count = cards.len(), "Cards created");
        Ok(cards)
    }

    /// Generate cards from notes with the configured model and store them.
    pub async fn generate_cards(
        &self,
        owner: &str,
        topic_id: &str,
        notes: Vec<SourceNote>,
        count: usize,
        difficulty: Option<Difficulty>,
    ) -> NotesResult<Vec<Card>> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(NotesError::llm_not_configured)?;

        let notes: Vec<SourceNote> = notes
            .into_iter()
            .filter(|n| !n.content.trim().is_empty())
            .collect();
        if notes.is_empty() {
            return Err(NotesError::missing_field("notes"));
        }
        let max = self.config.max_generated_cards;
        if count == 0 || count > max {
            return Err(NotesError::out_of_range(
                "count",
                format!("count must be between 1 and {}", max),
            ));
        }

        let drafts = generator
            .generate(&GenerationRequest {
                notes,
                count,
                difficulty,
            })
            .await?;
        if drafts.is_empty() {
            return Err(NotesError::llm("Model produced no usable flashcards"));
        }
        self.create_cards(owner, topic_id, drafts).await
    }

    /// Soft-delete one of `owner`'s cards.
    pub async fn deactivate_card(&self, owner: &str, card_id: &str) -> NotesResult<()> {
        self.visible_card(owner, card_id).await?;
        let now = self.scheduler.now();
        if !self.store.set_active(card_id, owner, false, now).await? {
            return Err(NotesError::card_not_found(card_id));
        }
        info!(card_id, owner, "Card deactivated");
        Ok(())
    }

    async fn visible_card(&self, owner: &str, card_id: &str) -> NotesResult<Card> {
        match self.store.get(card_id).await? {
            Some(card) if card.is_visible_to(owner) => Ok(card),
            _ => Err(NotesError::card_not_found(card_id)),
        }
    }

    fn effective_limit(&self, limit: Option<usize>) -> NotesResult<usize> {
        match limit {
            None => Ok(self.config.default_due_limit),
            Some(0) => Err(NotesError::out_of_range("limit", "limit must be at least 1")),
            Some(n) => Ok(n.min(self.config.max_due_limit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ErrorCode;
    use crate::traits::MockCardStore;
    use crate::types::ReviewState;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 7, 0, 0).unwrap()
    }

    fn card(owner: &str) -> Card {
        let mut card = NewCard::new(owner, "topic", CardDraft::new("Q", "A"), now()).into_card("c1");
        card.review = ReviewState {
            ease_factor: 2.5,
            interval: 6,
            repetitions: 2,
            next_review: now(),
        };
        card.version = 4;
        card
    }

    fn service(store: MockCardStore) -> ReviewService {
        ReviewService::new(
            Arc::new(store),
            Arc::new(FixedClock::new(now())),
            ReviewConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_invalid_quality_fails_before_io() {
        // No expectations: any store call panics.
        let svc = service(MockCardStore::new());
        for bad in [-1, 6, 42] {
            let err = svc.review_card("alice", "c1", bad).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::ValOutOfRange);
        }
    }

    #[tokio::test]
    async fn test_review_writes_with_version_check() {
        let mut store = MockCardStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some(card("alice"))));
        store
            .expect_replace_if_version()
            .withf(|c, expected| *expected == 4 && c.version == 5 && c.review.interval == 16)
            .times(1)
            .returning(|_, _| Ok(true));

        let outcome = service(store).review_card("alice", "c1", 5).await.unwrap();
        assert_eq!(outcome.card.review.repetitions, 3);
        assert_eq!(outcome.next_review, now() + chrono::Duration::days(16));
        assert_eq!(outcome.card.updated_at, now());
    }

    #[tokio::test]
    async fn test_review_of_foreign_card_is_not_found() {
        let mut store = MockCardStore::new();
        store.expect_get().returning(|_| Ok(Some(card("bob"))));

        let err = service(store).review_card("alice", "c1", 4).await.unwrap_err();
        assert!(matches!(err, NotesError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_review_of_inactive_card_is_not_found() {
        let mut store = MockCardStore::new();
        store.expect_get().returning(|_| {
            let mut c = card("alice");
            c.is_active = false;
            Ok(Some(c))
        });

        let err = service(store).review_card("alice", "c1", 4).await.unwrap_err();
        assert!(matches!(err, NotesError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_lost_race_is_conflict() {
        let mut store = MockCardStore::new();
        store.expect_get().returning(|_| Ok(Some(card("alice"))));
        store
            .expect_replace_if_version()
            .returning(|_, _| Ok(false));

        let err = service(store).review_card("alice", "c1", 3).await.unwrap_err();
        assert!(matches!(err, NotesError::Conflict { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_store_failure_on_write_is_not_success() {
        let mut store = MockCardStore::new();
        store.expect_get().returning(|_| Ok(Some(card("alice"))));
        store
            .expect_replace_if_version()
            .returning(|_, _| Err(NotesError::store("connection reset")));

        let err = service(store).review_card("alice", "c1", 5).await.unwrap_err();
        assert!(matches!(err, NotesError::StoreUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_store_failure_on_read_propagates() {
        let mut store = MockCardStore::new();
        store
            .expect_get()
            .returning(|_| Err(NotesError::store("timeout")));

        let err = service(store).get_card("alice", "c1").await.unwrap_err();
        assert!(matches!(err, NotesError::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_list_due_applies_default_and_cap() {
        let mut store = MockCardStore::new();
        store
            .expect_find()
            .withf(|q| q.limit == Some(50) && q.due_at == Some(now()) && q.owner == "alice")
            .times(1)
            .returning(|_| Ok(vec![]));
        store
            .expect_find()
            .withf(|q| q.limit == Some(200))
            .times(1)
            .returning(|_| Ok(vec![]));

        let svc = service(store);
        svc.list_due("alice", None, None).await.unwrap();
        svc.list_due("alice", None, Some(10_000)).await.unwrap();
        assert!(svc.list_due("alice", None, Some(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_stats_queries() {
        let mut store = MockCardStore::new();
        store.expect_count().returning(|q| {
            Ok(match (q.due_at, q.min_repetitions) {
                (None, None) => 10,
                (Some(_), None) => 4,
                (None, Some(5)) => 3,
                _ => 0,
            })
        });

        let stats = service(store).stats("alice").await.unwrap();
        assert_eq!(stats.total, 10);
        assert_eq!(stats.due, 4);
        assert_eq!(stats.mastered, 3);
        assert_eq!(stats.completion_pct, 30);
    }

    #[tokio::test]
    async fn test_create_cards_reports_bad_index() {
        let svc = service(MockCardStore::new());
        let drafts = vec![CardDraft::new("Q", "A"), CardDraft::new("Q2", " ")];

        match svc.create_cards("alice", "topic", drafts).await.unwrap_err() {
            NotesError::InvalidInput { details, .. } => {
                assert_eq!(details.get("index").map(String::as_str), Some("1"));
                assert!(details.contains_key("answer"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(svc.create_cards("alice", " ", vec![CardDraft::new("Q", "A")]).await.is_err());
        assert!(svc.create_cards("alice", "topic", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn test_generate_without_model_is_not_configured() {
        let svc = service(MockCardStore::new());
        let err = svc
            .generate_cards("alice", "topic", vec![SourceNote::new("t", "c")], 5, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::LlmNotConfigured);
    }

    #[tokio::test]
    async fn test_deactivate_foreign_card_is_not_found() {
        let mut store = MockCardStore::new();
        store.expect_get().returning(|_| Ok(Some(card("bob"))));

        let err = service(store).deactivate_card("alice", "c1").await.unwrap_err();
        assert!(matches!(err, NotesError::NotFound { .. }));
    }
}
