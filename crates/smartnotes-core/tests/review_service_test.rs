//! Review service over the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use smartnotes_core::{
    CardDraft, CardGenerator, CardStore, FixedClock, GenerationOptions, InMemoryCardStore, Llm,
    LlmResponse, Message, NotesError, NotesResult, ReviewConfig, ReviewService, SourceNote,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap()
}

struct Harness {
    clock: Arc<FixedClock>,
    store: Arc<InMemoryCardStore>,
    service: ReviewService,
}

fn harness() -> Harness {
    let clock = Arc::new(FixedClock::new(start()));
    let store = Arc::new(InMemoryCardStore::new());
    let service = ReviewService::new(store.clone(), clock.clone(), ReviewConfig::default());
    Harness {
        clock,
        store,
        service,
    }
}

fn drafts(n: usize) -> Vec<CardDraft> {
    (0..n)
        .map(|i| CardDraft::new(format!("Question {i}"), format!("Answer {i}")))
        .collect()
}

#[tokio::test]
async fn test_new_cards_are_due_immediately() {
    let h = harness();
    let created = h.service.create_cards("alice", "rust", drafts(3)).await.unwrap();
    assert_eq!(created.len(), 3);
    assert!(created.iter().all(|c| c.review.repetitions == 0 && c.review.interval == 1));

    let due = h.service.list_due("alice", None, None).await.unwrap();
    assert_eq!(due.len(), 3);
    assert!(h.service.list_due("bob", None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_review_progression_follows_sm2() {
    let h = harness();
    let id = h.service.create_cards("alice", "rust", drafts(1)).await.unwrap()[0]
        .id
        .clone();

    let first = h.service.review_card("alice", &id, 5).await.unwrap();
    assert_eq!(first.card.review.interval, 1);
    assert_eq!(first.next_review, start() + Duration::days(1));

    h.clock.advance(Duration::days(1));
    let second = h.service.review_card("alice", &id, 4).await.unwrap();
    assert_eq!(second.card.review.interval, 6);
    assert_eq!(second.card.review.repetitions, 2);

    h.clock.advance(Duration::days(6));
    let third = h.service.review_card("alice", &id, 5).await.unwrap();
    assert_eq!(third.card.review.repetitions, 3);
    // round(6 * 2.7)
    assert_eq!(third.card.review.interval, 16);
    assert_eq!(third.card.version, 3);

    h.clock.advance(Duration::days(16));
    let lapse = h.service.review_card("alice", &id, 1).await.unwrap();
    assert_eq!(lapse.card.review.repetitions, 0);
    assert_eq!(lapse.card.review.interval, 1);
    assert!(lapse.card.review.ease_factor >= 1.3);
}

#[tokio::test]
async fn test_reviewed_card_leaves_due_list() {
    let h = harness();
    let cards = h.service.create_cards("alice", "rust", drafts(2)).await.unwrap();

    h.service.review_card("alice", &cards[0].id, 4).await.unwrap();
    let due = h.service.list_due("alice", None, None).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, cards[1].id);

    h.clock.advance(Duration::days(1));
    assert_eq!(h.service.list_due("alice", None, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_due_is_ordered_and_stable() {
    let h = harness();
    let cards = h.service.create_cards("alice", "rust", drafts(3)).await.unwrap();
    for (card, days) in cards.iter().zip([2i64, 5, 3]) {
        let mut card = card.clone();
        card.review.next_review = start() - Duration::days(days);
        h.store.put(card).await;
    }

    let first = h.service.list_due("alice", None, None).await.unwrap();
    let second = h.service.list_due("alice", None, None).await.unwrap();
    assert_eq!(first, second);

    let ids: Vec<_> = first.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, vec![cards[1].id.clone(), cards[2].id.clone(), cards[0].id.clone()]);

    let limited = h.service.list_due("alice", None, Some(2)).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_list_due_scoped_to_topic() {
    let h = harness();
    h.service.create_cards("alice", "rust", drafts(2)).await.unwrap();
    h.service.create_cards("alice", "go", drafts(1)).await.unwrap();

    let rust = h.service.list_due("alice", Some("rust".into()), None).await.unwrap();
    assert_eq!(rust.len(), 2);
    assert!(rust.iter().all(|c| c.topic_id == "rust"));
}

#[tokio::test]
async fn test_stats_completion() {
    let h = harness();
    let cards = h.service.create_cards("alice", "rust", drafts(10)).await.unwrap();
    for card in cards.iter().take(3) {
        let mut card = card.clone();
        card.review.repetitions = 5;
        card.review.next_review = start() + Duration::days(30);
        h.store.put(card).await;
    }

    let stats = h.service.stats("alice").await.unwrap();
    assert_eq!(stats.total, 10);
    assert_eq!(stats.due, 7);
    assert_eq!(stats.mastered, 3);
    assert_eq!(stats.completion_pct, 30);
}

#[tokio::test]
async fn test_stats_without_cards() {
    let h = harness();
    let stats = h.service.stats("nobody").await.unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.completion_pct, 0);
}

#[tokio::test]
async fn test_deactivated_card_disappears() {
    let h = harness();
    let cards = h.service.create_cards("alice", "rust", drafts(2)).await.unwrap();

    assert!(matches!(
        h.service.deactivate_card("bob", &cards[0].id).await,
        Err(NotesError::NotFound { .. })
    ));
    h.service.deactivate_card("alice", &cards[0].id).await.unwrap();

    assert_eq!(h.service.stats("alice").await.unwrap().total, 1);
    assert!(matches!(
        h.service.review_card("alice", &cards[0].id, 5).await,
        Err(NotesError::NotFound { .. })
    ));
    assert!(matches!(
        h.service.deactivate_card("alice", &cards[0].id).await,
        Err(NotesError::NotFound { .. })
    ));
    // never hard-deleted
    assert!(h.store.get(&cards[0].id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_concurrent_reviews_do_not_lose_updates() {
    let h = Arc::new(harness());
    let id = h.service.create_cards("alice", "rust", drafts(1)).await.unwrap()[0]
        .id
        .clone();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let h = h.clone();
            let id = id.clone();
            tokio::spawn(async move { h.service.review_card("alice", &id, 5).await })
        })
        .collect();

    let mut succeeded = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(NotesError::Conflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let stored = h.store.get(&id).await.unwrap().unwrap();
    assert!(succeeded >= 1);
    assert_eq!(stored.version, succeeded);
    assert_eq!(u64::from(stored.review.repetitions), succeeded);
}

struct JsonLlm;

#[async_trait]
impl Llm for JsonLlm {
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> NotesResult<LlmResponse> {
        Ok(LlmResponse {
            content: Some(
                r#"[{"question": "What does SM-2 adjust?", "answer": "The ease factor", "difficulty": "easy", "tags": ["sm2"]},
                    {"question": "Minimum ease?", "answer": "1.3"}]"#
                    .to_string(),
            ),
            usage: None,
        })
    }

    fn model_name(&self) -> &str {
        "json-stub"
    }
}

#[tokio::test]
async fn test_generate_cards_persists_drafts() {
    let h = harness();
    let service = h
        .service
        .with_generator(CardGenerator::new(Arc::new(JsonLlm)));
    assert!(service.generation_enabled());

    let notes = vec![SourceNote::new("SM-2", "Ease factors never drop below 1.3.")];
    let cards = service
        .generate_cards("alice", "memory", notes.clone(), 5, None)
        .await
        .unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].tags, vec!["sm2".to_string()]);
    assert_eq!(h.store.len().await, 2);

    assert!(service
        .generate_cards("alice", "memory", notes.clone(), 0, None)
        .await
        .is_err());
    assert!(service
        .generate_cards("alice", "memory", notes, 51, None)
        .await
        .is_err());
    assert!(service
        .generate_cards("alice", "memory", vec![], 5, None)
        .await
        .is_err());
}
