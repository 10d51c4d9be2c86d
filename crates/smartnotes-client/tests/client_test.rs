//! Client round trips against a real server bound to a local port.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use smartnotes_client::{CardDraft, Difficulty, StudyClient};
use smartnotes_core::config::{AuthConfig, ReviewConfig};
use smartnotes_core::{FixedClock, InMemoryCardStore, NotesError, ReviewService, SourceNote};
use smartnotes_server::{create_server, AppState};

async fn spawn() -> String {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    ));
    let service = ReviewService::new(
        Arc::new(InMemoryCardStore::new()),
        clock,
        ReviewConfig::default(),
    );
    let mut auth = AuthConfig::default();
    auth.api_keys.insert("alice-token".into(), "alice".into());
    auth.api_keys.insert("bob-token".into(), "bob".into());

    let router = create_server(AppState::new(service, auth));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_create_review_and_stats() {
    let base = spawn().await;
    let client = StudyClient::new(&base, "alice-token").unwrap();

    let cards = client
        .create_cards(
            "physics",
            &[
                CardDraft::new("Unit of force?", "Newton").with_difficulty(Difficulty::Easy),
                CardDraft::new("Speed of light?", "299792458 m/s"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].difficulty, Difficulty::Easy);

    let due = client.due_cards(Some("physics"), None).await.unwrap();
    assert_eq!(due.len(), 2);

    let outcome = client.review(&cards[0].id, 5).await.unwrap();
    assert_eq!(outcome.card.review.repetitions, 1);
    assert_eq!(
        outcome.next_review,
        Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap()
    );

    let stats = client.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.due, 1);

    let preview = client.preview(&cards[1].id).await.unwrap();
    assert_eq!(preview.len(), 6);

    let listed = client.list_cards(None, true, Some(10)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, cards[1].id);
}

#[tokio::test]
async fn test_errors_map_back_to_notes_errors() {
    let base = spawn().await;
    let alice = StudyClient::new(&base, "alice-token").unwrap();
    let bob = StudyClient::new(&base, "bob-token").unwrap();

    let card = alice
        .create_cards("chem", &[CardDraft::new("H2O?", "Water")])
        .await
        .unwrap()
        .remove(0);

    assert!(matches!(
        alice.review(&card.id, 9).await,
        Err(NotesError::InvalidInput { .. })
    ));
    assert!(matches!(
        bob.get_card(&card.id).await,
        Err(NotesError::NotFound { .. })
    ));

    assert!(matches!(
        alice.get_card("stats/../due").await,
        Err(NotesError::NotFound { .. })
    ));
    assert!(matches!(
        alice.deactivate("x?limit=1").await,
        Err(NotesError::NotFound { .. })
    ));

    let stranger = StudyClient::new(&base, "nobody").unwrap();
    assert!(matches!(
        stranger.stats().await,
        Err(NotesError::Unauthorized(_))
    ));

    let notes = [SourceNote {
        title: "Acids".into(),
        content: "Acids donate protons.".into(),
    }];
    assert!(alice.generate_cards("chem", &notes, Some(3), None).await.is_err());

    alice.deactivate(&card.id).await.unwrap();
    assert!(matches!(
        alice.deactivate(&card.id).await,
        Err(NotesError::NotFound { .. })
    ));
}
