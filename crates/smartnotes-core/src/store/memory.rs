//! In-process card store.
//!
//! Cards live in a `HashMap` behind a tokio `RwLock`. The write lock makes
//! `replace_if_version` atomic, which is all the review path needs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::NotesResult;
use crate::traits::{CardQuery, CardStore};
use crate::types::{Card, NewCard};

/// Card store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryCardStore {
    cards: RwLock<HashMap<String, Card>>,
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cards, including inactive ones.
    pub async fn len(&self) -> usize {
        self.cards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cards.read().await.is_empty()
    }

    /// Store a fully formed card as-is. Overwrites any card with the same id.
    pub async fn put(&self, card: Card) {
        self.cards.write().await.insert(card.id.clone(), card);
    }

    fn matching(cards: &HashMap<String, Card>, query: &CardQuery) -> Vec<Card> {
        let mut found: Vec<Card> = cards.values().filter(|c| query.matches(c)).cloned().collect();
        found.sort_by(|a, b| {
            a.review
                .next_review
                .cmp(&b.review.next_review)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        found
    }
}

#[async_trait]
impl CardStore for InMemoryCardStore {
    async fn insert_many(&self, cards: Vec<NewCard>) -> NotesResult<Vec<Card>> {
        let created: Vec<Card> = cards
            .into_iter()
            .map(|c| c.into_card(Uuid::new_v4().to_string()))
            .collect();

        let mut guard = self.cards.write().await;
        for card in &created {
            guard.insert(card.id.clone(), card.clone());
        }
        Ok(created)
    }

    async fn get(&self, id: &str) -> NotesResult<Option<Card>> {
        Ok(self.cards.read().await.get(id).cloned())
    }

    async fn replace_if_version(&self, card: &Card, expected_version: u64) -> NotesResult<bool> {
        let mut guard = self.cards.write().await;
        match guard.get_mut(&card.id) {
            Some(stored) if stored.version == expected_version => {
                *stored = card.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find(&self, query: &CardQuery) -> NotesResult<Vec<Card>> {
        let guard = self.cards.read().await;
        let mut found = Self::matching(&guard, query);
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn count(&self, query: &CardQuery) -> NotesResult<u64> {
        let guard = self.cards.read().await;
        Ok(guard.values().filter(|c| query.matches(c)).count() as u64)
    }

    async fn set_active(
        &self,
        id: &str,
        owner: &str,
        active: bool,
        at: DateTime<Utc>,
    ) -> NotesResult<bool> {
        let mut guard = self.cards.write().await;
        match guard.get_mut(id) {
            Some(card) if card.owner == owner => {
                if card.is_active != active {
                    card.is_active = active;
                    card.version += 1;
                    card.updated_at = at;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
