//! MongoDB card store.
//!
//! Documents keep the layout of the existing `flashcards` collection:
//! `repetitionData { easeFactor, interval, repetitions, nextReview }` plus
//! `topicId`, `isActive`, `tags`, `source` and timestamps. Older documents
//! written with `userId`, ObjectId references or floating-point counters are
//! read transparently and rewritten in the current shape on their next review.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use ::mongodb::options::{ClientOptions, FindOptions, IndexOptions};
use ::mongodb::{Client, Collection, IndexModel};

use smartnotes_core::config::StoreConfig;
use smartnotes_core::error::{NotesError, NotesResult};
use smartnotes_core::traits::{CardQuery, CardStore};
use smartnotes_core::types::{Card, CardSource, Difficulty, NewCard, ReviewState};

const APP_NAME: &str = "smartnotes";

/// Card store backed by a MongoDB collection.
pub struct MongoCardStore {
    client: Client,
    database: String,
    cards: Collection<CardDocument>,
}

impl MongoCardStore {
    /// Connect and make sure the due-query index exists.
    pub async fn new(config: &StoreConfig) -> NotesResult<Self> {
        if config.url.trim().is_empty() {
            return Err(NotesError::Configuration(
                "MongoDB connection string required".to_string(),
            ));
        }

        let mut client_options = ClientOptions::parse(&config.url)
            .await
            .map_err(|e| NotesError::Configuration(format!("Invalid MongoDB URL: {}", e)))?;
        client_options.app_name = Some(APP_NAME.to_string());

        let client = Client::with_options(client_options)
            .map_err(|e| NotesError::store_with_source("Failed to create MongoDB client", e))?;
        let cards = client
            .database(&config.database)
            .collection::<CardDocument>(&config.collection);

        let store = Self {
            client,
            database: config.database.clone(),
            cards,
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// One index per owner field; `$or` only uses indexes when every branch has one.
    fn index_models() -> Vec<IndexModel> {
        [("owner", "owner_next_review"), ("userId", "user_id_next_review")]
            .into_iter()
            .map(|(field, name)| {
                let mut keys = Document::new();
                keys.insert(field, 1);
                keys.insert("repetitionData.nextReview", 1);
                IndexModel::builder()
                    .keys(keys)
                    .options(IndexOptions::builder().name(name.to_string()).build())
                    .build()
            })
            .collect()
    }

    async fn ensure_indexes(&self) -> NotesResult<()> {
        self.cards
            .create_indexes(Self::index_models(), None)
            .await
            .map_err(|e| NotesError::store_with_source("Failed to create card indexes", e))?;
        Ok(())
    }

    fn find_options(limit: Option<usize>) -> FindOptions {
        FindOptions::builder()
            .sort(doc! { "repetitionData.nextReview": 1, "createdAt": 1, "_id": 1 })
            .limit(limit.map(|l| l as i64))
            .build()
    }
}

#[async_trait]
impl CardStore for MongoCardStore {
    async fn insert_many(&self, cards: Vec<NewCard>) -> NotesResult<Vec<Card>> {
        if cards.is_empty() {
            return Ok(Vec::new());
        }

        let created: Vec<Card> = cards
            .into_iter()
            .map(|c| c.into_card(ObjectId::new().to_hex()))
            .collect();
        let documents = created
            .iter()
            .map(CardDocument::from_card)
            .collect::<NotesResult<Vec<_>>>()?;

        self.cards
            .insert_many(documents, None)
            .await
            .map_err(|e| NotesError::store_with_source("Failed to insert cards", e))?;

        debug!(count = created.len(), "Inserted cards");
        Ok(created)
    }

    async fn get(&self, id: &str) -> NotesResult<Option<Card>> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };

        let document = self
            .cards
            .find_one(doc! { "_id": oid }, None)
            .await
            .map_err(|e| NotesError::store_with_source("Failed to get card", e))?;
        Ok(document.map(CardDocument::into_card))
    }

    async fn replace_if_version(&self, card: &Card, expected_version: u64) -> NotesResult<bool> {
        let document = CardDocument::from_card(card)?;
        let filter = doc! { "$and": [
            { "_id": document.id },
            version_filter(expected_version),
        ] };

        let result = self
            .cards
            .replace_one(filter, document, None)
            .await
            .map_err(|e| NotesError::store_with_source("Failed to update card", e))?;

        if result.matched_count == 0 {
            warn!(card_id = %card.id, expected_version, "Conditional card update matched nothing");
        }
        Ok(result.matched_count == 1)
    }

    async fn find(&self, query: &CardQuery) -> NotesResult<Vec<Card>> {
        let mut cursor = self
            .cards
            .find(build_filter(query), Self::find_options(query.limit))
            .await
            .map_err(|e| NotesError::store_with_source("Failed to query cards", e))?;

        let mut cards = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|e| NotesError::store_with_source("Cursor error", e))?
        {
            let document = cursor
                .deserialize_current()
                .map_err(|e| NotesError::store_with_source("Failed to deserialize card", e))?;
            cards.push(document.into_card());
        }
        Ok(cards)
    }

    async fn count(&self, query: &CardQuery) -> NotesResult<u64> {
        self.cards
            .count_documents(build_filter(query), None)
            .await
            .map_err(|e| NotesError::store_with_source("Failed to count cards", e))
    }

    async fn set_active(
        &self,
        id: &str,
        owner: &str,
        active: bool,
        at: DateTime<Utc>,
    ) -> NotesResult<bool> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(false);
        };

        let filter = doc! { "$and": [{ "_id": oid }, owner_filter(owner)] };
        let update = doc! {
            "$set": { "isActive": active, "updatedAt": bson::DateTime::from_chrono(at) },
            "$inc": { "version": 1_i64 },
        };

        let result = self
            .cards
            .update_one(filter, update, None)
            .await
            .map_err(|e| NotesError::store_with_source("Failed to update card", e))?;
        Ok(result.matched_count == 1)
    }

    async fn health_check(&self) -> NotesResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| NotesError::store_with_source("MongoDB ping failed", e))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}

/// Owner match that also covers documents written with `userId`.
fn owner_filter(owner: &str) -> Document {
    doc! { "$or": [{ "owner": owner }, { "userId": owner }] }
}

/// Documents written before versioning have no `version` field.
fn version_filter(expected: u64) -> Document {
    let expected = expected as i64;
    if expected == 0 {
        doc! { "$or": [{ "version": 0_i64 }, { "version": { "$exists": false } }] }
    } else {
        doc! { "version": expected }
    }
}

/// Topic ids may be stored as strings or ObjectIds.
fn topic_filter(topic_id: &str) -> Document {
    match ObjectId::parse_str(topic_id) {
        Ok(oid) => doc! { "topicId": { "$in": [topic_id, oid] } },
        Err(_) => doc! { "topicId": topic_id },
    }
}

fn build_filter(query: &CardQuery) -> Document {
    let mut conditions = vec![owner_filter(&query.owner), doc! { "isActive": { "$ne": false } }];

    if let Some(ref topic_id) = query.topic_id {
        conditions.push(topic_filter(topic_id));
    }
    if let Some(due_at) = query.due_at {
        conditions.push(doc! {
            "repetitionData.nextReview": { "$lte": bson::DateTime::from_chrono(due_at) }
        });
    }
    if let Some(min) = query.min_repetitions {
        conditions.push(doc! { "repetitionData.repetitions": { "$gte": i64::from(min) } });
    }

    doc! { "$and": conditions }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepetitionData {
    ease_factor: f64,
    #[serde(deserialize_with = "lenient_u32")]
    interval: u32,
    #[serde(deserialize_with = "lenient_u32")]
    repetitions: u32,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    next_review: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceDocument {
    #[serde(
        default,
        deserialize_with = "optional_id_string",
        skip_serializing_if = "Option::is_none"
    )]
    note_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    excerpt: Option<String>,
}

/// Persisted shape of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(alias = "userId")]
    owner: String,
    #[serde(deserialize_with = "id_string")]
    topic_id: String,
    question: String,
    answer: String,
    #[serde(default, deserialize_with = "lenient_difficulty")]
    difficulty: Difficulty,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<SourceDocument>,
    #[serde(default = "default_active")]
    is_active: bool,
    repetition_data: RepetitionData,
    #[serde(default)]
    version: i64,
    #[serde(
        default = "epoch",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    created_at: DateTime<Utc>,
    #[serde(
        default = "epoch",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

impl CardDocument {
    fn from_card(card: &Card) -> NotesResult<Self> {
        let id = ObjectId::parse_str(&card.id).map_err(|_| {
            NotesError::invalid_input(format!("'{}' is not a valid card id", card.id))
        })?;
        let version = i64::try_from(card.version)
            .map_err(|_| NotesError::Internal(format!("Card '{}' version overflow", card.id)))?;

        Ok(Self {
            id,
            owner: card.owner.clone(),
            topic_id: card.topic_id.clone(),
            question: card.question.clone(),
            answer: card.answer.clone(),
            difficulty: card.difficulty,
            tags: card.tags.clone(),
            source: card.source.as_ref().map(|s| SourceDocument {
                note_id: s.note_id.clone(),
                excerpt: s.excerpt.clone(),
            }),
            is_active: card.is_active,
            repetition_data: RepetitionData {
                ease_factor: card.review.ease_factor,
                interval: card.review.interval,
                repetitions: card.review.repetitions,
                next_review: card.review.next_review,
            },
            version,
            created_at: card.created_at,
            updated_at: card.updated_at,
        })
    }

    fn into_card(self) -> Card {
        let created_at = self.created_at;
        Card {
            id: self.id.to_hex(),
            owner: self.owner,
            topic_id: self.topic_id,
            question: self.question,
            answer: self.answer,
            difficulty: self.difficulty,
            tags: self.tags,
            source: self.source.map(|s| CardSource {
                note_id: s.note_id,
                excerpt: s.excerpt,
            }),
            is_active: self.is_active,
            review: ReviewState {
                ease_factor: self.repetition_data.ease_factor,
                interval: self.repetition_data.interval.max(1),
                repetitions: self.repetition_data.repetitions,
                next_review: self.repetition_data.next_review,
            },
            version: self.version.max(0) as u64,
            created_at,
            updated_at: self.updated_at.max(created_at),
        }
    }
}

/// Accepts integers and doubles for counters.
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(D::Error::custom(format!("counter out of range: {}", value)));
    }
    Ok(value.round() as u32)
}

fn lenient_difficulty<'de, D>(deserializer: D) -> Result<Difficulty, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|d| d.parse().ok()).unwrap_or_default())
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Bson::deserialize(deserializer)? {
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        Bson::String(s) => Ok(s),
        other => Err(D::Error::custom(format!("expected an id, found {}", other))),
    }
}

fn optional_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Bson::deserialize(deserializer)? {
        Bson::Null => Ok(None),
        Bson::ObjectId(oid) => Ok(Some(oid.to_hex())),
        Bson::String(s) => Ok(Some(s)),
        other => Err(D::Error::custom(format!("expected an id, found {}", other))),
    }
}
