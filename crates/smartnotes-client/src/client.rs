//! Study client for the smartnotes REST API.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use smartnotes_core::error::{NotesError, NotesResult};
use smartnotes_core::generation::SourceNote;
use smartnotes_core::review::{IntervalPreview, ReviewOutcome};
use smartnotes_core::types::{Card, CardDraft, CardStats, Difficulty};

const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Client for one owner's flashcards.
#[derive(Debug, Clone)]
pub struct StudyClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CardsResponse {
    flashcards: Vec<Card>,
}

#[derive(Debug, Deserialize)]
struct CardResponse {
    flashcard: Card,
}

#[derive(Debug, Deserialize)]
struct PreviewResponse {
    intervals: Vec<IntervalPreview>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    topic_id: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    due: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl StudyClient {
    /// Create a client for the server at `base_url`, authenticating with `token`.
    pub fn new(base_url: &str, token: &str) -> NotesResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| NotesError::Configuration(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if token.trim().is_empty() {
            return Err(NotesError::Configuration("API token is empty".to_string()));
        }

        Ok(Self {
            client: Client::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Create a client from `SMARTNOTES_URL` and `SMARTNOTES_TOKEN`.
    pub fn from_env() -> NotesResult<Self> {
        let token = std::env::var("SMARTNOTES_TOKEN")
            .map_err(|_| NotesError::Configuration("SMARTNOTES_TOKEN not set".to_string()))?;
        let base_url =
            std::env::var("SMARTNOTES_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Self::new(&base_url, &token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/flashcards{}", self.base_url, path)
    }

    /// URL of one card, with the id escaped as a single path segment.
    fn card_url(&self, card_id: &str, action: Option<&str>) -> NotesResult<Url> {
        let mut url = Url::parse(&self.url(""))
            .map_err(|e| NotesError::Configuration(format!("Invalid base URL: {}", e)))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                NotesError::Configuration(format!("Base URL '{}' cannot take a path", self.base_url))
            })?;
            segments.push(card_id);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    /// Record a review of a card with a 0-5 rating.
    pub async fn review(&self, card_id: &str, quality: u8) -> NotesResult<ReviewOutcome> {
        let response = self
            .client
            .post(self.card_url(card_id, Some("review"))?)
            .bearer_auth(&self.token)
            .json(&json!({ "quality": quality }))
            .send()
            .await
            .map_err(|e| transport("review card", e))?;

        decode(response).await
    }

    /// Cards due now, soonest first.
    pub async fn due_cards(
        &self,
        topic_id: Option<&str>,
        limit: Option<usize>,
    ) -> NotesResult<Vec<Card>> {
        let query = ListQuery {
            topic_id,
            due: false,
            limit,
        };
        let response = self
            .client
            .get(self.url("/due"))
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport("list due cards", e))?;

        decode::<CardsResponse>(response)
            .await
            .map(|r| r.flashcards)
    }

    /// Cards of the owner, optionally restricted to a topic or to due cards.
    pub async fn list_cards(
        &self,
        topic_id: Option<&str>,
        due_only: bool,
        limit: Option<usize>,
    ) -> NotesResult<Vec<Card>> {
        let query = ListQuery {
            topic_id,
            due: due_only,
            limit,
        };
        let response = self
            .client
            .get(self.url(""))
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport("list cards", e))?;

        decode::<CardsResponse>(response)
            .await
            .map(|r| r.flashcards)
    }

    pub async fn stats(&self) -> NotesResult<CardStats> {
        let response = self
            .client
            .get(self.url("/stats"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| transport("fetch stats", e))?;

        decode(response).await
    }

    /// Create cards under a topic.
    pub async fn create_cards(&self, topic_id: &str, cards: &[CardDraft]) -> NotesResult<Vec<Card>> {
        let response = self
            .client
            .post(self.url(""))
            .bearer_auth(&self.token)
            .json(&json!({ "topicId": topic_id, "cards": cards }))
            .send()
            .await
            .map_err(|e| transport("create cards", e))?;

        decode::<CardsResponse>(response)
            .await
            .map(|r| r.flashcards)
    }

    /// Ask the server to generate cards from notes.
    pub async fn generate_cards(
        &self,
        topic_id: &str,
        notes: &[SourceNote],
        count: Option<usize>,
        difficulty: Option<Difficulty>,
    ) -> NotesResult<Vec<Card>> {
        let mut body = json!({ "topicId": topic_id, "notes": notes });
        if let Some(count) = count {
            body["count"] = json!(count);
        }
        if let Some(difficulty) = difficulty {
            body["difficulty"] = json!(difficulty);
        }

        let response = self
            .client
            .post(self.url("/generate"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport("generate cards", e))?;

        decode::<CardsResponse>(response)
            .await
            .map(|r| r.flashcards)
    }

    pub async fn get_card(&self, card_id: &str) -> NotesResult<Card> {
        let response = self
            .client
            .get(self.card_url(card_id, None)?)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| transport("get card", e))?;

        decode::<CardResponse>(response).await.map(|r| r.flashcard)
    }

    /// Intervals each rating would produce for a card.
    pub async fn preview(&self, card_id: &str) -> NotesResult<Vec<IntervalPreview>> {
        let response = self
            .client
            .get(self.card_url(card_id, Some("preview"))?)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| transport("preview card", e))?;

        decode::<PreviewResponse>(response)
            .await
            .map(|r| r.intervals)
    }

    /// Hide a card from every listing.
    pub async fn deactivate(&self, card_id: &str) -> NotesResult<()> {
        let response = self
            .client
            .delete(self.card_url(card_id, None)?)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| transport("deactivate card", e))?;

        check(response).await.map(|_| ())
    }
}

fn transport(action: &str, err: reqwest::Error) -> NotesError {
    NotesError::store_with_source(format!("Failed to {}", action), err)
}

async fn check(response: Response) -> NotesResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    debug!(status = status.as_u16(), %message, "Request rejected");
    Err(NotesError::from_http_status(status.as_u16(), &message))
}

async fn decode<T: DeserializeOwned>(response: Response) -> NotesResult<T> {
    check(response)
        .await?
        .json()
        .await
        .map_err(|e| NotesError::parse(format!("Failed to parse response: {}", e)))
}
