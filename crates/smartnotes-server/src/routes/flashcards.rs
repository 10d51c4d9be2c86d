//! Flashcard endpoints.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use smartnotes_core::generation::SourceNote;
use smartnotes_core::review::{IntervalPreview, ReviewOutcome};
use smartnotes_core::types::{Card, CardDraft, CardSource, CardStats, Difficulty, Quality};

use crate::error::{ApiError, ApiResult};
use crate::extract::{Principal, ValidatedJson, Validate};
use crate::state::AppState;

/// Upper bound on cards accepted in one create request.
pub const MAX_CARDS_PER_REQUEST: usize = 100;

/// Cards generated when the request does not say.
pub const DEFAULT_GENERATED_CARDS: usize = 10;

/// One card in a create request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CardInput {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub source: Option<CardSource>,
}

impl From<CardInput> for CardDraft {
    fn from(input: CardInput) -> Self {
        CardDraft {
            question: input.question,
            answer: input.answer,
            difficulty: input.difficulty.unwrap_or_default(),
            tags: input.tags.unwrap_or_default(),
            source: input.source,
        }
    }
}

/// Request body for creating cards.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCardsRequest {
    pub topic_id: String,
    pub cards: Vec<CardInput>,
}

impl Validate for CreateCardsRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.topic_id.trim().is_empty() {
            return Err(ApiError::bad_request("'topicId' is required"));
        }
        if self.cards.is_empty() {
            return Err(ApiError::bad_request("'cards' must not be empty"));
        }
        if self.cards.len() > MAX_CARDS_PER_REQUEST {
            return Err(ApiError::bad_request(format!(
                "At most {} cards per request",
                MAX_CARDS_PER_REQUEST
            )));
        }
        Ok(())
    }
}

/// Request body for generating cards from notes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenerateCardsRequest {
    pub topic_id: String,
    pub notes: Vec<SourceNote>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl Validate for GenerateCardsRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.topic_id.trim().is_empty() {
            return Err(ApiError::bad_request("'topicId' is required"));
        }
        if self.notes.is_empty() {
            return Err(ApiError::bad_request(
                "No notes provided for flashcard generation",
            ));
        }
        Ok(())
    }
}

/// Request body for a review.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    pub quality: i64,
}

impl Validate for ReviewRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Quality::new(self.quality).map(|_| ()).map_err(ApiError::from)
    }
}

/// Query parameters for listing cards.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCardsQuery {
    pub topic_id: Option<String>,
    #[serde(default)]
    pub due: bool,
    pub limit: Option<usize>,
}

/// Query parameters for due cards.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCardsQuery {
    pub topic_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CardsResponse {
    pub flashcards: Vec<Card>,
    pub count: usize,
}

impl From<Vec<Card>> for CardsResponse {
    fn from(flashcards: Vec<Card>) -> Self {
        Self {
            count: flashcards.len(),
            flashcards,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateCardsResponse {
    pub flashcards: Vec<Card>,
    pub generated: usize,
}

#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub flashcard: Card,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub intervals: Vec<IntervalPreview>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Create cards.
/// POST /api/flashcards
pub async fn create_cards(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(request): ValidatedJson<CreateCardsRequest>,
) -> ApiResult<(StatusCode, Json<CardsResponse>)> {
    let drafts = request.cards.into_iter().map(CardDraft::from).collect();
    let cards = state
        .service
        .create_cards(&principal.owner, &request.topic_id, drafts)
        .await?;
    Ok((StatusCode::CREATED, Json(cards.into())))
}

/// Generate cards from notes.
/// POST /api/flashcards/generate
pub async fn generate_cards(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(request): ValidatedJson<GenerateCardsRequest>,
) -> ApiResult<(StatusCode, Json<GenerateCardsResponse>)> {
    let count = request.count.unwrap_or(DEFAULT_GENERATED_CARDS);
    let cards = state
        .service
        .generate_cards(
            &principal.owner,
            &request.topic_id,
            request.notes,
            count,
            request.difficulty,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateCardsResponse {
            generated: cards.len(),
            flashcards: cards,
        }),
    ))
}

/// List active cards.
/// GET /api/flashcards?topicId=&due=true&limit=
pub async fn list_cards(
    State(state): State<AppState>,
    principal: Principal,
    query: Result<Query<ListCardsQuery>, QueryRejection>,
) -> ApiResult<Json<CardsResponse>> {
    let Query(query) = query?;
    let cards = state
        .service
        .list_cards(&principal.owner, non_empty(query.topic_id), query.due, query.limit)
        .await?;
    Ok(Json(cards.into()))
}

/// Due cards, most overdue first.
/// GET /api/flashcards/due?topicId=&limit=
pub async fn list_due(
    State(state): State<AppState>,
    principal: Principal,
    query: Result<Query<DueCardsQuery>, QueryRejection>,
) -> ApiResult<Json<CardsResponse>> {
    let Query(query) = query?;
    let cards = state
        .service
        .list_due(&principal.owner, non_empty(query.topic_id), query.limit)
        .await?;
    Ok(Json(cards.into()))
}

/// Review statistics.
/// GET /api/flashcards/stats
pub async fn stats(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<Json<CardStats>> {
    Ok(Json(state.service.stats(&principal.owner).await?))
}

/// Get one card.
/// GET /api/flashcards/:id
pub async fn get_card(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<CardResponse>> {
    let flashcard = state.service.get_card(&principal.owner, &id).await?;
    Ok(Json(CardResponse { flashcard }))
}

/// Interval each rating would give.
/// GET /api/flashcards/:id/preview
pub async fn preview_card(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<PreviewResponse>> {
    let intervals = state.service.preview(&principal.owner, &id).await?;
    Ok(Json(PreviewResponse { intervals }))
}

/// Record a review.
/// POST /api/flashcards/:id/review
pub async fn review_card(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<ReviewRequest>,
) -> ApiResult<Json<ReviewOutcome>> {
    let outcome = state
        .service
        .review_card(&principal.owner, &id, request.quality)
        .await?;
    Ok(Json(outcome))
}

/// Soft-delete a card.
/// DELETE /api/flashcards/:id
pub async fn deactivate_card(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.deactivate_card(&principal.owner, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
