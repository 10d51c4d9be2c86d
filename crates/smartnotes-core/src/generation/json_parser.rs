//! JSON parsing utilities for model responses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{NotesError, NotesResult};
use crate::types::{CardDraft, Difficulty};

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap());

static FENCED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[a-zA-Z0-9]*\n?([\s\S]*?)\n?```$").unwrap());

static THINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// Extract JSON from a possibly fenced response.
pub fn extract_json(text: &str) -> String {
    let text = text.trim();
    CODE_BLOCK_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| text.to_string())
}

/// Remove a surrounding code fence and any `<think>` sections.
pub fn remove_code_blocks(content: &str) -> String {
    let content = content.trim();
    let content = FENCED_RE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(content);
    THINK_RE.replace_all(content, "").trim().to_string()
}

/// One flashcard as the model writes it. Every field is lenient.
#[derive(Debug, Deserialize)]
struct RawCard {
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Models sometimes wrap the array in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCards {
    List(Vec<RawCard>),
    Wrapped {
        #[serde(alias = "cards")]
        flashcards: Vec<RawCard>,
    },
}

/// Parse generated flashcards into drafts.
///
/// Cards missing a question or answer are dropped; an unknown difficulty
/// becomes `medium`.
pub fn parse_card_drafts(response: &str) -> NotesResult<Vec<CardDraft>> {
    let json_str = extract_json(&remove_code_blocks(response));
    if json_str.is_empty() {
        return Err(NotesError::parse("Model returned an empty response"));
    }

    let parsed: RawCards = serde_json::from_str(&json_str).map_err(|e| {
        NotesError::parse(format!("Failed to parse flashcards JSON: {}", e))
    })?;
    let raw = match parsed {
        RawCards::List(cards) => cards,
        RawCards::Wrapped { flashcards } => flashcards,
    };

    let drafts = raw
        .into_iter()
        .filter_map(|card| {
            let difficulty = card
                .difficulty
                .as_deref()
                .and_then(|d| d.trim().parse::<Difficulty>().ok())
                .unwrap_or_default();
            CardDraft::new(card.question, card.answer)
                .with_difficulty(difficulty)
                .with_tags(card.tags)
                .validate()
                .ok()
        })
        .collect();
    Ok(drafts)
}
