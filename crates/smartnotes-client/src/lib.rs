//! smartnotes-client - Client library for the smartnotes flashcard API.
//!
//! # Example
//!
//! ```ignore
//! use smartnotes_client::StudyClient;
//!
//! let client = StudyClient::new("http://localhost:5000", "alice-token")?;
//!
//! let due = client.due_cards(None, Some(20)).await?;
//! for card in &due {
//!     let outcome = client.review(&card.id, 4).await?;
//!     println!("next review at {}", outcome.next_review);
//! }
//! ```

mod client;

pub use client::StudyClient;
pub use smartnotes_core::review::{IntervalPreview, ReviewOutcome};
pub use smartnotes_core::types::{Card, CardDraft, CardStats, Difficulty};
