//! smartnotes-core - Core library for smartnotes.
//!
//! Card types, the SM-2 review scheduler, the owner-scoped review service and
//! the collaborator traits (card store, language model) it is built on.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use smartnotes_core::{InMemoryCardStore, ReviewConfig, ReviewService, SystemClock};
//!
//! let service = ReviewService::new(
//!     Arc::new(InMemoryCardStore::new()),
//!     Arc::new(SystemClock),
//!     ReviewConfig::default(),
//! );
//!
//! let outcome = service.review_card("alice", &card_id, 4).await?;
//! let due = service.list_due("alice", None, None).await?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod generation;
pub mod review;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, AuthConfig, ReviewConfig, ServerConfig, StoreConfig, StoreProvider};
pub use error::{ErrorCode, NotesError, NotesResult};
pub use generation::{CardGenerator, GenerationRequest, SourceNote};
pub use review::{next_review_state, ReviewOutcome, ReviewScheduler, ReviewService};
pub use store::InMemoryCardStore;
pub use traits::{
    CardQuery, CardStore, GenerationOptions, Llm, LlmConfig, LlmProvider, LlmResponse,
};
pub use types::{
    Card, CardDraft, CardSource, CardStats, Difficulty, Message, MessageRole, NewCard, Quality,
    ReviewState,
};
