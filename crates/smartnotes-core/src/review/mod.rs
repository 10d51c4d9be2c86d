//! Spaced-repetition review.

mod scheduler;
mod service;

pub use scheduler::{ease_delta, next_review_state, IntervalPreview, ReviewScheduler};
pub use service::{ReviewOutcome, ReviewService};
