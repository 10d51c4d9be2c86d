//! SM-2 review scheduling.

use std::sync::Arc;

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::{NotesError, NotesResult};
use crate::types::{Quality, ReviewState, MIN_EASE_FACTOR};

/// Interval after the first successful review.
const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval after the second successful review.
const SECOND_INTERVAL_DAYS: u32 = 6;

/// Ease factor change for a rating.
pub fn ease_delta(quality: Quality) -> f64 {
    let miss = f64::from(5 - quality.value());
    0.1 - miss * (0.08 + miss * 0.02)
}

/// Compute the state that follows `state` when it is reviewed with `quality` at `now`.
///
/// Intervals grow as `round(interval * ease)` with halves rounded away from zero.
pub fn next_review_state(
    state: &ReviewState,
    quality: Quality,
    now: DateTime<Utc>,
) -> NotesResult<ReviewState> {
    let ease_factor = (state.ease_factor + ease_delta(quality)).max(MIN_EASE_FACTOR);

    let (interval, repetitions) = if quality.is_success() {
        let interval = match state.repetitions {
            0 => FIRST_INTERVAL_DAYS,
            1 => SECOND_INTERVAL_DAYS,
            _ => grow_interval(state.interval, ease_factor)?,
        };
        (interval, state.repetitions.saturating_add(1))
    } else {
        (FIRST_INTERVAL_DAYS, 0)
    };

    let next_review = now
        .checked_add_days(Days::new(u64::from(interval)))
        .ok_or_else(|| {
            NotesError::out_of_range("interval", format!("{} days overflows the calendar", interval))
        })?;

    Ok(ReviewState {
        ease_factor,
        interval,
        repetitions,
        next_review,
    })
}

fn grow_interval(interval: u32, ease_factor: f64) -> NotesResult<u32> {
    let grown = (f64::from(interval.max(1)) * ease_factor).round();
    if grown > f64::from(u32::MAX) {
        return Err(NotesError::out_of_range(
            "interval",
            format!("interval {} cannot grow further", interval),
        ));
    }
    Ok((grown as u32).max(1))
}

/// Interval a card would get for one rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalPreview {
    pub quality: u8,
    pub interval: u32,
    pub ease_factor: f64,
}

/// Scheduler bound to a clock.
#[derive(Clone)]
pub struct ReviewScheduler {
    clock: Arc<dyn Clock>,
}

impl Default for ReviewScheduler {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for ReviewScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewScheduler").finish_non_exhaustive()
    }
}

impl ReviewScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Schedule a review happening now.
    pub fn schedule(&self, state: &ReviewState, quality: Quality) -> NotesResult<ReviewState> {
        next_review_state(state, quality, self.clock.now())
    }

    /// Outcome of every possible rating, lowest first.
    pub fn preview(&self, state: &ReviewState) -> NotesResult<Vec<IntervalPreview>> {
        let now = self.clock.now();
        Quality::all()
            .map(|quality| {
                next_review_state(state, quality, now).map(|next| IntervalPreview {
                    quality: quality.value(),
                    interval: next.interval,
                    ease_factor: next.ease_factor,
                })
            })
            .collect()
    }
}
