//! Route definitions for the REST API.

mod flashcards;
mod health;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Create the main application router.
///
/// Everything except the health check requires a bearer token.
pub fn create_router(state: AppState) -> Router {
    let flashcards = Router::new()
        .route(
            "/api/flashcards",
            post(flashcards::create_cards).get(flashcards::list_cards),
        )
        .route("/api/flashcards/generate", post(flashcards::generate_cards))
        .route("/api/flashcards/due", get(flashcards::list_due))
        .route("/api/flashcards/stats", get(flashcards::stats))
        .route(
            "/api/flashcards/:id",
            get(flashcards::get_card).delete(flashcards::deactivate_card),
        )
        .route("/api/flashcards/:id/preview", get(flashcards::preview_card))
        .route("/api/flashcards/:id/review", post(flashcards::review_card))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        // Health check
        .route("/api/health", get(health::health_check))
        .merge(flashcards)
        // Attach state
        .with_state(state)
}

pub use flashcards::*;
pub use health::*;
