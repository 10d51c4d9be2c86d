//! Factory for building the review service from configuration.

use std::sync::Arc;

use smartnotes_core::clock::SystemClock;
use smartnotes_core::config::AppConfig;
use smartnotes_core::error::NotesResult;
use smartnotes_core::generation::CardGenerator;
use smartnotes_core::review::ReviewService;
use smartnotes_llm::LlmFactory;
use smartnotes_stores::CardStoreFactory;
use tracing::info;

use crate::state::AppState;

/// Create a review service from configuration.
///
/// Store and model construction errors are returned here, before the server
/// starts listening.
pub async fn create_service(config: &AppConfig) -> NotesResult<ReviewService> {
    let store = CardStoreFactory::create(&config.store).await?;
    let mut service = ReviewService::new(store, Arc::new(SystemClock), config.review.clone());

    match config.llm {
        Some(ref llm_config) => {
            let llm = LlmFactory::create(llm_config.clone())?;
            info!(model = %llm.model_name(), "Flashcard generation enabled");
            service = service.with_generator(CardGenerator::new(llm));
        }
        None => info!("Flashcard generation disabled (no LLM configured)"),
    }

    Ok(service)
}

/// Create the full application state from configuration.
pub async fn create_state(config: &AppConfig) -> NotesResult<AppState> {
    config.validate()?;
    let service = create_service(config).await?;
    Ok(AppState::new(service, config.auth.clone()))
}
