//! Factory for creating LLM providers.

use std::sync::Arc;

use smartnotes_core::error::{NotesError, NotesResult};
use smartnotes_core::traits::{Llm, LlmConfig, LlmProvider};

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    ///
    /// Fails immediately when credentials are missing.
    pub fn create(config: LlmConfig) -> NotesResult<Arc<dyn Llm>> {
        match config.provider {
            #[cfg(feature = "gemini")]
            LlmProvider::Gemini => {
                let llm = crate::gemini::GeminiLlm::new(config)?;
                Ok(Arc::new(llm))
            }

            #[allow(unreachable_patterns)]
            other => Err(NotesError::Configuration(format!(
                "LLM provider {:?} is not enabled. Enable the corresponding feature flag.",
                other
            ))),
        }
    }

    /// Create a Gemini provider with default configuration.
    pub fn gemini() -> NotesResult<Arc<dyn Llm>> {
        Self::create(LlmConfig::default())
    }

    /// Create a Gemini provider with a specific model.
    pub fn gemini_with_model(model: impl Into<String>) -> NotesResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(config)
    }
}
