//! smartnotes-llm - Generative model providers for smartnotes.
//!
//! # Supported Providers
//!
//! - **Gemini** (feature: `gemini`) - Google generative language API
//!
//! # Example
//!
//! ```ignore
//! use smartnotes_llm::LlmFactory;
//!
//! // Reads GEMINI_API_KEY when the config carries no key
//! let llm = LlmFactory::gemini()?;
//!
//! // Or with a specific model
//! let llm = LlmFactory::gemini_with_model("gemini-1.5-pro")?;
//! ```

mod factory;

#[cfg(feature = "gemini")]
mod gemini;

pub use factory::LlmFactory;

#[cfg(feature = "gemini")]
pub use gemini::GeminiLlm;

// Re-export core types for convenience
pub use smartnotes_core::traits::{
    GenerationOptions, Llm, LlmConfig, LlmProvider, LlmResponse, ResponseFormat,
};
