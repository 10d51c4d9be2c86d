//! Core traits for smartnotes collaborators.

mod card_store;
mod llm;

pub use card_store::*;
pub use llm::*;
