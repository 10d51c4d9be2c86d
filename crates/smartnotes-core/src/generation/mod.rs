//! AI-assisted flashcard generation.

mod generator;
pub mod json_parser;

pub use generator::{CardGenerator, GenerationRequest, SourceNote};
