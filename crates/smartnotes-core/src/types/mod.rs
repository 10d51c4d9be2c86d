//! Core types for smartnotes.

mod card;
mod message;
mod quality;
mod stats;

pub use card::*;
pub use message::*;
pub use quality::*;
pub use stats::*;
