//! smartnotes-stores - Card store implementations for smartnotes.
//!
//! # Supported Backends
//!
//! - **Memory** (always available) - process-local, re-exported from core
//! - **MongoDB** (feature: `mongodb`) - document store compatible with the
//!   existing `flashcards` collection layout

mod factory;

#[cfg(feature = "mongodb")]
mod mongodb;

pub use factory::CardStoreFactory;
pub use smartnotes_core::store::InMemoryCardStore;

#[cfg(feature = "mongodb")]
pub use crate::mongodb::MongoCardStore;
