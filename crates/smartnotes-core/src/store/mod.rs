//! Built-in card store implementations.

mod memory;

pub use memory::InMemoryCardStore;
