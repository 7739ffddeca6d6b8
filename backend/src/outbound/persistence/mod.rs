//! Persistence adapters for the community store and user directory ports.

pub mod memory;

pub use memory::{InMemoryCommunityStore, InMemoryUserDirectory};
