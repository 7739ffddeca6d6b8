//! Outbound adapters implementing the domain ports against concrete
//! technologies.

pub mod persistence;
pub mod token;

pub use persistence::{InMemoryCommunityStore, InMemoryUserDirectory};
pub use token::JwtTokenService;
