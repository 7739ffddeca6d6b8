//! HTTP inbound adapter exposing the REST surface.

pub mod admin;
pub mod communities;
pub mod error;
pub mod health;
pub mod identity;
pub mod state;

pub use error::ApiResult;
