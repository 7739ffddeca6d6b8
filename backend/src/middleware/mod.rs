//! Request middleware for cross-cutting concerns.

pub mod trace;

pub use trace::Trace;
