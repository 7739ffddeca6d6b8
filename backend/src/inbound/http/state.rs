//! Shared HTTP adapter state.
//!
//! Handlers accept this bundle via `actix_web::web::Data` so they depend
//! only on domain ports and remain testable without real adapters.

use std::sync::Arc;

use crate::domain::ports::{CommunityCommand, CommunityQuery, TokenService, UserDirectory};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub communities: Arc<dyn CommunityCommand>,
    pub communities_query: Arc<dyn CommunityQuery>,
    pub tokens: Arc<dyn TokenService>,
    pub directory: Arc<dyn UserDirectory>,
}

impl HttpState {
    /// Construct state from the port implementations.
    pub fn new(
        communities: Arc<dyn CommunityCommand>,
        communities_query: Arc<dyn CommunityQuery>,
        tokens: Arc<dyn TokenService>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            communities,
            communities_query,
            tokens,
            directory,
        }
    }
}
