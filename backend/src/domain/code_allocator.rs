//! Collision-free invite-code allocation.
//!
//! Draws uniform four-digit codes and checks them against the community
//! store. The bounded attempt count guards against a degenerate code space;
//! with ~9000 values it is not expected to trip in practice, but callers
//! must treat exhaustion as a capacity failure rather than a panic. The
//! store's unique-code constraint remains the authority: a concurrent
//! allocation of the same code surfaces at insert time as a retryable
//! conflict, not here.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::domain::InviteCode;
use crate::domain::ports::{CommunityRepository, CommunityRepositoryError};

/// Upper bound on random draws before giving up.
pub const MAX_ATTEMPTS: u32 = 100;

/// Failures raised while allocating an invite code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// No free code found within [`MAX_ATTEMPTS`] draws.
    #[error("Unable to generate unique community code")]
    Exhausted,
    /// The existence check failed at the store.
    #[error(transparent)]
    Store(#[from] CommunityRepositoryError),
}

/// Allocates invite codes not currently assigned to any community.
#[derive(Debug, Clone, Copy)]
pub struct CodeAllocator {
    attempts: u32,
}

impl Default for CodeAllocator {
    fn default() -> Self {
        Self {
            attempts: MAX_ATTEMPTS,
        }
    }
}

impl CodeAllocator {
    /// Allocator with a custom attempt bound; tests shrink it to force
    /// exhaustion quickly.
    pub fn with_attempts(attempts: u32) -> Self {
        Self { attempts }
    }

    /// Draw codes until one is unassigned among active and inactive
    /// communities, or the attempt bound is hit.
    pub async fn allocate<R>(&self, store: &R) -> Result<InviteCode, AllocationError>
    where
        R: CommunityRepository + ?Sized,
    {
        let mut rng = SmallRng::from_entropy();
        for _ in 0..self.attempts {
            let code = InviteCode::from_number(rng.gen_range(1000..=9999));
            if !store.code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(AllocationError::Exhausted)
    }
}
