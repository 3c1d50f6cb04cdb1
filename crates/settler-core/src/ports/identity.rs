//! IdentityResolver port - maps users to their linked gateway accounts.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ExternalAccountId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("user {0} has no linked external account")]
    NoLinkedAccount(UserId),

    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_external_account(
        &self,
        user: &UserId,
    ) -> Result<ExternalAccountId, IdentityError>;
}
