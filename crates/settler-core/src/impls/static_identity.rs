//! StaticIdentityResolver - fixed user → account table for development.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{ExternalAccountId, UserId};
use crate::ports::{IdentityError, IdentityResolver};

#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    accounts: HashMap<UserId, ExternalAccountId>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(mut self, user: impl Into<UserId>, account: impl Into<ExternalAccountId>) -> Self {
        self.accounts.insert(user.into(), account.into());
        self
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve_external_account(
        &self,
        user: &UserId,
    ) -> Result<ExternalAccountId, IdentityError> {
        self.accounts
            .get(user)
            .cloned()
            .ok_or_else(|| IdentityError::NoLinkedAccount(user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_linked_users_only() {
        let resolver = StaticIdentityResolver::new().link("bob", "4100118177295897");

        let account = resolver
            .resolve_external_account(&UserId::new("bob"))
            .await
            .unwrap();
        assert_eq!(account.as_str(), "4100118177295897");

        let err = resolver
            .resolve_external_account(&UserId::new("carol"))
            .await
            .unwrap_err();
        assert_eq!(err, IdentityError::NoLinkedAccount(UserId::new("carol")));
    }
}
