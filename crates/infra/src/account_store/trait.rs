use std::sync::Arc;

use async_trait::async_trait;

use bazaar_auth::{Account, Role};
use bazaar_core::AccountId;
use bazaar_events::Subscription;

use crate::catalog_store::StoreError;

/// One delivery of the account feed: every registered account, or an error.
pub type AccountFeedMessage = Result<Vec<Account>, StoreError>;

/// Registered accounts and their roles.
///
/// `subscribe_accounts` delivers the full account set first and a full
/// replacement after every change.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn subscribe_accounts(&self) -> Result<Subscription<AccountFeedMessage>, StoreError>;

    /// Persist a role. Returns the account as stored afterwards.
    async fn update_role(&self, id: &AccountId, role: Role) -> Result<Account, StoreError>;
}

#[async_trait]
impl<A> AccountStore for Arc<A>
where
    A: AccountStore + ?Sized,
{
    async fn subscribe_accounts(&self) -> Result<Subscription<AccountFeedMessage>, StoreError> {
        (**self).subscribe_accounts().await
    }

    async fn update_role(&self, id: &AccountId, role: Role) -> Result<Account, StoreError> {
        (**self).update_role(id, role).await
    }
}
