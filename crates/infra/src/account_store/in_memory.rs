use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use bazaar_auth::{Account, Role};
use bazaar_core::AccountId;
use bazaar_events::{EventBus, InMemoryEventBus, Subscription};

use super::r#trait::{AccountFeedMessage, AccountStore};
use crate::catalog_store::StoreError;

/// In-memory account store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
    feed: InMemoryEventBus<AccountFeedMessage>,
    offline: AtomicBool,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, account: Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().map_err(|_| StoreError::Poisoned)?;
        accounts.insert(account.id.clone(), account);
        self.publish(&accounts);
        Ok(())
    }

    pub fn stored(&self, id: &AccountId) -> Option<Account> {
        self.accounts.read().ok()?.get(id).cloned()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn emit_feed_error(&self, message: impl Into<String>) {
        let _ = self.feed.publish(Err(StoreError::Unavailable(message.into())));
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("account store offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn snapshot(accounts: &HashMap<AccountId, Account>) -> Vec<Account> {
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by(|a, b| a.email.cmp(&b.email).then_with(|| a.id.cmp(&b.id)));
        all
    }

    fn publish(&self, accounts: &HashMap<AccountId, Account>) {
        if let Err(err) = self.feed.publish(Ok(Self::snapshot(accounts))) {
            tracing::warn!(error = ?err, "failed to publish account snapshot");
        }
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn subscribe_accounts(&self) -> Result<Subscription<AccountFeedMessage>, StoreError> {
        self.ensure_online()?;
        let accounts = self.accounts.read().map_err(|_| StoreError::Poisoned)?;
        Ok(self.feed.subscribe_with_initial(Ok(Self::snapshot(&accounts))))
    }

    async fn update_role(&self, id: &AccountId, role: Role) -> Result<Account, StoreError> {
        self.ensure_online()?;
        let mut accounts = self.accounts.write().map_err(|_| StoreError::Poisoned)?;
        let account = accounts.get_mut(id).ok_or(StoreError::NotFound)?;
        account.role = role;
        let updated = account.clone();
        self.publish(&accounts);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn role_update_is_published() {
        let store = InMemoryAccountStore::new();
        store
            .seed(Account::new("u1", "bo@example.com", Role::User))
            .unwrap();
        store
            .seed(Account::new("u2", "al@example.com", Role::MainAdmin))
            .unwrap();

        let mut sub = store.subscribe_accounts().await.unwrap();
        let initial = sub.recv().await.unwrap().unwrap();
        let emails: Vec<&str> = initial.iter().map(|a| a.email.as_str()).collect();
        assert_eq!(emails, vec!["al@example.com", "bo@example.com"]);

        let updated = store
            .update_role(&AccountId::new("u1"), Role::LocalSemiAdmin)
            .await
            .unwrap();
        assert_eq!(updated.role, Role::LocalSemiAdmin);

        let next = sub.recv().await.unwrap().unwrap();
        assert!(next.iter().any(|a| a.id.as_str() == "u1" && a.role == Role::LocalSemiAdmin));
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let store = InMemoryAccountStore::new();
        let err = store
            .update_role(&AccountId::new("ghost"), Role::User)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn offline_store_rejects_writes() {
        let store = InMemoryAccountStore::new();
        store.seed(Account::new("u1", "a@example.com", Role::User)).unwrap();
        store.set_offline(true);

        let err = store
            .update_role(&AccountId::new("u1"), Role::MainAdmin)
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.stored(&AccountId::new("u1")).unwrap().role, Role::User);
    }
}
