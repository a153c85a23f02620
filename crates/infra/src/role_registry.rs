//! Role Registry: live account list with locally staged role changes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

use bazaar_auth::{Account, Action, Actor, AuthzError, Role, authorize};
use bazaar_core::AccountId;
use bazaar_events::{Generation, Subscription};

use crate::account_store::{AccountFeedMessage, AccountStore};
use crate::busy::InFlight;
use crate::catalog_store::StoreError;

/// An account as shown to an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRow {
    pub account: Account,
    /// Staged, not yet submitted role.
    pub pending_role: Option<Role>,
    /// A submission for this account is in flight.
    pub saving: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleChangeError {
    #[error(transparent)]
    Unauthorized(#[from] AuthzError),

    #[error("no pending role change for account {0}")]
    NoPendingChange(AccountId),

    #[error("a role change for account {0} is already in progress")]
    InProgress(AccountId),

    #[error("account {0} not found")]
    NotFound(AccountId),

    #[error("store error: {0}")]
    Store(String),
}

#[derive(Debug, Default)]
struct AccountTable {
    generation: Generation,
    accounts: Vec<Account>,
    error: Option<String>,
}

impl AccountTable {
    fn apply(&mut self, generation: Generation, message: AccountFeedMessage) -> bool {
        if generation != self.generation {
            return false;
        }
        match message {
            Ok(accounts) => {
                self.accounts = accounts;
                self.error = None;
            }
            Err(err) => {
                tracing::warn!(%generation, error = %err, "account feed error");
                self.error = Some(err.to_string());
            }
        }
        true
    }

    fn replace(&mut self, account: Account) {
        match self.accounts.iter_mut().find(|a| a.id == account.id) {
            Some(row) => *row = account,
            None => self.accounts.push(account),
        }
    }
}

type SharedTable = Arc<Mutex<AccountTable>>;

/// Live view over all accounts plus per-account staged role edits.
///
/// Staged edits live apart from the authoritative table; they only reach the
/// store through [`submit_role_change`](Self::submit_role_change).
pub struct RoleRegistry<A> {
    store: Arc<A>,
    table: SharedTable,
    pending: Mutex<HashMap<AccountId, Role>>,
    in_flight: InFlight<AccountId>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl<A> RoleRegistry<A>
where
    A: AccountStore + 'static,
{
    pub fn new(store: Arc<A>) -> Self {
        Self {
            store,
            table: SharedTable::default(),
            pending: Mutex::new(HashMap::new()),
            in_flight: InFlight::new(),
            pump: Mutex::new(None),
        }
    }

    /// Subscribe to the account feed and wait for the first snapshot.
    ///
    /// Calling it again replaces the current subscription.
    pub async fn start(&self) -> Result<(), StoreError> {
        let generation = {
            let mut table = lock(&self.table);
            table.generation = table.generation.next();
            table.generation
        };
        if let Some(old) = lock(&self.pump).take() {
            old.abort();
        }

        let mut subscription = match self.store.subscribe_accounts().await {
            Ok(subscription) => subscription,
            Err(err) => {
                lock(&self.table).apply(generation, Err(err.clone()));
                return Err(err);
            }
        };
        let first = subscription
            .recv()
            .await
            .unwrap_or_else(|| Err(StoreError::Unavailable("account feed closed".to_string())));
        let failure = first.as_ref().err().cloned();
        lock(&self.table).apply(generation, first);
        if let Some(err) = failure {
            return Err(err);
        }

        tracing::info!(%generation, "account feed subscribed");
        let handle = tokio::spawn(pump(subscription, generation, Arc::clone(&self.table)));
        if let Some(old) = lock(&self.pump).replace(handle) {
            old.abort();
        }
        Ok(())
    }

    /// Stop listening to the account feed. Idempotent.
    pub fn stop(&self) {
        {
            let mut table = lock(&self.table);
            table.generation = table.generation.next();
        }
        if let Some(handle) = lock(&self.pump).take() {
            handle.abort();
        }
    }

    /// Stage `role` for `account_id`. Replaces any earlier staged role.
    pub fn propose_role_change(&self, account_id: &AccountId, role: Role) -> Result<(), RoleChangeError> {
        if !self.knows(account_id) {
            return Err(RoleChangeError::NotFound(account_id.clone()));
        }
        lock(&self.pending).insert(account_id.clone(), role);
        Ok(())
    }

    /// Drop the staged role, returning it.
    pub fn cancel_role_change(&self, account_id: &AccountId) -> Option<Role> {
        lock(&self.pending).remove(account_id)
    }

    pub fn pending_role(&self, account_id: &AccountId) -> Option<Role> {
        lock(&self.pending).get(account_id).copied()
    }

    /// Persist the staged role of `account_id`. Main-admin only.
    ///
    /// On success the staged edit is cleared and the local row reflects the
    /// stored account. On failure the staged edit is kept.
    pub async fn submit_role_change(
        &self,
        actor: &Actor,
        account_id: &AccountId,
    ) -> Result<Account, RoleChangeError> {
        authorize(actor, Action::ChangeRole, None)?;

        let role = self
            .pending_role(account_id)
            .ok_or_else(|| RoleChangeError::NoPendingChange(account_id.clone()))?;

        let Some(_guard) = self.in_flight.try_acquire(account_id.clone()) else {
            return Err(RoleChangeError::InProgress(account_id.clone()));
        };

        match self.store.update_role(account_id, role).await {
            Ok(account) => {
                {
                    let mut pending = lock(&self.pending);
                    // Keep a newer proposal staged while this one was saving.
                    if pending.get(account_id) == Some(&role) {
                        pending.remove(account_id);
                    }
                }
                lock(&self.table).replace(account.clone());
                tracing::info!(actor = %actor.email, account_id = %account_id, %role, "role changed");
                Ok(account)
            }
            Err(StoreError::NotFound) => Err(RoleChangeError::NotFound(account_id.clone())),
            Err(err) => {
                tracing::warn!(account_id = %account_id, %role, error = %err, "role change failed");
                Err(RoleChangeError::Store(err.to_string()))
            }
        }
    }

    /// Every known account with its staged edit and saving flag.
    pub fn accounts(&self) -> Vec<AccountRow> {
        let accounts = lock(&self.table).accounts.clone();
        accounts.into_iter().map(|a| self.row(a)).collect()
    }

    pub fn account(&self, account_id: &AccountId) -> Option<AccountRow> {
        let account = lock(&self.table)
            .accounts
            .iter()
            .find(|a| &a.id == account_id)
            .cloned()?;
        Some(self.row(account))
    }

    /// Last account feed error, cleared by the next good snapshot.
    pub fn feed_error(&self) -> Option<String> {
        lock(&self.table).error.clone()
    }

    fn knows(&self, account_id: &AccountId) -> bool {
        lock(&self.table).accounts.iter().any(|a| &a.id == account_id)
    }

    fn row(&self, account: Account) -> AccountRow {
        AccountRow {
            pending_role: self.pending_role(&account.id),
            saving: self.in_flight.is_busy(&account.id),
            account,
        }
    }
}

impl<A> Drop for RoleRegistry<A> {
    fn drop(&mut self) {
        let pump = self.pump.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = pump.take() {
            handle.abort();
        }
    }
}

async fn pump(mut subscription: Subscription<AccountFeedMessage>, generation: Generation, table: SharedTable) {
    while let Some(message) = subscription.recv().await {
        if !lock(&table).apply(generation, message) {
            break;
        }
    }
    subscription.close();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
