//! In-memory ledger store
//!
//! Each account row sits behind its own `tokio::sync::Mutex`; holding the
//! owned guard is the row lock. Writes are staged on the transaction and
//! copied into the guards on commit, so a rollback (or a dropped tx) leaves
//! every row untouched.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::StoreError;
use super::store::{LedgerStore, LedgerTx};
use super::types::{Account, AccountId, AccountStatus, AppliedTransfer};

struct Inner {
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,
    applied: DashMap<String, AppliedTransfer>,
    lock_timeout: Duration,
}

/// Process-local store used when no database is configured, and by tests
#[derive(Clone)]
pub struct MemoryLedgerStore {
    inner: Arc<Inner>,
}

impl MemoryLedgerStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                accounts: DashMap::new(),
                applied: DashMap::new(),
                lock_timeout,
            }),
        }
    }

    fn row(&self, id: AccountId) -> Option<Arc<Mutex<Account>>> {
        self.inner.accounts.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Flip an account's status. Waits for any in-flight transfer on the row.
    pub async fn set_status(&self, id: AccountId, status: AccountStatus) -> bool {
        match self.row(id) {
            Some(row) => {
                let mut account = row.lock().await;
                account.status = status;
                account.updated_at = chrono::Utc::now();
                true
            }
            None => false,
        }
    }

    /// Sum of all balances; used to check conservation
    pub async fn total_balance(&self) -> i128 {
        let rows: Vec<_> = self
            .inner
            .accounts
            .iter()
            .map(|r| Arc::clone(r.value()))
            .collect();
        let mut total = 0i128;
        for row in rows {
            total += row.lock().await.balance as i128;
        }
        total
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        Ok(Box::new(MemoryLedgerTx {
            store: self.clone(),
            held: Vec::new(),
            staged: Vec::new(),
            staged_applied: None,
            finished: false,
        }))
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        match self.inner.accounts.entry(account.id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(account.clone())));
                Ok(())
            }
        }
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        match self.row(id) {
            Some(row) => Ok(Some(row.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn get_applied(&self, key: &str) -> Result<Option<AppliedTransfer>, StoreError> {
        Ok(self.inner.applied.get(key).map(|r| r.value().clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub struct MemoryLedgerTx {
    store: MemoryLedgerStore,
    held: Vec<OwnedMutexGuard<Account>>,
    staged: Vec<Account>,
    staged_applied: Option<AppliedTransfer>,
    finished: bool,
}

impl MemoryLedgerTx {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.finished {
            Err(StoreError::Finished)
        } else {
            Ok(())
        }
    }

    fn release(&mut self) {
        self.staged.clear();
        self.staged_applied = None;
        self.held.clear();
        self.finished = true;
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.ensure_open()?;
        if let Some(guard) = self.held.iter().find(|g| g.id == id) {
            return Ok(Some((**guard).clone()));
        }

        let Some(row) = self.store.row(id) else {
            return Ok(None);
        };
        let guard = tokio::time::timeout(self.store.inner.lock_timeout, row.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout(id))?;
        let account = (*guard).clone();
        self.held.push(guard);
        Ok(Some(account))
    }

    async fn find_applied(&mut self, key: &str) -> Result<Option<AppliedTransfer>, StoreError> {
        self.ensure_open()?;
        if let Some(staged) = self.staged_applied.as_ref().filter(|a| a.idempotency_key == key) {
            return Ok(Some(staged.clone()));
        }
        self.store.get_applied(key).await
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError> {
        self.ensure_open()?;
        if !self.held.iter().any(|g| g.id == account.id) {
            return Err(StoreError::Corrupt(format!(
                "account {} saved without holding its lock",
                account.id
            )));
        }
        self.staged.retain(|a| a.id != account.id);
        self.staged.push(account.clone());
        Ok(())
    }

    async fn record_applied(&mut self, applied: &AppliedTransfer) -> Result<(), StoreError> {
        self.ensure_open()?;
        if self.store.inner.applied.contains_key(&applied.idempotency_key) {
            return Err(StoreError::AlreadyExists);
        }
        self.staged_applied = Some(applied.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;

        // The dedupe row is claimed first; losing that race must not touch balances.
        if let Some(applied) = self.staged_applied.take() {
            let claimed = match self.store.inner.applied.entry(applied.idempotency_key.clone()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(applied);
                    true
                }
            };
            if !claimed {
                self.release();
                return Err(StoreError::AlreadyExists);
            }
        }

        for account in self.staged.drain(..) {
            if let Some(guard) = self.held.iter_mut().find(|g| g.id == account.id) {
                **guard = account;
            }
        }
        self.release();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.release();
        Ok(())
    }
}
