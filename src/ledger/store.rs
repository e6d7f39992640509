//! Ledger store seam
//!
//! The executor only needs row locks with a bounded wait and atomic
//! commit/rollback; everything else about the backing store is hidden here.

use async_trait::async_trait;

use super::error::StoreError;
use super::types::{Account, AccountId, AppliedTransfer};

/// Persistent home of account rows
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a local transaction. Locks taken through it are held until
    /// `commit` or `rollback`.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;

    /// Insert a new account row. `AlreadyExists` if the id is taken.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Unlocked read of the latest committed row
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Committed applied-transfer record for an idempotency key
    async fn get_applied(&self, key: &str) -> Result<Option<AppliedTransfer>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// One local ledger transaction
#[async_trait]
pub trait LedgerTx: Send {
    /// Exclusive row lock with bounded wait. `Ok(None)` if the row does not
    /// exist, `Err(StoreError::LockTimeout)` if the wait expired.
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Applied-transfer lookup inside this transaction
    async fn find_applied(&mut self, key: &str) -> Result<Option<AppliedTransfer>, StoreError>;

    /// Stage a write of a locked row
    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError>;

    async fn record_applied(&mut self, applied: &AppliedTransfer) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}
