//! Transaction store seam

use async_trait::async_trait;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::state::TransactionStatus;
use super::types::{TransactionId, TransactionRecord};
use crate::db::StoreError;
use crate::ledger::AccountId;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert a new record. `AlreadyExists` if the id is taken.
    async fn create(&self, record: &TransactionRecord) -> Result<(), StoreError>;

    async fn get(&self, id: TransactionId) -> Result<Option<TransactionRecord>, StoreError>;

    /// Compare-and-set from `pending` to a terminal status.
    ///
    /// Returns false if the record is not pending any more (another writer
    /// finalized it first) or does not exist.
    async fn finalize(
        &self,
        id: TransactionId,
        status: TransactionStatus,
        description: &str,
    ) -> Result<bool, StoreError>;

    /// Records naming the account on either side, newest first
    async fn list_by_account(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// `pending` records not touched for at least `threshold`, oldest first
    async fn find_stale_pending(
        &self,
        threshold: Duration,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Push a `pending` record's `updated_at` to now so stale scans move on
    /// to other records. False if it is not pending.
    async fn touch_pending(&self, id: TransactionId) -> Result<bool, StoreError>;

    /// Terminal records in `(updated_at, id)` order, starting at `since`.
    ///
    /// With `after` set, only records strictly past `(since, after)` are
    /// returned, so a caller can page from the last record it saw.
    async fn list_terminal_since(
        &self,
        since: DateTime<Utc>,
        after: Option<TransactionId>,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
