//! In-memory transaction store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::Duration;

use super::state::TransactionStatus;
use super::store::TransactionStore;
use super::types::{TransactionId, TransactionRecord};
use crate::db::StoreError;
use crate::ledger::AccountId;

#[derive(Default)]
pub struct MemoryTransactionStore {
    records: DashMap<TransactionId, TransactionRecord>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn collect_sorted(
        &self,
        filter: impl Fn(&TransactionRecord) -> bool,
    ) -> Vec<TransactionRecord> {
        let mut out: Vec<_> = self
            .records
            .iter()
            .filter(|r| filter(r.value()))
            .map(|r| r.value().clone())
            .collect();
        out.sort_by_key(|r| (r.updated_at, r.id));
        out
    }
}

pub(crate) fn stale_cutoff(threshold: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(threshold)
        .ok()
        .and_then(|d| Utc::now().checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn create(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        match self.records.entry(record.id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, id: TransactionId) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn finalize(
        &self,
        id: TransactionId,
        status: TransactionStatus,
        description: &str,
    ) -> Result<bool, StoreError> {
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(false);
        };
        if record.status != TransactionStatus::Pending {
            return Ok(false);
        }
        record.status = status;
        record.description = description.to_string();
        record.updated_at = Utc::now();
        Ok(true)
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut out: Vec<_> = self
            .records
            .iter()
            .filter(|r| r.value().involves(account_id))
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out.truncate(limit);
        Ok(out)
    }

    async fn find_stale_pending(
        &self,
        threshold: Duration,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let cutoff = stale_cutoff(threshold);
        let mut out = self.collect_sorted(|r| {
            r.status == TransactionStatus::Pending && r.updated_at <= cutoff
        });
        out.truncate(limit);
        Ok(out)
    }

    async fn touch_pending(&self, id: TransactionId) -> Result<bool, StoreError> {
        match self.records.get_mut(&id) {
            Some(mut record) if record.status == TransactionStatus::Pending => {
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_terminal_since(
        &self,
        since: DateTime<Utc>,
        after: Option<TransactionId>,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut out = self.collect_sorted(|r| {
            r.status.is_terminal()
                && (r.updated_at > since
                    || (r.updated_at == since && after.is_none_or(|a| r.id > a)))
        });
        out.truncate(limit);
        Ok(out)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
