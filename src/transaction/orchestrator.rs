//! Transaction Orchestrator
//!
//! Drives one transfer intent through `pending -> completed | failed`:
//!
//! 1. validate the request (no record on failure)
//! 2. pre-check both accounts on the ledger (no record on failure)
//! 3. persist the record as `pending` before calling out
//! 4. ask the ledger to apply it, keyed by the transaction id
//! 5. compare-and-set the record to its terminal status
//!
//! A transport failure in step 4 finalizes as `failed` even though the
//! ledger may have applied the transfer; the reconciler audit reports such
//! records. If step 5 itself fails the record stays `pending`.

use std::sync::Arc;

use super::client::{LedgerClient, RemoteError};
use super::error::TransactionError;
use super::state::TransactionStatus;
use super::store::TransactionStore;
use super::types::{TransactionId, TransactionRecord};
use crate::db::StoreError;
use crate::ledger::{AccountId, LedgerErrorCode};
use crate::money::SUPPORTED_CURRENCY;

/// Default and ceiling for account listings
pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

/// Caller-facing request
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub source_account_id: AccountId,
    pub dest_account_id: AccountId,
    /// Minor units
    pub amount: i64,
    pub description: String,
}

/// How a persisted transaction ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed(TransactionRecord),
    Failed {
        record: TransactionRecord,
        error: TransactionError,
    },
}

impl TransferOutcome {
    pub fn record(&self) -> &TransactionRecord {
        match self {
            TransferOutcome::Completed(record) => record,
            TransferOutcome::Failed { record, .. } => record,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed(_))
    }
}

/// Map a ledger answer onto the transaction taxonomy. `NotFound` is split
/// by which side of `(source, dest)` the ledger named.
pub fn classify_remote(err: RemoteError, source: AccountId, dest: AccountId) -> TransactionError {
    let not_found = |id: AccountId| {
        if id == dest {
            TransactionError::DestAccountNotFound(id)
        } else {
            TransactionError::SourceAccountNotFound(id)
        }
    };

    match err {
        RemoteError::NotFound(id) => not_found(id),
        RemoteError::Transport(msg) => TransactionError::Transport(msg),
        RemoteError::Rejected {
            code,
            message,
            account_id,
        } => match code {
            LedgerErrorCode::AccountNotFound => not_found(account_id.unwrap_or(source)),
            LedgerErrorCode::AccountInactive => {
                TransactionError::AccountInactive(account_id.unwrap_or(source))
            }
            LedgerErrorCode::InsufficientBalance => TransactionError::InsufficientBalance,
            LedgerErrorCode::InvalidAmount => TransactionError::InvalidAmount,
            LedgerErrorCode::SameAccount => TransactionError::SameAccount,
            LedgerErrorCode::LockTimeout => TransactionError::LockTimeout,
            code => TransactionError::Rejected { code, message },
        },
    }
}

pub struct TransactionOrchestrator {
    store: Arc<dyn TransactionStore>,
    ledger: Arc<dyn LedgerClient>,
}

impl TransactionOrchestrator {
    pub fn new(store: Arc<dyn TransactionStore>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { store, ledger }
    }

    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    /// Run the saga for one request.
    ///
    /// `Err` means no terminal record exists: either nothing was persisted
    /// (validation, pre-check, transport before the record) or finalization
    /// failed and the record is still `pending`.
    pub async fn create_transaction(
        &self,
        req: CreateTransaction,
    ) -> Result<TransferOutcome, TransactionError> {
        if req.amount <= 0 {
            return Err(TransactionError::InvalidAmount);
        }
        if req.source_account_id == req.dest_account_id {
            return Err(TransactionError::SameAccount);
        }

        let (src, dst) = (req.source_account_id, req.dest_account_id);

        let source = self
            .ledger
            .fetch_account(src)
            .await
            .map_err(|e| classify_remote(e, src, dst))?;
        // Advisory only; the ledger re-checks under lock
        if source.balance < req.amount {
            tracing::debug!(
                source_account_id = src,
                balance = source.balance,
                amount = req.amount,
                "Pre-check rejected transfer"
            );
            return Err(TransactionError::InsufficientBalance);
        }

        self.ledger
            .fetch_account(dst)
            .await
            .map_err(|e| classify_remote(e, src, dst))?;

        let record =
            TransactionRecord::pending(src, dst, req.amount, SUPPORTED_CURRENCY, req.description);
        self.store.create(&record).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to persist pending transaction");
            TransactionError::Internal(format!("failed to persist transaction: {}", e))
        })?;

        tracing::info!(
            transaction_id = %record.id,
            source_account_id = src,
            dest_account_id = dst,
            amount = record.amount,
            "Transaction pending"
        );

        let result = self
            .ledger
            .request_transfer(src, dst, record.amount, &record.id.to_string())
            .await;

        match result {
            Ok(_) => {
                let description = record.description.clone();
                self.finalize(record, TransactionStatus::Completed, description, None)
                    .await
            }
            Err(remote) => {
                let error = classify_remote(remote, src, dst);
                tracing::warn!(
                    transaction_id = %record.id,
                    code = error.code(),
                    error = %error,
                    "Ledger transfer failed"
                );
                let description = error.describe();
                self.finalize(record, TransactionStatus::Failed, description, Some(error))
                    .await
            }
        }
    }

    async fn finalize(
        &self,
        mut record: TransactionRecord,
        status: TransactionStatus,
        description: String,
        error: Option<TransactionError>,
    ) -> Result<TransferOutcome, TransactionError> {
        let applied = self
            .store
            .finalize(record.id, status, &description)
            .await
            .map_err(|e| {
                tracing::error!(
                    transaction_id = %record.id,
                    target = %status,
                    error = %e,
                    "Failed to finalize transaction, left pending"
                );
                TransactionError::Internal(format!(
                    "transaction {} could not be finalized: {}",
                    record.id, e
                ))
            })?;

        if !applied {
            // Someone else (the reconciler) got there first; report what is stored.
            tracing::warn!(
                transaction_id = %record.id,
                target = %status,
                "Transaction already finalized"
            );
            let current = self.get_transaction(record.id).await?;
            return Self::outcome_of(current, error);
        }

        record.status = status;
        record.description = description;
        record.updated_at = chrono::Utc::now();

        tracing::info!(transaction_id = %record.id, status = %status, "Transaction finalized");
        Self::outcome_of(record, error)
    }

    fn outcome_of(
        record: TransactionRecord,
        error: Option<TransactionError>,
    ) -> Result<TransferOutcome, TransactionError> {
        match record.status {
            TransactionStatus::Completed => Ok(TransferOutcome::Completed(record)),
            TransactionStatus::Failed => {
                let error = error
                    .unwrap_or_else(|| TransactionError::Internal(record.description.clone()));
                Ok(TransferOutcome::Failed { record, error })
            }
            TransactionStatus::Pending => Err(TransactionError::Internal(format!(
                "transaction {} still pending",
                record.id
            ))),
        }
    }

    pub async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<TransactionRecord, TransactionError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| TransactionError::TransactionNotFound(id.to_string()))
    }

    /// Parse-and-get for ids arriving as text
    pub async fn get_transaction_str(&self, id: &str) -> Result<TransactionRecord, TransactionError> {
        let parsed: TransactionId = id
            .parse()
            .map_err(|_| TransactionError::TransactionNotFound(id.to_string()))?;
        self.get_transaction(parsed).await
    }

    pub async fn list_account_transactions(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionRecord>, TransactionError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        Ok(self.store.list_by_account(account_id, limit).await?)
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}
