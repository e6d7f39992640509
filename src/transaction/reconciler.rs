//! Reconciler
//!
//! Background worker for the gaps the saga leaves open:
//!
//! - `scan_and_reconcile`: re-drives `pending` records whose finalization
//!   never happened. The ledger dedupes by transaction id, so re-driving a
//!   transfer that already applied returns the original receipt.
//! - `audit`: compares recent terminal records with the ledger and reports
//!   disagreements. It never rewrites a terminal status.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::client::RemoteError;
use super::error::TransactionError;
use super::orchestrator::{TransactionOrchestrator, classify_remote};
use super::state::TransactionStatus;
use super::types::{TransactionId, TransactionRecord};
use crate::config;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// How often to scan
    pub scan_interval: Duration,
    /// How long a record must sit in `pending` before it is re-driven
    pub stale_threshold: Duration,
    /// Maximum records per scan
    pub batch_size: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(30),
            stale_threshold: Duration::from_secs(60),
            batch_size: 100,
        }
    }
}

impl From<&config::ReconcilerConfig> for ReconcilerConfig {
    fn from(c: &config::ReconcilerConfig) -> Self {
        Self {
            scan_interval: Duration::from_millis(c.scan_interval_ms),
            stale_threshold: Duration::from_millis(c.stale_threshold_ms),
            batch_size: c.batch_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscrepancyKind {
    /// Recorded `completed` but the ledger has no applied transfer
    CompletedNotApplied,
    /// Recorded `failed` but the ledger applied the transfer
    FailedButApplied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub transaction_id: TransactionId,
    pub kind: DiscrepancyKind,
    pub source_account_id: u64,
    pub dest_account_id: u64,
    pub amount: i64,
}

/// Per-scan counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub scanned: usize,
    pub completed: usize,
    pub failed: usize,
    /// Ledger unreachable; left `pending`
    pub deferred: usize,
}

pub struct Reconciler {
    orchestrator: Arc<TransactionOrchestrator>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(orchestrator: Arc<TransactionOrchestrator>, config: ReconcilerConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Run forever: scan, then audit the window since the previous pass.
    pub async fn run(&self) -> ! {
        info!(
            scan_interval_ms = self.config.scan_interval.as_millis() as u64,
            stale_threshold_ms = self.config.stale_threshold.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Starting reconciler"
        );

        let mut audit_since = Utc::now();
        loop {
            tokio::time::sleep(self.config.scan_interval).await;
            (audit_since, _) = self.run_once(audit_since).await;
        }
    }

    /// One iteration of `run`: scan, then audit from `audit_since`.
    ///
    /// Returns where the next audit window starts (unchanged if the audit
    /// failed) and the discrepancies found.
    pub async fn run_once(&self, audit_since: DateTime<Utc>) -> (DateTime<Utc>, Vec<Discrepancy>) {
        if let Err(e) = self.scan_and_reconcile().await {
            error!(error = %e, "Reconcile scan failed");
        }

        let next_since = Utc::now();
        match self.audit(audit_since).await {
            Ok(found) => (next_since, found),
            Err(e) => {
                error!(error = %e, "Reconcile audit failed");
                (audit_since, Vec::new())
            }
        }
    }

    /// One pass over stale `pending` records
    pub async fn scan_and_reconcile(&self) -> Result<ReconcileStats, TransactionError> {
        let stale = self
            .orchestrator
            .store()
            .find_stale_pending(self.config.stale_threshold, self.config.batch_size.max(1))
            .await?;

        let mut stats = ReconcileStats {
            scanned: stale.len(),
            ..Default::default()
        };
        if stale.is_empty() {
            debug!("No stale pending transactions");
            return Ok(stats);
        }

        info!(count = stale.len(), "Re-driving stale pending transactions");

        for record in &stale {
            match self.redrive(record).await {
                Ok(Some(TransactionStatus::Completed)) => stats.completed += 1,
                Ok(Some(_)) => stats.failed += 1,
                Ok(None) => stats.deferred += 1,
                Err(e) => {
                    stats.deferred += 1;
                    error!(transaction_id = %record.id, error = %e, "Failed to reconcile transaction");
                }
            }
        }

        if stats.completed + stats.failed > 0 {
            info!(
                completed = stats.completed,
                failed = stats.failed,
                deferred = stats.deferred,
                "Reconciled transactions this scan"
            );
        }
        Ok(stats)
    }

    /// Returns the status written, or `None` if the record stays pending
    async fn redrive(
        &self,
        record: &TransactionRecord,
    ) -> Result<Option<TransactionStatus>, TransactionError> {
        let result = self
            .orchestrator
            .ledger()
            .request_transfer(
                record.source_account_id,
                record.dest_account_id,
                record.amount,
                &record.id.to_string(),
            )
            .await;

        let (status, description) = match result {
            Ok(_) => (TransactionStatus::Completed, record.description.clone()),
            Err(RemoteError::Transport(msg)) => {
                warn!(transaction_id = %record.id, error = %msg, "Ledger unreachable, will retry");
                // to the back of the stale queue
                self.orchestrator.store().touch_pending(record.id).await?;
                return Ok(None);
            }
            Err(remote) => {
                let error =
                    classify_remote(remote, record.source_account_id, record.dest_account_id);
                (TransactionStatus::Failed, error.describe())
            }
        };

        let applied = self
            .orchestrator
            .store()
            .finalize(record.id, status, &description)
            .await?;
        if applied {
            info!(transaction_id = %record.id, status = %status, "Stale transaction finalized");
            Ok(Some(status))
        } else {
            debug!(transaction_id = %record.id, "Finalized concurrently, skipping");
            Ok(None)
        }
    }

    /// Compare terminal records updated at or after `since` with the ledger.
    ///
    /// Records whose ledger lookup fails are skipped and logged.
    pub async fn audit(&self, since: DateTime<Utc>) -> Result<Vec<Discrepancy>, TransactionError> {
        let page_size = self.config.batch_size.max(1);
        let (mut cursor, mut after) = (since, None);
        let mut checked = 0;
        let mut found = Vec::new();

        // Page through the whole window; a full page means more may follow.
        loop {
            let page = self
                .orchestrator
                .store()
                .list_terminal_since(cursor, after, page_size)
                .await?;
            checked += page.len();
            for record in &page {
                if let Some(discrepancy) = self.check(record).await {
                    found.push(discrepancy);
                }
            }
            match page.last() {
                Some(last) if page.len() == page_size => {
                    cursor = last.updated_at;
                    after = Some(last.id);
                }
                _ => break,
            }
        }

        debug!(checked, discrepancies = found.len(), "Audit pass done");
        Ok(found)
    }

    async fn check(&self, record: &TransactionRecord) -> Option<Discrepancy> {
        let applied = match self
            .orchestrator
            .ledger()
            .lookup_transfer(&record.id.to_string())
            .await
        {
            Ok(applied) => applied,
            Err(e) => {
                warn!(transaction_id = %record.id, error = %e, "Audit lookup failed");
                return None;
            }
        };

        let kind = match (record.status, applied.is_some()) {
            (TransactionStatus::Completed, false) => DiscrepancyKind::CompletedNotApplied,
            (TransactionStatus::Failed, true) => DiscrepancyKind::FailedButApplied,
            _ => return None,
        };

        error!(
            transaction_id = %record.id,
            status = %record.status,
            source_account_id = record.source_account_id,
            dest_account_id = record.dest_account_id,
            amount = record.amount,
            kind = ?kind,
            "Ledger disagrees with transaction record"
        );
        Some(Discrepancy {
            transaction_id: record.id,
            kind,
            source_account_id: record.source_account_id,
            dest_account_id: record.dest_account_id,
            amount: record.amount,
        })
    }
}
