//! PostgreSQL transaction store
//!
//! Status changes are atomic CAS updates guarded by `status = 'pending'`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Duration;

use super::state::TransactionStatus;
use super::store::TransactionStore;
use super::types::{TransactionId, TransactionRecord};
use crate::db::{StoreError, UNIQUE_VIOLATION, sqlstate};
use crate::ledger::AccountId;

const COLUMNS: &str = "transaction_id, source_account_id, dest_account_id, amount, currency, \
                       status, description, created_at, updated_at";

pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &PgRow) -> Result<TransactionRecord, StoreError> {
        let id: String = row.get("transaction_id");
        let status: String = row.get("status");
        Ok(TransactionRecord {
            id: id
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("transaction_id {}: {}", id, e)))?,
            source_account_id: row.get::<i64, _>("source_account_id") as AccountId,
            dest_account_id: row.get::<i64, _>("dest_account_id") as AccountId,
            amount: row.get("amount"),
            currency: row.get("currency"),
            status: status.parse().map_err(StoreError::Corrupt)?,
            description: row.get("description"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn rows_to_records(rows: &[PgRow]) -> Result<Vec<TransactionRecord>, StoreError> {
        rows.iter().map(Self::row_to_record).collect()
    }
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn create(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions_tb
                (transaction_id, source_account_id, dest_account_id, amount, currency,
                 status, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.source_account_id as i64)
        .bind(record.dest_account_id as i64)
        .bind(record.amount)
        .bind(&record.currency)
        .bind(record.status.as_str())
        .bind(&record.description)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if sqlstate(&e).as_deref() == Some(UNIQUE_VIOLATION) {
                StoreError::AlreadyExists
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<TransactionRecord>, StoreError> {
        let sql = format!("SELECT {} FROM transactions_tb WHERE transaction_id = $1", COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn finalize(
        &self,
        id: TransactionId,
        status: TransactionStatus,
        description: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions_tb
            SET status = $1, description = $2, updated_at = NOW()
            WHERE transaction_id = $3 AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(description)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        // UNION keeps each branch on its own index
        let sql = format!(
            r#"
            SELECT {cols} FROM transactions_tb WHERE source_account_id = $1
            UNION
            SELECT {cols} FROM transactions_tb WHERE dest_account_id = $1
            ORDER BY created_at DESC, transaction_id DESC
            LIMIT $2
            "#,
            cols = COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(account_id as i64)
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await?;
        Self::rows_to_records(&rows)
    }

    async fn find_stale_pending(
        &self,
        threshold: Duration,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT {} FROM transactions_tb
            WHERE status = 'pending'
              AND updated_at <= NOW() - INTERVAL '1 millisecond' * $1
            ORDER BY updated_at ASC, transaction_id ASC
            LIMIT $2
            "#,
            COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(threshold.as_millis() as f64)
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await?;
        Self::rows_to_records(&rows)
    }

    async fn touch_pending(&self, id: TransactionId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE transactions_tb SET updated_at = NOW() \
             WHERE transaction_id = $1 AND status = 'pending'",
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_terminal_since(
        &self,
        since: DateTime<Utc>,
        after: Option<TransactionId>,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        // ULID text sorts like the id; '' precedes every id
        let sql = format!(
            r#"
            SELECT {} FROM transactions_tb
            WHERE status IN ('completed', 'failed')
              AND (updated_at > $1 OR (updated_at = $1 AND transaction_id > $2))
            ORDER BY updated_at ASC, transaction_id ASC
            LIMIT $3
            "#,
            COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(since)
            .bind(after.map(|id| id.to_string()).unwrap_or_default())
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await?;
        Self::rows_to_records(&rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
