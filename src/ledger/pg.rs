//! PostgreSQL ledger store
//!
//! Row locks are `SELECT ... FOR UPDATE` bounded by a per-transaction
//! `SET LOCAL lock_timeout`; an expired wait surfaces as SQLSTATE 55P03.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration;

use super::error::StoreError;
use super::store::{LedgerStore, LedgerTx};
use super::types::{Account, AccountId, AccountStatus, AppliedTransfer};
use crate::db::{LOCK_NOT_AVAILABLE, UNIQUE_VIOLATION, sqlstate};

const ACCOUNT_COLUMNS: &str = "account_id, balance, currency, status, created_at, updated_at";

const APPLIED_COLUMNS: &str = "idempotency_key, source_account_id, dest_account_id, amount, \
                               source_balance, dest_balance, applied_at";

pub struct PgLedgerStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

fn row_to_account(row: &PgRow) -> Result<Account, StoreError> {
    let status: String = row.get("status");
    let status = status.parse::<AccountStatus>().map_err(StoreError::Corrupt)?;
    Ok(Account {
        id: row.get::<i64, _>("account_id") as AccountId,
        balance: row.get("balance"),
        currency: row.get("currency"),
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_applied(row: &PgRow) -> AppliedTransfer {
    AppliedTransfer {
        idempotency_key: row.get("idempotency_key"),
        source_account_id: row.get::<i64, _>("source_account_id") as AccountId,
        dest_account_id: row.get::<i64, _>("dest_account_id") as AccountId,
        amount: row.get("amount"),
        source_balance: row.get("source_balance"),
        dest_balance: row.get("dest_balance"),
        applied_at: row.get("applied_at"),
    }
}

fn map_unique(e: sqlx::Error) -> StoreError {
    if sqlstate(&e).as_deref() == Some(UNIQUE_VIOLATION) {
        StoreError::AlreadyExists
    } else {
        StoreError::Database(e)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let mut tx = self.pool.begin().await?;
        // SET does not take bind parameters
        let stmt = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        sqlx::query(&stmt).execute(&mut *tx).await?;
        Ok(Box::new(PgLedgerTx { tx: Some(tx) }))
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts_tb (account_id, balance, currency, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.id as i64)
        .bind(account.balance)
        .bind(&account.currency)
        .bind(account.status.as_str())
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {} FROM accounts_tb WHERE account_id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_account).transpose()
    }

    async fn get_applied(&self, key: &str) -> Result<Option<AppliedTransfer>, StoreError> {
        let sql = format!(
            "SELECT {} FROM ledger_transfers_tb WHERE idempotency_key = $1",
            APPLIED_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_applied))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Dropping an unfinished tx rolls it back (sqlx semantics).
pub struct PgLedgerTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgLedgerTx {
    fn open(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.tx.as_mut().ok_or(StoreError::Finished)
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let tx = self.open()?;
        let sql = format!(
            "SELECT {} FROM accounts_tb WHERE account_id = $1 FOR UPDATE",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id as i64)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| {
                if sqlstate(&e).as_deref() == Some(LOCK_NOT_AVAILABLE) {
                    StoreError::LockTimeout(id)
                } else {
                    StoreError::Database(e)
                }
            })?;
        row.as_ref().map(row_to_account).transpose()
    }

    async fn find_applied(&mut self, key: &str) -> Result<Option<AppliedTransfer>, StoreError> {
        let tx = self.open()?;
        let sql = format!(
            "SELECT {} FROM ledger_transfers_tb WHERE idempotency_key = $1",
            APPLIED_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.as_ref().map(row_to_applied))
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let tx = self.open()?;
        let result = sqlx::query(
            r#"
            UPDATE accounts_tb
            SET balance = $1, status = $2, updated_at = $3
            WHERE account_id = $4
            "#,
        )
        .bind(account.balance)
        .bind(account.status.as_str())
        .bind(account.updated_at)
        .bind(account.id as i64)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!(
                "account {} vanished while locked",
                account.id
            )));
        }
        Ok(())
    }

    async fn record_applied(&mut self, applied: &AppliedTransfer) -> Result<(), StoreError> {
        let tx = self.open()?;
        sqlx::query(
            r#"
            INSERT INTO ledger_transfers_tb
                (idempotency_key, source_account_id, dest_account_id, amount,
                 source_balance, dest_balance, applied_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&applied.idempotency_key)
        .bind(applied.source_account_id as i64)
        .bind(applied.dest_account_id as i64)
        .bind(applied.amount)
        .bind(applied.source_balance)
        .bind(applied.dest_balance)
        .bind(applied.applied_at)
        .execute(&mut **tx)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::Finished)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}
