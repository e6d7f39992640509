//! Ledger Transfer Executor
//!
//! Moves value between two account rows inside one local store transaction.
//!
//! # Locking
//!
//! Rows are always locked in ascending account-id order, whichever side is
//! the source. Two transfers over the same pair therefore queue on the same
//! first lock instead of each holding one and waiting on the other.
//!
//! # Atomicity
//!
//! Every check that can fail runs after both locks are held and before
//! anything is written; any error rolls the whole transaction back.

use std::sync::Arc;

use super::error::{LedgerError, StoreError};
use super::store::{LedgerStore, LedgerTx};
use super::types::{Account, AccountId, AppliedTransfer, TransferCommand, TransferReceipt};
use crate::money::{CURRENCY_DECIMALS, SUPPORTED_CURRENCY, parse_minor_units};

/// Longest idempotency key the ledger stores
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 64;

pub struct LedgerExecutor {
    store: Arc<dyn LedgerStore>,
}

impl LedgerExecutor {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Open a new active account with an opening balance given as a decimal
    /// string ("100.00").
    pub async fn create_account(
        &self,
        id: AccountId,
        initial_balance: &str,
        currency: Option<&str>,
    ) -> Result<Account, LedgerError> {
        let currency = currency.unwrap_or(SUPPORTED_CURRENCY);
        if currency != SUPPORTED_CURRENCY {
            return Err(LedgerError::InvalidCurrency(currency.to_string()));
        }
        let balance = parse_minor_units(initial_balance, CURRENCY_DECIMALS)
            .map_err(|e| LedgerError::InvalidParameter(format!("initial_balance: {}", e)))?;

        let account = Account::new(id, balance, currency);
        match self.store.insert_account(&account).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists) => return Err(LedgerError::AccountAlreadyExists(id)),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(account_id = id, balance, "Account created");
        Ok(account)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .get_account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Applied-transfer record for `key`, if the ledger has one
    pub async fn lookup_transfer(&self, key: &str) -> Result<Option<AppliedTransfer>, LedgerError> {
        Ok(self.store.get_applied(key).await?)
    }

    pub async fn health_check(&self) -> Result<(), LedgerError> {
        Ok(self.store.ping().await?)
    }

    /// Execute a transfer atomically.
    ///
    /// Returns the post-transfer balances. With an idempotency key that the
    /// ledger already applied, returns the original balances flagged as a
    /// replay and changes nothing.
    pub async fn transfer(&self, cmd: &TransferCommand) -> Result<TransferReceipt, LedgerError> {
        // Preconditions, before any lock
        if cmd.amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if cmd.source_account_id == cmd.dest_account_id {
            return Err(LedgerError::SameAccount);
        }
        if let Some(key) = &cmd.idempotency_key {
            if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
                return Err(LedgerError::InvalidParameter(format!(
                    "idempotency_key must be 1..={} bytes",
                    MAX_IDEMPOTENCY_KEY_LEN
                )));
            }
        }

        let mut tx = self.store.begin().await?;

        let result = match Self::apply(tx.as_mut(), cmd).await {
            Ok(receipt) if receipt.replayed => tx.rollback().await.map(|_| receipt),
            Ok(receipt) => tx.commit().await.map(|_| receipt),
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    tracing::error!(error = %rb, "Ledger rollback failed");
                }
                return Err(Self::log_rejection(cmd, e));
            }
        };

        match result {
            Ok(receipt) => {
                tracing::info!(
                    source_account_id = cmd.source_account_id,
                    dest_account_id = cmd.dest_account_id,
                    amount = cmd.amount,
                    idempotency_key = cmd.idempotency_key.as_deref().unwrap_or(""),
                    replayed = receipt.replayed,
                    "Transfer applied"
                );
                Ok(receipt)
            }
            Err(StoreError::AlreadyExists) => {
                // Lost the race on the dedupe row to a different transfer
                let key = cmd.idempotency_key.clone().unwrap_or_default();
                Err(Self::log_rejection(cmd, LedgerError::IdempotencyConflict(key)))
            }
            Err(e) => Err(Self::log_rejection(cmd, e.into())),
        }
    }

    async fn apply(
        tx: &mut dyn LedgerTx,
        cmd: &TransferCommand,
    ) -> Result<TransferReceipt, LedgerError> {
        let (src_id, dst_id) = (cmd.source_account_id, cmd.dest_account_id);
        let (first_id, second_id) = if src_id < dst_id {
            (src_id, dst_id)
        } else {
            (dst_id, src_id)
        };

        let first = tx
            .lock_account(first_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(first_id))?;
        let second = tx
            .lock_account(second_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(second_id))?;

        let (mut source, mut dest) = if first.id == src_id {
            (first, second)
        } else {
            (second, first)
        };

        if let Some(key) = &cmd.idempotency_key {
            if let Some(applied) = tx.find_applied(key).await? {
                if !applied.matches(cmd) {
                    return Err(LedgerError::IdempotencyConflict(key.clone()));
                }
                return Ok(TransferReceipt {
                    source_balance: applied.source_balance,
                    dest_balance: applied.dest_balance,
                    replayed: true,
                });
            }
        }

        if !source.is_active() {
            return Err(LedgerError::AccountInactive(source.id));
        }
        if !dest.is_active() {
            return Err(LedgerError::AccountInactive(dest.id));
        }

        if source.balance < cmd.amount {
            return Err(LedgerError::InsufficientBalance {
                available: source.balance,
                required: cmd.amount,
            });
        }

        let new_source = source
            .balance
            .checked_sub(cmd.amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        let new_dest = dest
            .balance
            .checked_add(cmd.amount)
            .ok_or(LedgerError::BalanceOverflow)?;

        let now = chrono::Utc::now();
        source.balance = new_source;
        source.updated_at = now;
        dest.balance = new_dest;
        dest.updated_at = now;

        tx.save_account(&source).await?;
        tx.save_account(&dest).await?;

        if let Some(key) = &cmd.idempotency_key {
            let applied = AppliedTransfer {
                idempotency_key: key.clone(),
                source_account_id: src_id,
                dest_account_id: dst_id,
                amount: cmd.amount,
                source_balance: new_source,
                dest_balance: new_dest,
                applied_at: now,
            };
            match tx.record_applied(&applied).await {
                Ok(()) => {}
                Err(StoreError::AlreadyExists) => {
                    return Err(LedgerError::IdempotencyConflict(key.clone()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(TransferReceipt {
            source_balance: new_source,
            dest_balance: new_dest,
            replayed: false,
        })
    }

    fn log_rejection(cmd: &TransferCommand, e: LedgerError) -> LedgerError {
        match &e {
            LedgerError::LockTimeout(_) | LedgerError::Internal(_) => tracing::warn!(
                source_account_id = cmd.source_account_id,
                dest_account_id = cmd.dest_account_id,
                amount = cmd.amount,
                error = %e,
                "Transfer aborted"
            ),
            _ => tracing::debug!(
                source_account_id = cmd.source_account_id,
                dest_account_id = cmd.dest_account_id,
                code = e.code().name(),
                "Transfer rejected"
            ),
        }
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryLedgerStore;
    use crate::ledger::types::AccountStatus;
    use std::time::Duration;

    async fn setup(balances: &[(AccountId, &str)]) -> (LedgerExecutor, MemoryLedgerStore) {
        let store = MemoryLedgerStore::new(Duration::from_millis(100));
        let executor = LedgerExecutor::new(Arc::new(store.clone()));
        for (id, balance) in balances {
            executor.create_account(*id, balance, None).await.unwrap();
        }
        (executor, store)
    }

    async fn balance(executor: &LedgerExecutor, id: AccountId) -> i64 {
        executor.get_account(id).await.unwrap().balance
    }

    #[tokio::test]
    async fn test_transfer_moves_exact_amount() {
        let (executor, store) = setup(&[(1, "1.00"), (2, "0")]).await;

        let receipt = executor.transfer(&TransferCommand::new(1, 2, 50)).await.unwrap();

        assert_eq!(receipt.source_balance, 50);
        assert_eq!(receipt.dest_balance, 50);
        assert!(!receipt.replayed);
        assert_eq!(balance(&executor, 1).await, 50);
        assert_eq!(balance(&executor, 2).await, 50);
        assert_eq!(store.total_balance().await, 100);
    }

    #[tokio::test]
    async fn test_transfer_from_higher_id() {
        let (executor, _) = setup(&[(1, "0"), (2, "1.00")]).await;

        let receipt = executor.transfer(&TransferCommand::new(2, 1, 30)).await.unwrap();

        assert_eq!(receipt.source_balance, 70);
        assert_eq!(receipt.dest_balance, 30);
        assert_eq!(balance(&executor, 1).await, 30);
    }

    #[tokio::test]
    async fn test_transfer_entire_balance() {
        let (executor, _) = setup(&[(1, "1.00"), (2, "0")]).await;
        executor.transfer(&TransferCommand::new(1, 2, 100)).await.unwrap();
        assert_eq!(balance(&executor, 1).await, 0);
    }

    #[tokio::test]
    async fn test_invalid_amount() {
        let (executor, _) = setup(&[(1, "1.00"), (2, "0")]).await;

        for amount in [0, -5] {
            let result = executor.transfer(&TransferCommand::new(1, 2, amount)).await;
            assert!(matches!(result, Err(LedgerError::InvalidAmount)));
        }
        assert_eq!(balance(&executor, 1).await, 100);
    }

    #[tokio::test]
    async fn test_same_account_rejected_before_locking() {
        let (executor, store) = setup(&[(1, "1.00")]).await;

        // Hold the row; a same-account request must not wait on it
        let mut holder = store.begin().await.unwrap();
        holder.lock_account(1).await.unwrap();

        let result = executor.transfer(&TransferCommand::new(1, 1, 10)).await;
        assert!(matches!(result, Err(LedgerError::SameAccount)));
    }

    #[tokio::test]
    async fn test_insufficient_balance_leaves_rows_untouched() {
        let (executor, _) = setup(&[(1, "1.00"), (2, "0")]).await;

        let result = executor.transfer(&TransferCommand::new(1, 2, 150)).await;

        match result {
            Err(LedgerError::InsufficientBalance {
                available,
                required,
            }) => {
                assert_eq!(available, 100);
                assert_eq!(required, 150);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(balance(&executor, 1).await, 100);
        assert_eq!(balance(&executor, 2).await, 0);
    }

    #[tokio::test]
    async fn test_missing_account_names_the_id() {
        let (executor, _) = setup(&[(1, "1.00")]).await;

        let result = executor.transfer(&TransferCommand::new(1, 99, 10)).await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(99))));

        let result = executor.transfer(&TransferCommand::new(99, 1, 10)).await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(99))));
        assert_eq!(balance(&executor, 1).await, 100);
    }

    #[tokio::test]
    async fn test_inactive_account() {
        let (executor, store) = setup(&[(1, "1.00"), (2, "0")]).await;
        store.set_status(2, AccountStatus::Inactive).await;

        let result = executor.transfer(&TransferCommand::new(1, 2, 10)).await;
        assert!(matches!(result, Err(LedgerError::AccountInactive(2))));
        assert_eq!(balance(&executor, 1).await, 100);
    }

    #[tokio::test]
    async fn test_lock_timeout_rolls_back() {
        let (executor, store) = setup(&[(1, "1.00"), (2, "0")]).await;

        let mut holder = store.begin().await.unwrap();
        holder.lock_account(2).await.unwrap();

        let result = executor.transfer(&TransferCommand::new(1, 2, 10)).await;
        assert!(matches!(result, Err(LedgerError::LockTimeout(2))));

        holder.rollback().await.unwrap();
        // account 1 lock was released by the failed transfer
        executor.transfer(&TransferCommand::new(1, 2, 10)).await.unwrap();
        assert_eq!(balance(&executor, 1).await, 90);
    }

    #[tokio::test]
    async fn test_balance_overflow() {
        let (executor, store) = setup(&[(1, "1.00")]).await;
        store
            .insert_account(&Account::new(2, i64::MAX, "USD"))
            .await
            .unwrap();

        let result = executor.transfer(&TransferCommand::new(1, 2, 1)).await;
        assert!(matches!(result, Err(LedgerError::BalanceOverflow)));
        assert_eq!(balance(&executor, 1).await, 100);
    }

    #[tokio::test]
    async fn test_idempotent_replay_applies_once() {
        let (executor, _) = setup(&[(1, "1.00"), (2, "0")]).await;
        let cmd = TransferCommand::new(1, 2, 40).with_idempotency_key("tx-1");

        let first = executor.transfer(&cmd).await.unwrap();
        let second = executor.transfer(&cmd).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(second.source_balance, first.source_balance);
        assert_eq!(balance(&executor, 1).await, 60);
        assert_eq!(balance(&executor, 2).await, 40);

        let applied = executor.lookup_transfer("tx-1").await.unwrap().unwrap();
        assert_eq!(applied.amount, 40);
        assert!(executor.lookup_transfer("tx-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_idempotency_key_reused_for_other_transfer() {
        let (executor, _) = setup(&[(1, "1.00"), (2, "0")]).await;
        executor
            .transfer(&TransferCommand::new(1, 2, 40).with_idempotency_key("tx-1"))
            .await
            .unwrap();

        let result = executor
            .transfer(&TransferCommand::new(1, 2, 41).with_idempotency_key("tx-1"))
            .await;
        assert!(matches!(result, Err(LedgerError::IdempotencyConflict(_))));
        assert_eq!(balance(&executor, 1).await, 60);
    }

    #[tokio::test]
    async fn test_rejected_transfer_does_not_burn_key() {
        let (executor, _) = setup(&[(1, "1.00"), (2, "0")]).await;
        let cmd = TransferCommand::new(1, 2, 500).with_idempotency_key("tx-1");

        assert!(executor.transfer(&cmd).await.is_err());
        assert!(executor.lookup_transfer("tx-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_account_rules() {
        let (executor, _) = setup(&[(1, "12.34")]).await;
        assert_eq!(balance(&executor, 1).await, 1234);

        let dup = executor.create_account(1, "0", None).await;
        assert!(matches!(dup, Err(LedgerError::AccountAlreadyExists(1))));

        let eur = executor.create_account(2, "1", Some("EUR")).await;
        assert!(matches!(eur, Err(LedgerError::InvalidCurrency(_))));

        let bad = executor.create_account(3, "1.001", None).await;
        assert!(matches!(bad, Err(LedgerError::InvalidParameter(_))));

        let negative = executor.create_account(4, "-1", None).await;
        assert!(matches!(negative, Err(LedgerError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_get_account_is_stable() {
        let (executor, _) = setup(&[(1, "5.00")]).await;
        let a = executor.get_account(1).await.unwrap();
        let b = executor.get_account(1).await.unwrap();
        assert_eq!(a, b);
        assert!(matches!(
            executor.get_account(2).await,
            Err(LedgerError::AccountNotFound(2))
        ));
    }
}
