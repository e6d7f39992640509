//! Ledger Core Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Account identifier. Lock ordering relies on its total order.
pub type AccountId = u64;

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            other => Err(format!("Invalid account status: {}", other)),
        }
    }
}

/// Account row as owned by the ledger store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    /// Minor units; never negative
    pub balance: i64,
    pub currency: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountId, balance: i64, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            balance,
            currency: currency.into(),
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Transfer request handed to the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub source_account_id: AccountId,
    pub dest_account_id: AccountId,
    /// Signed so that non-positive input can be rejected rather than unrepresentable
    pub amount: i64,
    /// Caller-chosen key; a replay with the same key is applied at most once
    pub idempotency_key: Option<String>,
}

impl TransferCommand {
    pub fn new(source_account_id: AccountId, dest_account_id: AccountId, amount: i64) -> Self {
        Self {
            source_account_id,
            dest_account_id,
            amount,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Durable record of a keyed transfer, written in the same local
/// transaction as the balance mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppliedTransfer {
    pub idempotency_key: String,
    pub source_account_id: AccountId,
    pub dest_account_id: AccountId,
    pub amount: i64,
    /// Balances right after the transfer committed
    pub source_balance: i64,
    pub dest_balance: i64,
    pub applied_at: DateTime<Utc>,
}

impl AppliedTransfer {
    /// True if `cmd` asks for exactly the transfer this record describes
    pub fn matches(&self, cmd: &TransferCommand) -> bool {
        self.source_account_id == cmd.source_account_id
            && self.dest_account_id == cmd.dest_account_id
            && self.amount == cmd.amount
    }
}

/// Executor result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferReceipt {
    pub source_balance: i64,
    pub dest_balance: i64,
    /// Set when the idempotency key had already been applied
    pub replayed: bool,
}
