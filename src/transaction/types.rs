//! Transaction Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::state::TransactionStatus;
use crate::ledger::AccountId;

/// Transaction identifier (ULID)
///
/// Also the idempotency key sent with the remote transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(ulid::Ulid);

impl TransactionId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

impl Serialize for TransactionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Durable transfer intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionRecord {
    #[schema(value_type = String, example = "01HZX3Q6W8K2M4N5P7R9S1T3V5")]
    pub id: TransactionId,
    pub source_account_id: AccountId,
    pub dest_account_id: AccountId,
    /// Minor units
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    /// Caller text while pending; failure reason once failed
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// New `pending` record with a fresh id
    pub fn pending(
        source_account_id: AccountId,
        dest_account_id: AccountId,
        amount: i64,
        currency: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            source_account_id,
            dest_account_id,
            amount,
            currency: currency.into(),
            status: TransactionStatus::Pending,
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True if the record names `account_id` on either side
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.source_account_id == account_id || self.dest_account_id == account_id
    }
}
