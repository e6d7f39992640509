//! Account service DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::ledger::{Account, AccountStatus};
use crate::money::{CURRENCY_DECIMALS, format_minor_units};

/// POST /accounts
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    #[validate(range(min = 1, max = 9223372036854775807u64))]
    #[schema(example = 1)]
    pub account_id: u64,
    /// Decimal string, at most 2 fractional digits
    #[validate(length(min = 1, max = 32))]
    #[schema(example = "100.00")]
    pub initial_balance: String,
    /// Defaults to USD, the only supported currency
    #[validate(length(equal = 3))]
    #[schema(example = "USD")]
    pub currency: Option<String>,
}

/// POST /accounts/{id}/transfer
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct TransferRequest {
    #[validate(range(max = 9223372036854775807u64))]
    #[schema(example = 2)]
    pub dest_account_id: u64,
    /// Minor units
    #[schema(example = 5000)]
    pub amount: i64,
    /// Applied at most once by the ledger
    #[validate(length(min = 1, max = 64))]
    pub idempotency_key: Option<String>,
}

/// Account view returned by GET/POST /accounts
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountData {
    #[schema(example = 1)]
    pub id: u64,
    /// Minor units
    #[schema(example = 10000)]
    pub balance: i64,
    #[schema(example = "100.00")]
    pub balance_display: String,
    #[schema(example = "USD")]
    pub currency: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountData {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            balance: account.balance,
            balance_display: format_minor_units(account.balance, CURRENCY_DECIMALS),
            currency: account.currency,
            status: account.status,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_data_display_balance() {
        let data = AccountData::from(Account::new(1, 10_050, "USD"));
        assert_eq!(data.balance_display, "100.50");
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn test_create_account_validation() {
        let req: CreateAccountRequest =
            serde_json::from_str(r#"{"account_id": 0, "initial_balance": "1"}"#).unwrap();
        assert!(req.validate().is_err());

        let req: CreateAccountRequest =
            serde_json::from_str(r#"{"account_id": 5, "initial_balance": "1", "currency": "USD"}"#)
                .unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_transfer_dest_past_bigint_rejected() {
        let req: TransferRequest = serde_json::from_str(
            r#"{"dest_account_id": 18446744073709551615, "amount": 1}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());

        let req: TransferRequest =
            serde_json::from_str(r#"{"dest_account_id": 9223372036854775807, "amount": 1}"#)
                .unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_transfer_request_key_length() {
        let req = TransferRequest {
            dest_account_id: 2,
            amount: 1,
            idempotency_key: Some("k".repeat(65)),
        };
        assert!(req.validate().is_err());

        let req = TransferRequest {
            dest_account_id: 2,
            amount: 1,
            idempotency_key: None,
        };
        assert!(req.validate().is_ok());
    }
}
