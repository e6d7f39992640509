//! Gateway types module
//!
//! - [`response`]: response envelope, `ApiError`, `ApiResult`
//! - [`account`]: account service request/response DTOs
//! - [`transaction`]: transaction service request/response DTOs

pub mod account;
pub mod response;
pub mod transaction;

pub use account::{AccountData, CreateAccountRequest, TransferRequest};
pub use response::{AccountErrorData, ApiError, ApiResponse, ApiResult, created, ok};
pub use transaction::{CreateTransactionRequest, ListTransactionsQuery};

use validator::{Validate, ValidationErrors};

use crate::ledger::AccountId;

/// Largest id either store can hold (BIGINT)
pub const MAX_ACCOUNT_ID: AccountId = i64::MAX as AccountId;

/// Run `validator` rules and turn failures into an `INVALID_PARAMETER` error
pub fn validated<T: Validate>(req: T) -> Result<T, ApiError> {
    req.validate()
        .map_err(|e: ValidationErrors| ApiError::invalid_parameter(e.to_string()))?;
    Ok(req)
}

/// Reject path ids the stores cannot represent
pub fn account_id_param(id: AccountId) -> Result<AccountId, ApiError> {
    if id > MAX_ACCOUNT_ID {
        return Err(ApiError::invalid_parameter(format!(
            "account id {} out of range",
            id
        )));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_param_range() {
        assert_eq!(account_id_param(7).unwrap(), 7);
        assert_eq!(account_id_param(MAX_ACCOUNT_ID).unwrap(), MAX_ACCOUNT_ID);

        let err = account_id_param(MAX_ACCOUNT_ID + 1).unwrap_err();
        assert_eq!(err.code, 1003);
        assert!(account_id_param(u64::MAX).is_err());
    }
}
