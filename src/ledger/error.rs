//! Ledger Error Types
//!
//! `LedgerErrorCode` is the wire contract between the two services: the
//! account service puts it in every error response and the transaction
//! service's client decodes it back. Messages are for humans only.

use thiserror::Error;

use super::types::AccountId;

pub use crate::db::StoreError;

/// Structured error codes carried in the `code` field of error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LedgerErrorCode {
    InvalidAmount = 1001,
    SameAccount = 1002,
    InvalidParameter = 1003,
    InvalidCurrency = 1004,
    AccountNotFound = 2001,
    AccountAlreadyExists = 2002,
    AccountInactive = 2003,
    TransferNotFound = 2004,
    InsufficientBalance = 3001,
    LockTimeout = 3002,
    BalanceOverflow = 3003,
    IdempotencyConflict = 3004,
    Internal = 5000,
}

impl LedgerErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1001 => Some(Self::InvalidAmount),
            1002 => Some(Self::SameAccount),
            1003 => Some(Self::InvalidParameter),
            1004 => Some(Self::InvalidCurrency),
            2001 => Some(Self::AccountNotFound),
            2002 => Some(Self::AccountAlreadyExists),
            2003 => Some(Self::AccountInactive),
            2004 => Some(Self::TransferNotFound),
            3001 => Some(Self::InsufficientBalance),
            3002 => Some(Self::LockTimeout),
            3003 => Some(Self::BalanceOverflow),
            3004 => Some(Self::IdempotencyConflict),
            5000 => Some(Self::Internal),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::SameAccount => "SAME_ACCOUNT",
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::InvalidCurrency => "INVALID_CURRENCY",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::AccountAlreadyExists => "ACCOUNT_ALREADY_EXISTS",
            Self::AccountInactive => "ACCOUNT_INACTIVE",
            Self::TransferNotFound => "TRANSFER_NOT_FOUND",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::LockTimeout => "LOCK_TIMEOUT",
            Self::BalanceOverflow => "BALANCE_OVERFLOW",
            Self::IdempotencyConflict => "IDEMPOTENCY_CONFLICT",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn http_status(self) -> u16 {
        match self {
            Self::InvalidAmount
            | Self::SameAccount
            | Self::InvalidParameter
            | Self::InvalidCurrency => 400,
            Self::AccountNotFound | Self::TransferNotFound => 404,
            Self::AccountAlreadyExists | Self::IdempotencyConflict => 409,
            Self::AccountInactive | Self::InsufficientBalance | Self::BalanceOverflow => 422,
            Self::LockTimeout => 503,
            Self::Internal => 500,
        }
    }
}

/// Executor errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Cannot transfer to the same account")]
    SameAccount,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported currency: {0}")]
    InvalidCurrency(String),

    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Account {0} already exists")]
    AccountAlreadyExists(AccountId),

    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    #[error("No transfer applied under key {0}")]
    TransferNotFound(String),

    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    #[error("Failed to acquire lock on account {0} before timeout")]
    LockTimeout(AccountId),

    #[error("Balance would overflow")]
    BalanceOverflow,

    #[error("Idempotency key {0} was already used for a different transfer")]
    IdempotencyConflict(String),

    #[error("Internal ledger error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn code(&self) -> LedgerErrorCode {
        match self {
            LedgerError::InvalidAmount => LedgerErrorCode::InvalidAmount,
            LedgerError::SameAccount => LedgerErrorCode::SameAccount,
            LedgerError::InvalidParameter(_) => LedgerErrorCode::InvalidParameter,
            LedgerError::InvalidCurrency(_) => LedgerErrorCode::InvalidCurrency,
            LedgerError::AccountNotFound(_) => LedgerErrorCode::AccountNotFound,
            LedgerError::AccountAlreadyExists(_) => LedgerErrorCode::AccountAlreadyExists,
            LedgerError::AccountInactive(_) => LedgerErrorCode::AccountInactive,
            LedgerError::TransferNotFound(_) => LedgerErrorCode::TransferNotFound,
            LedgerError::InsufficientBalance { .. } => LedgerErrorCode::InsufficientBalance,
            LedgerError::LockTimeout(_) => LedgerErrorCode::LockTimeout,
            LedgerError::BalanceOverflow => LedgerErrorCode::BalanceOverflow,
            LedgerError::IdempotencyConflict(_) => LedgerErrorCode::IdempotencyConflict,
            LedgerError::Internal(_) => LedgerErrorCode::Internal,
        }
    }

    /// Account named by the failure, if any
    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            LedgerError::AccountNotFound(id)
            | LedgerError::AccountAlreadyExists(id)
            | LedgerError::AccountInactive(id)
            | LedgerError::LockTimeout(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::LockTimeout(id) => LedgerError::LockTimeout(id),
            other => LedgerError::Internal(other.to_string()),
        }
    }
}
