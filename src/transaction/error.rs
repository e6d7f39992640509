//! Transaction Error Types

use thiserror::Error;

use crate::db::StoreError;
use crate::ledger::{AccountId, LedgerErrorCode};

/// Coarse failure classes callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientBalance,
    LockTimeout,
    Transport,
    Internal,
}

/// Numeric codes for the response envelope. Ledger rejections pass their
/// `LedgerErrorCode` through unchanged.
pub mod codes {
    pub const SOURCE_ACCOUNT_NOT_FOUND: i32 = 2101;
    pub const DEST_ACCOUNT_NOT_FOUND: i32 = 2102;
    pub const TRANSACTION_NOT_FOUND: i32 = 2103;
    pub const LEDGER_UNAVAILABLE: i32 = 5030;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    // === Validation ===
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Source and destination account cannot be the same")]
    SameAccount,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // === Accounts ===
    #[error("Source account {0} not found")]
    SourceAccountNotFound(AccountId),

    #[error("Destination account {0} not found")]
    DestAccountNotFound(AccountId),

    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Ledger busy, lock wait timed out")]
    LockTimeout,

    /// Any other business rejection reported by the ledger
    #[error("Ledger rejected transfer: {message}")]
    Rejected {
        code: LedgerErrorCode,
        message: String,
    },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    // === System ===
    #[error("Account service unreachable: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransactionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransactionError::InvalidAmount
            | TransactionError::SameAccount
            | TransactionError::InvalidParameter(_)
            | TransactionError::AccountInactive(_)
            | TransactionError::Rejected { .. } => ErrorKind::Validation,
            TransactionError::SourceAccountNotFound(_)
            | TransactionError::DestAccountNotFound(_)
            | TransactionError::TransactionNotFound(_) => ErrorKind::NotFound,
            TransactionError::InsufficientBalance => ErrorKind::InsufficientBalance,
            TransactionError::LockTimeout => ErrorKind::LockTimeout,
            TransactionError::Transport(_) => ErrorKind::Transport,
            TransactionError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable reason string
    pub fn code(&self) -> &'static str {
        match self {
            TransactionError::InvalidAmount => "INVALID_AMOUNT",
            TransactionError::SameAccount => "SAME_ACCOUNT",
            TransactionError::InvalidParameter(_) => "INVALID_PARAMETER",
            TransactionError::SourceAccountNotFound(_) => "SOURCE_ACCOUNT_NOT_FOUND",
            TransactionError::DestAccountNotFound(_) => "DEST_ACCOUNT_NOT_FOUND",
            TransactionError::AccountInactive(_) => "ACCOUNT_INACTIVE",
            TransactionError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            TransactionError::LockTimeout => "LOCK_TIMEOUT",
            TransactionError::Rejected { code, .. } => code.name(),
            TransactionError::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            TransactionError::Transport(_) => "LEDGER_UNAVAILABLE",
            TransactionError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Envelope `code` value
    pub fn api_code(&self) -> i32 {
        match self {
            TransactionError::InvalidAmount => LedgerErrorCode::InvalidAmount.code(),
            TransactionError::SameAccount => LedgerErrorCode::SameAccount.code(),
            TransactionError::InvalidParameter(_) => LedgerErrorCode::InvalidParameter.code(),
            TransactionError::SourceAccountNotFound(_) => codes::SOURCE_ACCOUNT_NOT_FOUND,
            TransactionError::DestAccountNotFound(_) => codes::DEST_ACCOUNT_NOT_FOUND,
            TransactionError::AccountInactive(_) => LedgerErrorCode::AccountInactive.code(),
            TransactionError::InsufficientBalance => LedgerErrorCode::InsufficientBalance.code(),
            TransactionError::LockTimeout => LedgerErrorCode::LockTimeout.code(),
            TransactionError::Rejected { code, .. } => code.code(),
            TransactionError::TransactionNotFound(_) => codes::TRANSACTION_NOT_FOUND,
            TransactionError::Transport(_) => codes::LEDGER_UNAVAILABLE,
            TransactionError::Internal(_) => LedgerErrorCode::Internal.code(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            TransactionError::InvalidAmount
            | TransactionError::SameAccount
            | TransactionError::InvalidParameter(_) => 400,
            TransactionError::SourceAccountNotFound(_)
            | TransactionError::DestAccountNotFound(_)
            | TransactionError::TransactionNotFound(_) => 404,
            TransactionError::AccountInactive(_) | TransactionError::InsufficientBalance => 422,
            TransactionError::Rejected { code, .. } => code.http_status(),
            TransactionError::LockTimeout => 503,
            TransactionError::Transport(_) => 502,
            TransactionError::Internal(_) => 500,
        }
    }

    /// Text stored in a failed record's description
    pub fn describe(&self) -> String {
        format!("{}: {}", self.code(), self)
    }
}

impl From<StoreError> for TransactionError {
    fn from(e: StoreError) -> Self {
        TransactionError::Internal(e.to_string())
    }
}
