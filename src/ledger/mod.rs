//! Account Service ledger
//!
//! Account rows and the atomic transfer executor that mutates them.

pub mod error;
pub mod executor;
pub mod memory;
pub mod pg;
pub mod store;
pub mod types;

pub use error::{LedgerError, LedgerErrorCode, StoreError};
pub use executor::LedgerExecutor;
pub use memory::MemoryLedgerStore;
pub use pg::PgLedgerStore;
pub use store::{LedgerStore, LedgerTx};
pub use types::{
    Account, AccountId, AccountStatus, AppliedTransfer, TransferCommand, TransferReceipt,
};
