//! Transaction Service core
//!
//! Records transfer intents and drives them against the account service's
//! ledger as a saga: `pending` first, then exactly one terminal status.

pub mod client;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod pg;
pub mod reconciler;
pub mod state;
pub mod store;
pub mod types;


pub use client::{AccountSnapshot, HttpLedgerClient, InProcessLedgerClient, LedgerClient, RemoteError};
pub use error::{ErrorKind, TransactionError};
pub use memory::MemoryTransactionStore;
pub use orchestrator::{CreateTransaction, TransactionOrchestrator, TransferOutcome};
pub use pg::PgTransactionStore;
pub use reconciler::{Discrepancy, DiscrepancyKind, Reconciler, ReconcilerConfig};
pub use state::TransactionStatus;
pub use store::TransactionStore;
pub use types::{TransactionId, TransactionRecord};
