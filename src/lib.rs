//! Split Ledger
//!
//! Two services over a shared codebase:
//!
//! - Account Service: owns balances and applies each transfer atomically,
//!   locking both rows in ascending id order
//! - Transaction Service: records each requested transfer as `pending` and
//!   drives it to `completed` or `failed` through the Account Service
//!
//! # Modules
//!
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - tracing subscriber setup
//! - [`money`] - minor-unit parsing and formatting
//! - [`db`] - PostgreSQL pool and schema
//! - [`ledger`] - account store and transfer executor
//! - [`transaction`] - transaction store, ledger client, orchestrator, reconciler
//! - [`gateway`] - HTTP handlers and routers for both services

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod transaction;

pub use config::AppConfig;
pub use ledger::{LedgerError, LedgerExecutor};
pub use transaction::{TransactionError, TransactionOrchestrator};
