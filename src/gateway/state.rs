use std::sync::Arc;

use crate::ledger::LedgerExecutor;
use crate::transaction::TransactionOrchestrator;

/// Account service shared state
#[derive(Clone)]
pub struct AccountState {
    pub executor: Arc<LedgerExecutor>,
}

impl AccountState {
    pub fn new(executor: Arc<LedgerExecutor>) -> Self {
        Self { executor }
    }
}

/// Transaction service shared state
#[derive(Clone)]
pub struct TransactionState {
    pub orchestrator: Arc<TransactionOrchestrator>,
}

impl TransactionState {
    pub fn new(orchestrator: Arc<TransactionOrchestrator>) -> Self {
        Self { orchestrator }
    }
}
