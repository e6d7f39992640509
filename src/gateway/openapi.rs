//! OpenAPI / Swagger UI Documentation
//!
//! Each service publishes its own document:
//!
//! - Swagger UI: `http://localhost:{port}/docs`
//! - OpenAPI JSON: `http://localhost:{port}/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    AccountData, AccountErrorData, CreateAccountRequest, CreateTransactionRequest, TransferRequest,
};
use crate::ledger::{AccountStatus, AppliedTransfer, TransferReceipt};
use crate::transaction::{TransactionRecord, TransactionStatus};

/// Account Service API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Split Ledger Account Service",
        version = "1.0.0",
        description = "Account balances and atomic transfers with ordered row locking."
    ),
    servers(
        (url = "http://localhost:8081", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::account_health,
        crate::gateway::handlers::create_account,
        crate::gateway::handlers::get_account,
        crate::gateway::handlers::transfer,
        crate::gateway::handlers::get_transfer,
    ),
    components(
        schemas(
            HealthResponse,
            AccountData,
            AccountStatus,
            AccountErrorData,
            CreateAccountRequest,
            TransferRequest,
            TransferReceipt,
            AppliedTransfer,
        )
    ),
    tags(
        (name = "Account", description = "Account creation and lookup"),
        (name = "Transfer", description = "Atomic balance transfers"),
        (name = "System", description = "Health checks")
    )
)]
pub struct AccountApiDoc;

/// Transaction Service API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Split Ledger Transaction Service",
        version = "1.0.0",
        description = "Transfer orchestration: records pending transactions and drives them to completed or failed through the Account Service."
    ),
    servers(
        (url = "http://localhost:8082", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::transaction_health,
        crate::gateway::handlers::create_transaction,
        crate::gateway::handlers::get_transaction,
        crate::gateway::handlers::list_account_transactions,
    ),
    components(
        schemas(
            HealthResponse,
            CreateTransactionRequest,
            TransactionRecord,
            TransactionStatus,
        )
    ),
    tags(
        (name = "Transaction", description = "Transfer orchestration and history"),
        (name = "System", description = "Health checks")
    )
)]
pub struct TransactionApiDoc;
