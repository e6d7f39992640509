//! Transaction service handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::super::state::TransactionState;
use super::super::types::{
    ApiError, ApiResult, CreateTransactionRequest, ListTransactionsQuery, account_id_param,
    created, ok, validated,
};
use crate::ledger::AccountId;
use crate::transaction::{TransactionRecord, TransferOutcome};

/// Transfer funds between two accounts
///
/// POST /transactions
///
/// A persisted-but-failed transaction is returned under `data` alongside
/// the error code.
#[utoipa::path(
    post,
    path = "/transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction completed", body = TransactionRecord, content_type = "application/json"),
        (status = 400, description = "Invalid amount or same account"),
        (status = 404, description = "Source or destination account not found"),
        (status = 422, description = "Insufficient balance or inactive account"),
        (status = 502, description = "Ledger unreachable"),
        (status = 503, description = "Ledger lock timeout")
    ),
    tag = "Transaction"
)]
pub async fn create_transaction(
    State(state): State<Arc<TransactionState>>,
    Json(req): Json<CreateTransactionRequest>,
) -> ApiResult<TransactionRecord> {
    let req = validated(req)?;
    match state.orchestrator.create_transaction(req.into()).await? {
        TransferOutcome::Completed(record) => created(record),
        TransferOutcome::Failed { record, error } => Err(ApiError::from(error).with_data(&record)),
    }
}

/// Get a transaction by id
///
/// GET /transactions/{id}
#[utoipa::path(
    get,
    path = "/transactions/{id}",
    params(
        ("id" = String, Path, description = "Transaction ID (ULID)")
    ),
    responses(
        (status = 200, description = "Transaction", body = TransactionRecord, content_type = "application/json"),
        (status = 404, description = "Transaction not found")
    ),
    tag = "Transaction"
)]
pub async fn get_transaction(
    State(state): State<Arc<TransactionState>>,
    Path(id): Path<String>,
) -> ApiResult<TransactionRecord> {
    let record = state.orchestrator.get_transaction_str(&id).await?;
    ok(record)
}

/// Transactions touching an account, newest first
///
/// GET /accounts/{id}/transactions?limit=50
#[utoipa::path(
    get,
    path = "/accounts/{id}/transactions",
    params(
        ("id" = u64, Path, description = "Account ID"),
        ListTransactionsQuery
    ),
    responses(
        (status = 200, description = "Transactions as source or destination", body = Vec<TransactionRecord>, content_type = "application/json")
    ),
    tag = "Transaction"
)]
pub async fn list_account_transactions(
    State(state): State<Arc<TransactionState>>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<ListTransactionsQuery>,
) -> ApiResult<Vec<TransactionRecord>> {
    let records = state
        .orchestrator
        .list_account_transactions(account_id_param(account_id)?, query.limit)
        .await?;
    ok(records)
}
