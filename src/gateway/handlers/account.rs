//! Account service handlers (accounts, transfers)

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use super::super::state::AccountState;
use super::super::types::{
    AccountData, ApiResult, CreateAccountRequest, TransferRequest, account_id_param, created, ok,
    validated,
};
use crate::ledger::{AccountId, AppliedTransfer, LedgerError, TransferCommand, TransferReceipt};

/// Open an account
///
/// POST /accounts
#[utoipa::path(
    post,
    path = "/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountData, content_type = "application/json"),
        (status = 400, description = "Invalid balance, currency or id"),
        (status = 409, description = "Account already exists")
    ),
    tag = "Account"
)]
pub async fn create_account(
    State(state): State<Arc<AccountState>>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<AccountData> {
    let req = validated(req)?;
    let account = state
        .executor
        .create_account(req.account_id, &req.initial_balance, req.currency.as_deref())
        .await?;
    created(account.into())
}

/// Get an account
///
/// GET /accounts/{id}
#[utoipa::path(
    get,
    path = "/accounts/{id}",
    params(
        ("id" = u64, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account details", body = AccountData, content_type = "application/json"),
        (status = 404, description = "Account not found")
    ),
    tag = "Account"
)]
pub async fn get_account(
    State(state): State<Arc<AccountState>>,
    Path(id): Path<AccountId>,
) -> ApiResult<AccountData> {
    let account = state.executor.get_account(account_id_param(id)?).await?;
    ok(account.into())
}

/// Move funds out of an account
///
/// POST /accounts/{id}/transfer
///
/// Both rows are locked in ascending id order. A repeated idempotency key
/// returns the original balances with `replayed = true`.
#[utoipa::path(
    post,
    path = "/accounts/{id}/transfer",
    params(
        ("id" = u64, Path, description = "Source account ID")
    ),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer applied", body = TransferReceipt, content_type = "application/json"),
        (status = 400, description = "Invalid amount, account id or same account"),
        (status = 404, description = "Account not found"),
        (status = 409, description = "Idempotency key reused with different parameters"),
        (status = 422, description = "Insufficient balance or inactive account"),
        (status = 503, description = "Lock timeout")
    ),
    tag = "Transfer"
)]
pub async fn transfer(
    State(state): State<Arc<AccountState>>,
    Path(source): Path<AccountId>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<TransferReceipt> {
    let source = account_id_param(source)?;
    let req = validated(req)?;
    let mut cmd = TransferCommand::new(source, req.dest_account_id, req.amount);
    if let Some(key) = req.idempotency_key {
        cmd = cmd.with_idempotency_key(key);
    }
    let receipt = state.executor.transfer(&cmd).await?;
    ok(receipt)
}

/// Look up an applied transfer by idempotency key
///
/// GET /transfers/{key}
#[utoipa::path(
    get,
    path = "/transfers/{key}",
    params(
        ("key" = String, Path, description = "Idempotency key")
    ),
    responses(
        (status = 200, description = "Applied transfer", body = AppliedTransfer, content_type = "application/json"),
        (status = 404, description = "No transfer applied under this key")
    ),
    tag = "Transfer"
)]
pub async fn get_transfer(
    State(state): State<Arc<AccountState>>,
    Path(key): Path<String>,
) -> ApiResult<AppliedTransfer> {
    match state.executor.lookup_transfer(&key).await? {
        Some(applied) => ok(applied),
        None => Err(LedgerError::TransferNotFound(key).into()),
    }
}
