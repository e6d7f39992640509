//! Remote Ledger Client
//!
//! The transaction service's only view of the account service. Outcomes are
//! classified from the structured `code` of the response envelope:
//!
//! - `NotFound` / `Rejected`: the ledger answered and did not apply anything
//! - `Transport`: no trustworthy answer (refused, timed out, malformed,
//!   internal error); the transfer may or may not have been applied
//!
//! No implementation retries.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::gateway::types::ApiResponse;
use crate::ledger::{
    AccountId, AccountStatus, AppliedTransfer, LedgerError, LedgerErrorCode, LedgerExecutor,
    TransferCommand, TransferReceipt,
};

/// Account state as reported by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub balance: i64,
    pub currency: String,
    pub status: AccountStatus,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Account {0} not found")]
    NotFound(AccountId),

    #[error("{message}")]
    Rejected {
        code: LedgerErrorCode,
        message: String,
        account_id: Option<AccountId>,
    },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<LedgerError> for RemoteError {
    fn from(e: LedgerError) -> Self {
        match e.code() {
            // internal failures carry no verdict on whether anything was applied
            LedgerErrorCode::Internal => RemoteError::Transport(e.to_string()),
            code => RemoteError::Rejected {
                code,
                message: e.to_string(),
                account_id: e.account_id(),
            },
        }
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn fetch_account(&self, id: AccountId) -> Result<AccountSnapshot, RemoteError>;

    /// Ask the ledger to move `amount` from `source` to `dest`. The ledger
    /// applies each `idempotency_key` at most once.
    async fn request_transfer(
        &self,
        source: AccountId,
        dest: AccountId,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<TransferReceipt, RemoteError>;

    /// Whether the ledger applied a transfer under `idempotency_key`
    async fn lookup_transfer(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<AppliedTransfer>, RemoteError>;
}

// ============================================================================
// HTTP
// ============================================================================

#[derive(Serialize)]
struct TransferBody<'a> {
    dest_account_id: AccountId,
    amount: i64,
    idempotency_key: &'a str,
}

pub struct HttpLedgerClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLedgerClient {
    /// `base_url` like `http://127.0.0.1:8081`; every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("client build failed: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn transport(e: reqwest::Error) -> RemoteError {
        RemoteError::Transport(e.to_string())
    }

    /// Decode the envelope and classify non-success responses by code
    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, RemoteError> {
        let status = resp.status();
        let body: ApiResponse<serde_json::Value> = resp.json().await.map_err(|e| {
            RemoteError::Transport(format!("malformed response (HTTP {}): {}", status, e))
        })?;

        if status.is_success() && body.code == 0 {
            let data = body.data.ok_or_else(|| {
                RemoteError::Transport("success response without data".to_string())
            })?;
            return serde_json::from_value(data)
                .map_err(|e| RemoteError::Transport(format!("unexpected payload: {}", e)));
        }

        match LedgerErrorCode::from_code(body.code) {
            Some(code) if !status.is_success() && code != LedgerErrorCode::Internal => {
                let account_id = body
                    .data
                    .as_ref()
                    .and_then(|d| d.get("account_id"))
                    .and_then(|v| v.as_u64());
                Err(RemoteError::Rejected {
                    code,
                    message: body.msg,
                    account_id,
                })
            }
            _ => Err(RemoteError::Transport(format!(
                "unexpected response: HTTP {} code {} ({})",
                status, body.code, body.msg
            ))),
        }
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn fetch_account(&self, id: AccountId) -> Result<AccountSnapshot, RemoteError> {
        let url = format!("{}/accounts/{}", self.base_url, id);
        let resp = self.http.get(&url).send().await.map_err(Self::transport)?;
        match Self::decode(resp).await {
            Err(RemoteError::Rejected {
                code: LedgerErrorCode::AccountNotFound,
                ..
            }) => Err(RemoteError::NotFound(id)),
            other => other,
        }
    }

    async fn request_transfer(
        &self,
        source: AccountId,
        dest: AccountId,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<TransferReceipt, RemoteError> {
        let url = format!("{}/accounts/{}/transfer", self.base_url, source);
        let body = TransferBody {
            dest_account_id: dest,
            amount,
            idempotency_key,
        };
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::decode(resp).await
    }

    async fn lookup_transfer(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<AppliedTransfer>, RemoteError> {
        let url = format!("{}/transfers/{}", self.base_url, idempotency_key);
        let resp = self.http.get(&url).send().await.map_err(Self::transport)?;
        match Self::decode(resp).await {
            Ok(applied) => Ok(Some(applied)),
            Err(RemoteError::Rejected {
                code: LedgerErrorCode::TransferNotFound,
                ..
            }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// In-process
// ============================================================================

/// Calls an executor in the same process; used when both services share a
/// binary and by tests.
pub struct InProcessLedgerClient {
    executor: Arc<LedgerExecutor>,
}

impl InProcessLedgerClient {
    pub fn new(executor: Arc<LedgerExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl LedgerClient for InProcessLedgerClient {
    async fn fetch_account(&self, id: AccountId) -> Result<AccountSnapshot, RemoteError> {
        match self.executor.get_account(id).await {
            Ok(account) => Ok(AccountSnapshot {
                id: account.id,
                balance: account.balance,
                currency: account.currency,
                status: account.status,
            }),
            Err(LedgerError::AccountNotFound(id)) => Err(RemoteError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn request_transfer(
        &self,
        source: AccountId,
        dest: AccountId,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<TransferReceipt, RemoteError> {
        let cmd = TransferCommand::new(source, dest, amount).with_idempotency_key(idempotency_key);
        Ok(self.executor.transfer(&cmd).await?)
    }

    async fn lookup_transfer(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<AppliedTransfer>, RemoteError> {
        Ok(self.executor.lookup_transfer(idempotency_key).await?)
    }
}

/// Fault-injecting client for orchestrator tests
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct MockLedgerClient {
        inner: InProcessLedgerClient,
        fetch_count: AtomicUsize,
        transfer_count: AtomicUsize,
        /// Fail before reaching the ledger
        fail_transport: Mutex<bool>,
        /// Apply on the ledger, then lose the response
        lose_response: Mutex<bool>,
        /// Answer transfers with this instead of calling the ledger
        transfer_override: Mutex<Option<RemoteError>>,
        /// Report this balance in snapshots (a read that raced a debit)
        stale_balance: Mutex<Option<i64>>,
    }

    impl MockLedgerClient {
        pub fn new(executor: Arc<LedgerExecutor>) -> Self {
            Self {
                inner: InProcessLedgerClient::new(executor),
                fetch_count: AtomicUsize::new(0),
                transfer_count: AtomicUsize::new(0),
                fail_transport: Mutex::new(false),
                lose_response: Mutex::new(false),
                transfer_override: Mutex::new(None),
                stale_balance: Mutex::new(None),
            }
        }

        pub fn set_fail_transport(&self, fail: bool) {
            *self.fail_transport.lock().unwrap() = fail;
        }

        pub fn set_lose_response(&self, lose: bool) {
            *self.lose_response.lock().unwrap() = lose;
        }

        pub fn set_transfer_override(&self, err: Option<RemoteError>) {
            *self.transfer_override.lock().unwrap() = err;
        }

        pub fn set_stale_balance(&self, balance: Option<i64>) {
            *self.stale_balance.lock().unwrap() = balance;
        }

        pub fn fetch_count(&self) -> usize {
            self.fetch_count.load(Ordering::SeqCst)
        }

        pub fn transfer_count(&self) -> usize {
            self.transfer_count.load(Ordering::SeqCst)
        }

        fn transport_down(&self) -> bool {
            *self.fail_transport.lock().unwrap()
        }
    }

    #[async_trait]
    impl LedgerClient for MockLedgerClient {
        async fn fetch_account(&self, id: AccountId) -> Result<AccountSnapshot, RemoteError> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            if self.transport_down() {
                return Err(RemoteError::Transport("connection refused".into()));
            }
            let mut snapshot = self.inner.fetch_account(id).await?;
            if let Some(balance) = *self.stale_balance.lock().unwrap() {
                snapshot.balance = balance;
            }
            Ok(snapshot)
        }

        async fn request_transfer(
            &self,
            source: AccountId,
            dest: AccountId,
            amount: i64,
            idempotency_key: &str,
        ) -> Result<TransferReceipt, RemoteError> {
            self.transfer_count.fetch_add(1, Ordering::SeqCst);
            if self.transport_down() {
                return Err(RemoteError::Transport("connection refused".into()));
            }
            let injected = self.transfer_override.lock().unwrap().clone();
            if let Some(err) = injected {
                return Err(err);
            }
            let result = self
                .inner
                .request_transfer(source, dest, amount, idempotency_key)
                .await;
            if *self.lose_response.lock().unwrap() {
                return Err(RemoteError::Transport("response timed out".into()));
            }
            result
        }

        async fn lookup_transfer(
            &self,
            idempotency_key: &str,
        ) -> Result<Option<AppliedTransfer>, RemoteError> {
            if self.transport_down() {
                return Err(RemoteError::Transport("connection refused".into()));
            }
            self.inner.lookup_transfer(idempotency_key).await
        }
    }
}
