//! API response envelope and error mapping
//!
//! - `ApiResponse<T>`: unified response wrapper shared by both services
//! - `ApiError`: handler error that renders as an `ApiResponse`

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ledger::{LedgerError, LedgerErrorCode};
use crate::transaction::TransactionError;

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: payload on success; on failure, optional context
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Error payload naming the account a ledger failure is about
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountErrorData {
    pub account_id: u64,
}

/// Handler error rendered as `ApiResponse<serde_json::Value>`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
            data: None,
        }
    }

    /// Request body or path failed validation
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            LedgerErrorCode::InvalidParameter.code(),
            msg,
        )
    }

    /// Attach context. Serialization failures drop the data, not the error.
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let code = e.code();
        let err = Self::new(status_from(code.http_status()), code.code(), e.to_string());
        match e.account_id() {
            Some(account_id) => err.with_data(&AccountErrorData { account_id }),
            None => err,
        }
    }
}

impl From<TransactionError> for ApiError {
    fn from(e: TransactionError) -> Self {
        Self::new(status_from(e.http_status()), e.api_code(), e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, msg = %self.msg, "Request failed");
        }
        let body = ApiResponse {
            code: self.code,
            msg: self.msg,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Handler result: status plus enveloped payload, or an `ApiError`
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["msg"], "ok");
        assert_eq!(json["data"], 42);
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let json = serde_json::to_value(ApiResponse::<()>::error(1001, "bad")).unwrap();
        assert_eq!(json["code"], 1001);
        assert!(json.get("data").is_none());

        let back: ApiResponse<serde_json::Value> = serde_json::from_value(json).unwrap();
        assert!(back.data.is_none());
    }

    #[test]
    fn test_ledger_error_carries_account_id() {
        let err = ApiError::from(LedgerError::AccountNotFound(7));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, 2001);
        assert_eq!(err.data.unwrap()["account_id"], 7);

        let err = ApiError::from(LedgerError::InvalidAmount);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.data.is_none());
    }

    #[test]
    fn test_transaction_error_status() {
        let err = ApiError::from(TransactionError::Transport("refused".into()));
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.code, 5030);
    }
}
