//! Health check handlers

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use utoipa::ToSchema;

use super::super::state::{AccountState, TransactionState};
use super::super::types::ApiResponse;

/// Health check response data
#[derive(serde::Serialize, serde::Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
}

type HealthReply = (StatusCode, Json<ApiResponse<HealthResponse>>);

fn reply(healthy: bool) -> HealthReply {
    if healthy {
        (
            StatusCode::OK,
            Json(ApiResponse::success(HealthResponse {
                timestamp_ms: chrono::Utc::now().timestamp_millis(),
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error(503, "unavailable")),
        )
    }
}

/// Account service health
///
/// Pings the ledger store. Internal details are logged, never returned.
#[utoipa::path(
    get,
    path = "/health-check",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Store unreachable")
    ),
    tag = "System"
)]
pub async fn account_health(State(state): State<Arc<AccountState>>) -> HealthReply {
    let healthy = match state.executor.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("[HEALTH] Ledger store ping failed: {}", e);
            false
        }
    };
    reply(healthy)
}

/// Transaction service health
#[utoipa::path(
    get,
    path = "/health-check",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Store unreachable")
    ),
    tag = "System"
)]
pub async fn transaction_health(State(state): State<Arc<TransactionState>>) -> HealthReply {
    let healthy = match state.orchestrator.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("[HEALTH] Transaction store ping failed: {}", e);
            false
        }
    };
    reply(healthy)
}
