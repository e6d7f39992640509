pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use state::{AccountState, TransactionState};

/// Account Service routes
pub fn account_router(state: Arc<AccountState>) -> Router {
    Router::new()
        .route("/health-check", get(handlers::account_health))
        .route("/accounts", post(handlers::create_account))
        .route("/accounts/{id}", get(handlers::get_account))
        .route("/accounts/{id}/transfer", post(handlers::transfer))
        .route("/transfers/{key}", get(handlers::get_transfer))
        .with_state(state)
        // stateless, added after with_state
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", openapi::AccountApiDoc::openapi()),
        )
}

/// Transaction Service routes
pub fn transaction_router(state: Arc<TransactionState>) -> Router {
    Router::new()
        .route("/health-check", get(handlers::transaction_health))
        .route("/transactions", post(handlers::create_transaction))
        .route("/transactions/{id}", get(handlers::get_transaction))
        .route(
            "/accounts/{id}/transactions",
            get(handlers::list_account_transactions),
        )
        .with_state(state)
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", openapi::TransactionApiDoc::openapi()),
        )
}

/// Bind `addr` and serve `app` until the process exits
pub async fn serve(addr: &str, app: Router, service: &str) -> std::io::Result<()> {
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(service, addr, "Failed to bind: {}", e);
            return Err(e);
        }
    };
    tracing::info!(service, "Listening on http://{}", addr);
    tracing::info!(service, "API Docs: http://{}/docs", addr);
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::ledger::{LedgerExecutor, MemoryLedgerStore};
    use crate::transaction::{
        InProcessLedgerClient, MemoryTransactionStore, TransactionOrchestrator,
    };

    fn executor() -> Arc<LedgerExecutor> {
        let store = MemoryLedgerStore::new(std::time::Duration::from_secs(1));
        Arc::new(LedgerExecutor::new(Arc::new(store)))
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_account_routes() {
        let app = account_router(Arc::new(AccountState::new(executor())));

        let (status, body) = call(
            app.clone(),
            post_json(
                "/accounts",
                serde_json::json!({"account_id": 1, "initial_balance": "100.00"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["balance"], 10_000);

        let (status, body) = call(app.clone(), get("/accounts/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"]["currency"], "USD");

        let (status, body) = call(app.clone(), get("/accounts/99")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 2001);
        assert_eq!(body["data"]["account_id"], 99);

        let (status, body) = call(app, get("/transfers/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 2004);
    }

    #[tokio::test]
    async fn test_transfer_route_and_replay() {
        let exec = executor();
        exec.create_account(1, "100", None).await.unwrap();
        exec.create_account(2, "0", None).await.unwrap();
        let app = account_router(Arc::new(AccountState::new(exec)));

        let body = serde_json::json!({"dest_account_id": 2, "amount": 2500, "idempotency_key": "k1"});
        let (status, first) = call(app.clone(), post_json("/accounts/1/transfer", body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["data"]["source_balance"], 7_500);
        assert_eq!(first["data"]["replayed"], false);

        let (_, second) = call(app.clone(), post_json("/accounts/1/transfer", body)).await;
        assert_eq!(second["data"]["dest_balance"], 2_500);
        assert_eq!(second["data"]["replayed"], true);

        let (status, applied) = call(app.clone(), get("/transfers/k1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(applied["data"]["amount"], 2_500);

        let (status, body) = call(
            app,
            post_json(
                "/accounts/1/transfer",
                serde_json::json!({"dest_account_id": 2, "amount": 1_000_000}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], 3001);
    }

    #[tokio::test]
    async fn test_invalid_body_rejected() {
        let app = account_router(Arc::new(AccountState::new(executor())));
        let (status, body) = call(
            app,
            post_json(
                "/accounts",
                serde_json::json!({"account_id": 0, "initial_balance": "1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 1003);
    }

    #[tokio::test]
    async fn test_account_ids_past_bigint_rejected() {
        let exec = executor();
        exec.create_account(1, "100", None).await.unwrap();
        let app = account_router(Arc::new(AccountState::new(exec)));

        let (status, body) = call(
            app.clone(),
            post_json(
                "/accounts/18446744073709551615/transfer",
                serde_json::json!({"dest_account_id": 1, "amount": 1}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 1003);

        let (status, body) = call(
            app.clone(),
            post_json(
                "/accounts/1/transfer",
                serde_json::json!({"dest_account_id": 9223372036854775808u64, "amount": 1}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 1003);

        let (status, body) = call(app, get("/accounts/9223372036854775808")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 1003);
    }

    #[tokio::test]
    async fn test_transaction_routes() {
        let exec = executor();
        exec.create_account(1, "100", None).await.unwrap();
        exec.create_account(2, "0", None).await.unwrap();
        let orchestrator = TransactionOrchestrator::new(
            Arc::new(MemoryTransactionStore::new()),
            Arc::new(InProcessLedgerClient::new(exec)),
        );
        let app = transaction_router(Arc::new(TransactionState::new(Arc::new(orchestrator))));

        let (status, created) = call(
            app.clone(),
            post_json(
                "/transactions",
                serde_json::json!({"source_account_id": 1, "destination_account_id": 2, "amount": 4000}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"]["status"], "completed");
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let (status, fetched) = call(app.clone(), get(&format!("/transactions/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"]["amount"], 4000);

        let (_, listed) = call(app.clone(), get("/accounts/2/transactions?limit=10")).await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);

        let (status, _) = call(app.clone(), get("/transactions/not-a-ulid")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(
            app.clone(),
            post_json(
                "/transactions",
                serde_json::json!({"source_account_id": 1, "destination_account_id": 1, "amount": 1}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("data").is_none());

        let (status, _) = call(app, get("/health-check")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
