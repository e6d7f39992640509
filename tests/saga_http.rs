//! End-to-end: the Account Service router on an ephemeral port, driven by
//! the Transaction Service over HTTP.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use split_ledger::gateway::{self, AccountState, TransactionState};
use split_ledger::ledger::{LedgerExecutor, MemoryLedgerStore};
use split_ledger::transaction::{
    CreateTransaction, HttpLedgerClient, LedgerClient, MemoryTransactionStore, Reconciler,
    ReconcilerConfig, RemoteError, TransactionError, TransactionOrchestrator, TransactionRecord,
    TransactionStatus, TransactionStore,
};

async fn spawn_app(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

struct Services {
    executor: Arc<LedgerExecutor>,
    store: Arc<MemoryTransactionStore>,
    orchestrator: Arc<TransactionOrchestrator>,
    ledger_url: String,
}

async fn start() -> Services {
    let ledger_store = MemoryLedgerStore::new(Duration::from_secs(2));
    let executor = Arc::new(LedgerExecutor::new(Arc::new(ledger_store)));
    executor.create_account(1, "100.00", None).await.unwrap();
    executor.create_account(2, "0", None).await.unwrap();

    let ledger_url = spawn_app(gateway::account_router(Arc::new(AccountState::new(
        executor.clone(),
    ))))
    .await;

    let client = HttpLedgerClient::new(&ledger_url, Duration::from_secs(5)).unwrap();
    let store = Arc::new(MemoryTransactionStore::new());
    let orchestrator = Arc::new(TransactionOrchestrator::new(
        store.clone(),
        Arc::new(client),
    ));

    Services {
        executor,
        store,
        orchestrator,
        ledger_url,
    }
}

fn transfer(source: u64, dest: u64, amount: i64) -> CreateTransaction {
    CreateTransaction {
        source_account_id: source,
        dest_account_id: dest,
        amount,
        description: "e2e".to_string(),
    }
}

#[tokio::test]
async fn transfer_completes_over_http() {
    let svc = start().await;

    let outcome = svc
        .orchestrator
        .create_transaction(transfer(1, 2, 5_000))
        .await
        .unwrap();
    assert!(outcome.is_completed());
    assert_eq!(outcome.record().status, TransactionStatus::Completed);

    assert_eq!(svc.executor.get_account(1).await.unwrap().balance, 5_000);
    assert_eq!(svc.executor.get_account(2).await.unwrap().balance, 5_000);

    let key = outcome.record().id.to_string();
    let applied = svc
        .orchestrator
        .ledger()
        .lookup_transfer(&key)
        .await
        .unwrap()
        .expect("transfer recorded under the transaction id");
    assert_eq!(applied.amount, 5_000);
}

#[tokio::test]
async fn precheck_rejections_create_no_record() {
    let svc = start().await;

    let err = svc
        .orchestrator
        .create_transaction(transfer(1, 2, 15_000))
        .await
        .unwrap_err();
    assert!(matches!(err, TransactionError::InsufficientBalance));

    let err = svc
        .orchestrator
        .create_transaction(transfer(1, 99, 100))
        .await
        .unwrap_err();
    assert_eq!(err, TransactionError::DestAccountNotFound(99));

    let err = svc
        .orchestrator
        .create_transaction(transfer(42, 2, 100))
        .await
        .unwrap_err();
    assert_eq!(err, TransactionError::SourceAccountNotFound(42));

    assert!(svc.store.is_empty());
    assert_eq!(svc.executor.get_account(1).await.unwrap().balance, 10_000);
}

#[tokio::test]
async fn http_client_decodes_ledger_errors() {
    let svc = start().await;
    let client = HttpLedgerClient::new(&svc.ledger_url, Duration::from_secs(5)).unwrap();

    let snapshot = client.fetch_account(1).await.unwrap();
    assert_eq!(snapshot.balance, 10_000);
    assert_eq!(client.fetch_account(7).await, Err(RemoteError::NotFound(7)));

    let rejected = client.request_transfer(1, 2, 1_000_000, "too-big").await;
    assert!(matches!(rejected, Err(RemoteError::Rejected { .. })));

    let first = client.request_transfer(1, 2, 100, "k-1").await.unwrap();
    let again = client.request_transfer(1, 2, 100, "k-1").await.unwrap();
    assert!(!first.replayed);
    assert!(again.replayed);
    assert_eq!(first.source_balance, again.source_balance);

    assert!(client.lookup_transfer("never-used").await.unwrap().is_none());
}

#[tokio::test]
async fn ledger_down_is_transport_error() {
    let client = HttpLedgerClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let orchestrator = TransactionOrchestrator::new(
        Arc::new(MemoryTransactionStore::new()),
        Arc::new(client),
    );

    let err = orchestrator
        .create_transaction(transfer(1, 2, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, TransactionError::Transport(_)));
}

#[tokio::test]
async fn reconciler_finishes_stuck_pending_over_http() {
    let svc = start().await;

    // A record left pending by a crash between persist and transfer
    let stuck = TransactionRecord::pending(1, 2, 2_000, "USD", "stuck");
    svc.store.create(&stuck).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let reconciler = Reconciler::new(
        svc.orchestrator.clone(),
        ReconcilerConfig {
            stale_threshold: Duration::ZERO,
            ..ReconcilerConfig::default()
        },
    );
    let stats = reconciler.scan_and_reconcile().await.unwrap();
    assert_eq!(stats.completed, 1);

    let record = svc.store.get(stuck.id).await.unwrap().unwrap();
    assert_eq!(record.status, TransactionStatus::Completed);
    assert_eq!(svc.executor.get_account(2).await.unwrap().balance, 2_000);

    // second pass finds nothing and moves no money
    let stats = reconciler.scan_and_reconcile().await.unwrap();
    assert_eq!(stats.scanned, 0);
    assert_eq!(svc.executor.get_account(1).await.unwrap().balance, 8_000);
}

#[tokio::test]
async fn transaction_service_http_surface() {
    let svc = start().await;
    let base = spawn_app(gateway::transaction_router(Arc::new(TransactionState::new(
        svc.orchestrator.clone(),
    ))))
    .await;
    let http = reqwest::Client::new();

    let resp = http
        .post(format!("{}/transactions", base))
        .json(&json!({"source_account_id": 1, "destination_account_id": 2, "amount": 3_000}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["status"], "completed");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = http
        .get(format!("{}/transactions/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = http
        .post(format!("{}/transactions", base))
        .json(&json!({"source_account_id": 2, "destination_account_id": 1, "amount": 999_999}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 3001);

    let listed: Value = http
        .get(format!("{}/accounts/1/transactions", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let docs = http
        .get(format!("{}/api-docs/openapi.json", base))
        .send()
        .await
        .unwrap();
    assert_eq!(docs.status(), 200);
}
