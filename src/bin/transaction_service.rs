//! Transaction Service
//!
//! Accepts transfer requests, records them, and drives them through the
//! Account Service at `account_service_url`.
//!
//! Usage: transaction-service [--env dev] [--port 8082]

use std::sync::Arc;

use anyhow::Context;

use split_ledger::config::{self, AppConfig};
use split_ledger::db::{Database, schema};
use split_ledger::gateway::{self, TransactionState};
use split_ledger::logging;
use split_ledger::transaction::{
    HttpLedgerClient, MemoryTransactionStore, PgTransactionStore, Reconciler, ReconcilerConfig,
    TransactionOrchestrator, TransactionStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let env = config::env_from_args(&args);
    let app_config = AppConfig::load(&env).with_context(|| format!("loading {} config", env))?;
    let _log_guard = logging::init_logging(&app_config, "transaction-service");

    let svc = &app_config.transaction_service;
    tracing::info!("Starting Transaction Service in {} mode", env);

    let store: Arc<dyn TransactionStore> = match svc.database_url.as_deref() {
        Some(url) => {
            let db = Database::connect(url)
                .await
                .context("connecting to transaction database")?;
            db.init_schema(schema::TRANSACTION_SCHEMA)
                .await
                .context("initializing transaction schema")?;
            Arc::new(PgTransactionStore::new(db.pool().clone()))
        }
        None => {
            tracing::warn!("No database_url configured, using in-memory transaction store");
            Arc::new(MemoryTransactionStore::new())
        }
    };

    let ledger = HttpLedgerClient::new(&svc.account_service_url, svc.request_timeout())
        .context("building account service client")?;
    tracing::info!(url = %svc.account_service_url, "Account Service client ready");

    let orchestrator = Arc::new(TransactionOrchestrator::new(store, Arc::new(ledger)));

    if svc.reconciler.enabled {
        let reconciler = Reconciler::new(
            orchestrator.clone(),
            ReconcilerConfig::from(&svc.reconciler),
        );
        tokio::spawn(async move {
            reconciler.run().await;
        });
    }

    let app = gateway::transaction_router(Arc::new(TransactionState::new(orchestrator)));

    let port = config::port_from_args(&args).unwrap_or(svc.port);
    let addr = format!("{}:{}", svc.host, port);
    gateway::serve(&addr, app, "transaction-service")
        .await
        .context("transaction service stopped")?;
    Ok(())
}
