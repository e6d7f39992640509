//! Account Service
//!
//! Serves account balances and applies transfers. Without a
//! `database_url` the ledger lives in memory and is lost on exit.
//!
//! Usage: account-service [--env dev] [--port 8081]

use std::sync::Arc;

use anyhow::Context;

use split_ledger::config::{self, AppConfig};
use split_ledger::db::{Database, schema};
use split_ledger::gateway::{self, AccountState};
use split_ledger::ledger::{LedgerExecutor, LedgerStore, MemoryLedgerStore, PgLedgerStore};
use split_ledger::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let env = config::env_from_args(&args);
    let app_config = AppConfig::load(&env).with_context(|| format!("loading {} config", env))?;
    let _log_guard = logging::init_logging(&app_config, "account-service");

    let svc = &app_config.account_service;
    tracing::info!("Starting Account Service in {} mode", env);

    let store: Arc<dyn LedgerStore> = match svc.database_url.as_deref() {
        Some(url) => {
            let db = Database::connect(url)
                .await
                .context("connecting to ledger database")?;
            db.init_schema(schema::LEDGER_SCHEMA)
                .await
                .context("initializing ledger schema")?;
            Arc::new(PgLedgerStore::new(db.pool().clone(), svc.lock_timeout()))
        }
        None => {
            tracing::warn!("No database_url configured, using in-memory ledger");
            Arc::new(MemoryLedgerStore::new(svc.lock_timeout()))
        }
    };

    let executor = Arc::new(LedgerExecutor::new(store));
    let app = gateway::account_router(Arc::new(AccountState::new(executor)));

    let port = config::port_from_args(&args).unwrap_or(svc.port);
    let addr = format!("{}:{}", svc.host, port);
    gateway::serve(&addr, app, "account-service")
        .await
        .context("account service stopped")?;
    Ok(())
}
