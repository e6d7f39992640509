//! DDL for both services. Each service owns its own database; the statements
//! are split so neither binary creates the other's tables.

/// Account service: balances plus the applied-transfer dedupe table
pub const LEDGER_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts_tb (
        account_id  BIGINT PRIMARY KEY,
        balance     BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0),
        currency    VARCHAR(3) NOT NULL DEFAULT 'USD' CHECK (currency IN ('USD')),
        status      VARCHAR(10) NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'inactive')),
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_transfers_tb (
        idempotency_key    VARCHAR(64) PRIMARY KEY,
        source_account_id  BIGINT NOT NULL,
        dest_account_id    BIGINT NOT NULL,
        amount             BIGINT NOT NULL CHECK (amount > 0),
        source_balance     BIGINT NOT NULL,
        dest_balance       BIGINT NOT NULL,
        applied_at         TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// Transaction service: transfer intents
pub const TRANSACTION_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS transactions_tb (
        transaction_id     VARCHAR(26) PRIMARY KEY,
        source_account_id  BIGINT NOT NULL,
        dest_account_id    BIGINT NOT NULL,
        amount             BIGINT NOT NULL CHECK (amount > 0),
        currency           VARCHAR(3) NOT NULL DEFAULT 'USD',
        status             VARCHAR(20) NOT NULL CHECK (status IN ('pending', 'completed', 'failed')),
        description        TEXT NOT NULL DEFAULT '',
        created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CHECK (source_account_id <> dest_account_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_transactions_source ON transactions_tb (source_account_id)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_dest ON transactions_tb (dest_account_id)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_pending ON transactions_tb (updated_at) WHERE status = 'pending'",
];
