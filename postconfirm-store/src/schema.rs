use sqlx::PgPool;

use postconfirm_core::StoreError;

/// DDL for the store schema described in the external interfaces section:
/// two sender tables (dynamic + static overlay) and two stash tables.
/// `senders_static`/`stash_static` are operator-managed in production and
/// are only created here so a fresh install (or the test harness) has
/// somewhere to seed rows.
const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS senders (
        sender TEXT NOT NULL,
        type CHAR(1) NOT NULL CHECK (type IN ('E', 'P')),
        action TEXT NOT NULL,
        ref TEXT,
        source TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (sender, type)
    )",
    "CREATE TABLE IF NOT EXISTS senders_static (
        sender TEXT NOT NULL,
        type CHAR(1) NOT NULL CHECK (type IN ('E', 'P')),
        action TEXT NOT NULL,
        ref TEXT,
        source TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (sender, type)
    )",
    "CREATE TABLE IF NOT EXISTS stash (
        id SERIAL PRIMARY KEY,
        sender TEXT NOT NULL,
        recipients TEXT NOT NULL,
        message TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS stash_static (
        id SERIAL PRIMARY KEY,
        sender TEXT NOT NULL,
        recipients TEXT NOT NULL,
        message TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS idx_stash_sender ON stash (sender, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_stash_static_sender ON stash_static (sender, created_at)",
];

/// Create the store schema if it does not already exist. Idempotent, safe
/// to call on every daemon startup.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
    }
    Ok(())
}
