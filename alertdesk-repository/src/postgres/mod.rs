//! PostgreSQL backends.
//!
//! Alerts, correlation rules and changes are stored one JSONB document per row,
//! keyed by UUID. Filters and mutations are compiled to SQL with
//! `sqlx::QueryBuilder`; every mutation list becomes a single `UPDATE`, so a
//! document is never observed half-mutated.

mod alert_store;
mod query;
mod records;

pub use alert_store::PostgresAlertStore;
pub use records::{PostgresChangeStore, PostgresRuleStore};

pub use sqlx::PgPool;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::errors::StoreError;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS alerts (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE INDEX IF NOT EXISTS alerts_entity_idx ON alerts ((doc->>'entity'))",
    "CREATE INDEX IF NOT EXISTS alerts_host_idx ON alerts ((doc->>'host'))",
    "CREATE INDEX IF NOT EXISTS alerts_status_idx ON alerts ((doc->>'status'))",
    "CREATE INDEX IF NOT EXISTS alerts_group_alerts_idx ON alerts USING GIN ((doc->'group_alerts'))",
    "CREATE TABLE IF NOT EXISTS correlation_rules (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE TABLE IF NOT EXISTS changes (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE INDEX IF NOT EXISTS changes_affected_idx ON changes USING GIN ((doc->'affected_entities'))",
];

/// Open a connection pool against `database_url`.
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::unavailable(format!("postgres connect failed: {}", e)))?;
    Ok(pool)
}

/// Create the document tables and their indexes if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("PostgreSQL schema ready");
    Ok(())
}
