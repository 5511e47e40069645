use alertdesk_shared::{Change, ChangeStatus, CorrelationRule};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::errors::StoreError;
use crate::interfaces::{ChangeStore, RuleStore};
use crate::types::ChangeWindow;

fn decode_doc<T: DeserializeOwned>(row: &PgRow) -> Result<T, StoreError> {
    let doc: Value = row.try_get("doc")?;
    Ok(serde_json::from_value(doc)?)
}

pub struct PostgresRuleStore {
    pool: PgPool,
}

impl PostgresRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleStore for PostgresRuleStore {
    async fn list_rules(&self) -> Result<Vec<CorrelationRule>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM correlation_rules ORDER BY doc->>'name'")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_doc).collect()
    }
}

pub struct PostgresChangeStore {
    pool: PgPool,
}

impl PostgresChangeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangeStore for PostgresChangeStore {
    async fn find_changes_affecting(
        &self,
        entities: &[String],
        statuses: &[ChangeStatus],
        window: ChangeWindow,
        limit: usize,
    ) -> Result<Vec<Change>, StoreError> {
        if entities.is_empty() || statuses.is_empty() {
            return Ok(Vec::new());
        }
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();

        let rows = sqlx::query(
            "SELECT doc FROM changes \
             WHERE doc->>'status' = ANY($1) \
               AND (doc->>'start_time')::timestamptz <= $2 \
               AND (doc->>'end_time' IS NULL OR (doc->>'end_time')::timestamptz >= $3) \
               AND doc->'affected_entities' ?| $4 \
             ORDER BY (doc->>'start_time')::timestamptz DESC \
             LIMIT $5",
        )
        .bind(&statuses)
        .bind(window.end)
        .bind(window.start)
        .bind(entities)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_doc).collect()
    }
}
