use alertdesk_shared::{Alert, AlertId};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;

use super::query::{compile_mutations, push_filter, push_set};
use crate::errors::StoreError;
use crate::interfaces::AlertStore;
use crate::types::{AlertFilter, AlertMutation, FindOptions, SortOrder};

pub struct PostgresAlertStore {
    pool: PgPool,
}

impl PostgresAlertStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode(row: &sqlx::postgres::PgRow) -> Result<Alert, StoreError> {
    let doc: Value = row.try_get("doc")?;
    Ok(serde_json::from_value(doc)?)
}

#[async_trait]
impl AlertStore for PostgresAlertStore {
    async fn find_many(
        &self,
        filter: &AlertFilter,
        options: FindOptions,
    ) -> Result<Vec<Alert>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT doc FROM alerts");
        push_filter(&mut qb, filter);
        match options.sort {
            Some(SortOrder::Ascending) => {
                qb.push(" ORDER BY (doc->>'first_seen')::timestamptz ASC");
            }
            Some(SortOrder::Descending) => {
                qb.push(" ORDER BY (doc->>'first_seen')::timestamptz DESC");
            }
            None => {}
        }
        if let Some(limit) = options.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }
        if let Some(skip) = options.skip {
            qb.push(" OFFSET ").push_bind(skip as i64);
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        debug!(count = rows.len(), "Fetched alerts");
        rows.iter().map(decode).collect()
    }

    async fn find_one(&self, filter: &AlertFilter) -> Result<Option<Alert>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT doc FROM alerts");
        push_filter(&mut qb, filter);
        qb.push(" LIMIT 1");

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(decode).transpose()
    }

    async fn insert(&self, alert: &Alert) -> Result<AlertId, StoreError> {
        let doc = serde_json::to_value(alert)?;
        sqlx::query("INSERT INTO alerts (id, doc) VALUES ($1, $2)")
            .bind(alert.id)
            .bind(doc)
            .execute(&self.pool)
            .await?;
        Ok(alert.id)
    }

    async fn update_one(
        &self,
        filter: &AlertFilter,
        mutations: &[AlertMutation],
    ) -> Result<u64, StoreError> {
        let compiled = compile_mutations(mutations)?;
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE alerts");
        push_set(&mut qb, compiled);
        qb.push(" WHERE id = (SELECT id FROM alerts");
        push_filter(&mut qb, filter);
        qb.push(" LIMIT 1)");

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn update_many(
        &self,
        filter: &AlertFilter,
        mutations: &[AlertMutation],
    ) -> Result<u64, StoreError> {
        let compiled = compile_mutations(mutations)?;
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE alerts");
        push_set(&mut qb, compiled);
        push_filter(&mut qb, filter);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
