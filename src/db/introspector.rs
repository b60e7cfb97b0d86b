//! Live column introspection against PostgreSQL's information schema

use crate::error::Result;
use crate::schema_context::ColumnSource;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::warn;

pub const DEFAULT_SCHEMA: &str = "public";

pub struct PgColumnSource {
    pool: PgPool,
    schema: String,
}

impl PgColumnSource {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    /// Column names of `table` in ordinal order; empty when the table does not exist.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT column_name::text AS column_name
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(row.try_get::<String, _>("column_name")?);
        }
        Ok(columns)
    }
}

#[async_trait]
impl ColumnSource for PgColumnSource {
    async fn columns(&self, table: &str) -> Vec<String> {
        match self.table_columns(table).await {
            Ok(columns) => columns,
            Err(e) => {
                warn!(
                    "Column lookup for {}.{} failed, treating as missing: {}",
                    self.schema, table, e
                );
                Vec::new()
            }
        }
    }
}
