//! Schema Context Builder
//!
//! Turns a caller-supplied schema hint, or columns looked up from a live schema source,
//! into the text block that describes available tables to the model.

use crate::artifact::SchemaHint;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Tables probed when the caller gives no schema hint.
pub const WELL_KNOWN_TABLES: [&str; 3] = ["sales", "customer", "raw_sales"];

pub const FALLBACK_CONTEXT: &str = "No schema context provided. Assume standard sales(customer_id,id,price,order_date) and customer(id,name,email).";

/// Read-only column lookup.
///
/// Implementations never fail: a missing table or an unreachable source yields an empty list.
#[async_trait]
pub trait ColumnSource: Send + Sync {
    async fn columns(&self, table: &str) -> Vec<String>;
}

/// Source with no tables at all; used when no database is configured.
pub struct NoColumns;

#[async_trait]
impl ColumnSource for NoColumns {
    async fn columns(&self, _table: &str) -> Vec<String> {
        Vec::new()
    }
}

/// In-memory source, handy for tests and fixtures.
#[derive(Debug, Clone, Default)]
pub struct StaticColumnSource {
    tables: HashMap<String, Vec<String>>,
}

impl StaticColumnSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: &str, columns: &[&str]) -> Self {
        self.tables.insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl ColumnSource for StaticColumnSource {
    async fn columns(&self, table: &str) -> Vec<String> {
        self.tables.get(table).cloned().unwrap_or_default()
    }
}

fn describe_table(table: &str, columns: &[String]) -> String {
    format!("Table `{}` has columns: {}", table, columns.join(", "))
}

/// Build the schema description for one request.
pub async fn build_context(hint: Option<&SchemaHint>, source: &dyn ColumnSource) -> String {
    let mut lines = Vec::new();

    match hint {
        Some(tables) if !tables.is_empty() => {
            for (table, columns) in tables {
                lines.push(describe_table(table, columns));
            }
        }
        _ => {
            for table in WELL_KNOWN_TABLES {
                let columns = source.columns(table).await;
                if columns.is_empty() {
                    debug!("No columns found for well-known table '{}'", table);
                    continue;
                }
                lines.push(describe_table(table, &columns));
            }
        }
    }

    if lines.is_empty() {
        lines.push(FALLBACK_CONTEXT.to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(pairs: &[(&str, &[&str])]) -> SchemaHint {
        pairs
            .iter()
            .map(|(t, cols)| (t.to_string(), cols.iter().map(|c| c.to_string()).collect()))
            .collect()
    }

    #[tokio::test]
    async fn test_single_table_hint() {
        let tables = hint(&[("sales", &["id", "price"])]);
        let context = build_context(Some(&tables), &NoColumns).await;
        assert_eq!(context, "Table `sales` has columns: id, price");
    }

    #[tokio::test]
    async fn test_hint_order_is_preserved() {
        let tables = hint(&[
            ("sales", &["id", "customer_id", "price", "order_date"]),
            ("customer", &["id", "name", "email"]),
        ]);
        let context = build_context(Some(&tables), &NoColumns).await;
        assert_eq!(
            context,
            "Table `sales` has columns: id, customer_id, price, order_date\n\
             Table `customer` has columns: id, name, email"
        );
    }

    #[tokio::test]
    async fn test_hint_overrides_live_source() {
        let source = StaticColumnSource::new().with_table("sales", &["should", "not", "appear"]);
        let tables = hint(&[("orders", &["id"])]);
        let context = build_context(Some(&tables), &source).await;
        assert_eq!(context, "Table `orders` has columns: id");
    }

    #[tokio::test]
    async fn test_empty_hint_uses_live_source() {
        let source = StaticColumnSource::new()
            .with_table("raw_sales", &["id", "amount", "created_at"])
            .with_table("sales", &["id", "price"])
            .with_table("unrelated", &["x"]);
        let context = build_context(Some(&SchemaHint::new()), &source).await;
        assert_eq!(
            context,
            "Table `sales` has columns: id, price\n\
             Table `raw_sales` has columns: id, amount, created_at"
        );
    }

    #[tokio::test]
    async fn test_fallback_when_nothing_found() {
        assert_eq!(build_context(None, &NoColumns).await, FALLBACK_CONTEXT);
        assert_eq!(
            build_context(Some(&SchemaHint::new()), &NoColumns).await,
            FALLBACK_CONTEXT
        );
    }
}
