//! Static guardrail templates
//!
//! Three named templates with `{{ name }}` placeholders. Only bare identifiers are
//! placeholders, so dbt macro calls such as `{{ source('raw', 'sales') }}` pass through.

use crate::artifact::TemplateArtifact;
use crate::error::{PipelineError, Result};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::path::Path;
use tracing::info;

pub const PYSPARK_INGEST: &str = "pyspark_ingest";
pub const SQL_INGEST: &str = "sql_ingest";
pub const DBT_STG_SALES: &str = "dbt_stg_sales";

pub const TEMPLATE_EXTENSION: &str = "tpl";

pub const DEFAULT_PARTITION_DATE_EXPR: &str = "yesterday";
pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_DATE_COLUMN: &str = "order_date";

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap();
}

/// Substitute `{{ key }}` placeholders; unknown keys render as empty text.
pub fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            params
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Loaded template sources. Read-only after construction and safe to share.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    pyspark_ingest: String,
    sql_ingest: String,
    dbt_stg_sales: String,
}

impl TemplateStore {
    /// Templates compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            pyspark_ingest: include_str!("../templates/pyspark_ingest.tpl").to_string(),
            sql_ingest: include_str!("../templates/sql_ingest.tpl").to_string(),
            dbt_stg_sales: include_str!("../templates/dbt_stg_sales.tpl").to_string(),
        }
    }

    pub fn from_sources(pyspark_ingest: &str, sql_ingest: &str, dbt_stg_sales: &str) -> Self {
        Self {
            pyspark_ingest: pyspark_ingest.to_string(),
            sql_ingest: sql_ingest.to_string(),
            dbt_stg_sales: dbt_stg_sales.to_string(),
        }
    }

    /// Read `<name>.tpl` for each template from `dir`. Any missing file is an error.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let read = |name: &str| -> Result<String> {
            let path = dir.join(format!("{}.{}", name, TEMPLATE_EXTENSION));
            std::fs::read_to_string(&path).map_err(|e| {
                PipelineError::Template(format!(
                    "failed to load template '{}' from {}: {}",
                    name,
                    path.display(),
                    e
                ))
            })
        };

        let store = Self {
            pyspark_ingest: read(PYSPARK_INGEST)?,
            sql_ingest: read(SQL_INGEST)?,
            dbt_stg_sales: read(DBT_STG_SALES)?,
        };
        info!("Loaded templates from {}", dir.display());
        Ok(store)
    }

    pub fn render_pyspark(&self, s3_prefix: &str, partition_date_expr: &str) -> String {
        substitute(
            &self.pyspark_ingest,
            &[
                ("s3_prefix", s3_prefix),
                ("partition_date_expr", partition_date_expr),
            ],
        )
    }

    pub fn render_sql(&self, schema: &str, date_col: &str) -> String {
        substitute(&self.sql_ingest, &[("schema", schema), ("date_col", date_col)])
    }

    pub fn render_dbt(&self) -> String {
        substitute(&self.dbt_stg_sales, &[])
    }

    /// All three templates with default parameters.
    pub fn render_all(&self, s3_prefix: &str) -> TemplateArtifact {
        self.render_all_with(s3_prefix, DEFAULT_PARTITION_DATE_EXPR)
    }

    pub fn render_all_with(&self, s3_prefix: &str, partition_date_expr: &str) -> TemplateArtifact {
        TemplateArtifact {
            pyspark: self.render_pyspark(s3_prefix, partition_date_expr),
            sql: self.render_sql(DEFAULT_SCHEMA, DEFAULT_DATE_COLUMN),
            dbt: self.render_dbt(),
        }
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::builtin()
    }
}
