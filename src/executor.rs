//! SQL execution through the `psql` client
//!
//! Dry-run is the default: the SQL is summarized, never sent anywhere.

use crate::config::Settings;
use crate::error::{PipelineError, Result};
use serde::Serialize;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

const SAMPLE_CHARS: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub db: String,
    pub user: String,
    pub password: String,
}

impl ConnectionInfo {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let require = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| PipelineError::Config(format!("{} is required to execute SQL", name)))
        };
        Ok(Self {
            host: settings.pg_host.clone(),
            port: settings.pg_port,
            db: require(&settings.pg_db, "PG_DB")?,
            user: require(&settings.pg_user, "PG_USER")?,
            password: settings.pg_pass.clone().unwrap_or_default(),
        })
    }

    fn psql_args(&self) -> Vec<String> {
        vec![
            "-h".to_string(),
            self.host.clone(),
            "-p".to_string(),
            self.port.to_string(),
            "-d".to_string(),
            self.db.clone(),
            "-U".to_string(),
            self.user.clone(),
            "-v".to_string(),
            "ON_ERROR_STOP=1".to_string(),
            "-w".to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExecutionReport {
    DryRun {
        status: String,
        sample: String,
        /// Statement count, or `None` when the SQL does not parse as PostgreSQL.
        statements: Option<usize>,
    },
    Executed {
        stdout: String,
        stderr: String,
        returncode: i32,
    },
}

/// Count statements with sqlparser; `None` when the text is not valid PostgreSQL.
pub fn count_statements(sql: &str) -> Option<usize> {
    match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        Ok(statements) => Some(statements.len()),
        Err(e) => {
            warn!("SQL did not parse for dry-run summary: {}", e);
            None
        }
    }
}

fn dry_run_report(sql: &str) -> ExecutionReport {
    info!("dry-run: not executing SQL. SQL length: {}", sql.len());
    ExecutionReport::DryRun {
        status: "dry-run".to_string(),
        sample: sql.chars().take(SAMPLE_CHARS).collect(),
        statements: count_statements(sql),
    }
}

pub struct SqlExecutor {
    psql_binary: String,
}

impl Default for SqlExecutor {
    fn default() -> Self {
        Self::new("psql")
    }
}

impl SqlExecutor {
    pub fn new(psql_binary: impl Into<String>) -> Self {
        Self {
            psql_binary: psql_binary.into(),
        }
    }

    /// Run `sql` against Postgres, or only summarize it when `dry_run` is set.
    pub async fn run_sql(
        &self,
        sql: &str,
        conn: &ConnectionInfo,
        dry_run: bool,
    ) -> Result<ExecutionReport> {
        if dry_run {
            return Ok(dry_run_report(sql));
        }

        info!(
            "Executing {} bytes of SQL via {} against {}:{}/{}",
            sql.len(),
            self.psql_binary,
            conn.host,
            conn.port,
            conn.db
        );

        let mut child = Command::new(&self.psql_binary)
            .args(conn.psql_args())
            .env("PGPASSWORD", &conn.password)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PipelineError::Execution(format!("failed to start {}: {}", self.psql_binary, e))
            })?;

        // Feed stdin while draining stdout/stderr; psql echoes per statement and would
        // otherwise block on a full pipe. Dropping stdin at the end signals EOF.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(sql.as_bytes()).await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if let Err(e) = fed {
            // A child that exits early closes its stdin; its own report explains why.
            warn!("Failed to write SQL to {}: {}", self.psql_binary, e);
            if output.status.success() {
                return Err(PipelineError::Execution(format!(
                    "{} exited before reading all SQL: {}",
                    self.psql_binary, e
                )));
            }
        }

        Ok(ExecutionReport::Executed {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            returncode: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> ConnectionInfo {
        ConnectionInfo {
            host: "localhost".to_string(),
            port: 5432,
            db: "warehouse".to_string(),
            user: "etl".to_string(),
            password: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_dry_run_does_not_execute() {
        let executor = SqlExecutor::new("definitely-not-a-real-binary");
        let report = executor
            .run_sql("SELECT 1; SELECT 2;", &conn(), true)
            .await
            .unwrap();
        assert_eq!(
            report,
            ExecutionReport::DryRun {
                status: "dry-run".to_string(),
                sample: "SELECT 1; SELECT 2;".to_string(),
                statements: Some(2),
            }
        );
    }

    #[test]
    fn test_dry_run_sample_is_capped() {
        let sql = format!("SELECT '{}';", "a".repeat(1000));
        match dry_run_report(&sql) {
            ExecutionReport::DryRun { sample, statements, .. } => {
                assert_eq!(sample.chars().count(), SAMPLE_CHARS);
                assert_eq!(statements, Some(1));
            }
            other => panic!("unexpected report: {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_sql_has_no_statement_count() {
        assert_eq!(count_statements("SELEC nonsense FROM"), None);
    }

    #[test]
    fn test_dry_run_report_serializes_flat() {
        let value = serde_json::to_value(dry_run_report("SELECT 1")).unwrap();
        assert_eq!(value["status"], "dry-run");
        assert_eq!(value["sample"], "SELECT 1");
        assert_eq!(value["statements"], 1);
    }

    #[test]
    fn test_psql_arguments() {
        let args = conn().psql_args();
        assert_eq!(
            args,
            vec!["-h", "localhost", "-p", "5432", "-d", "warehouse", "-U", "etl", "-v", "ON_ERROR_STOP=1", "-w"]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_execution_error() {
        let executor = SqlExecutor::new("definitely-not-a-real-binary");
        assert!(matches!(
            executor.run_sql("SELECT 1", &conn(), false).await,
            Err(PipelineError::Execution(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_large_output_does_not_deadlock() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("pb-psql-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let script = dir.join("fake-psql");
        std::fs::write(&script, "#!/bin/sh\nexec cat\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let sql = "INSERT INTO sales VALUES (1);\n".repeat(20_000);
        let executor = SqlExecutor::new(script.to_string_lossy());
        let report = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            executor.run_sql(&sql, &conn(), false),
        )
        .await
        .expect("run_sql blocked on a full pipe")
        .unwrap();

        match report {
            ExecutionReport::Executed { stdout, returncode, .. } => {
                assert_eq!(returncode, 0);
                assert_eq!(stdout.len(), sql.len());
            }
            other => panic!("unexpected report: {:?}", other),
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_connection_info_requires_database() {
        let settings = Settings::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("k".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(matches!(
            ConnectionInfo::from_settings(&settings),
            Err(PipelineError::Config(_))
        ));
    }
}
