use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pipeline_builder::artifact::{GenerationRequest, Target};
use pipeline_builder::config::Settings;
use pipeline_builder::dates::normalize_date_phrase_utc;
use pipeline_builder::executor::{ConnectionInfo, SqlExecutor};
use pipeline_builder::gateway::form::parse_schema_text;
use pipeline_builder::gateway::AppState;
use pipeline_builder::normalizer::{Normalizer, RepairStrategy};
use pipeline_builder::telemetry::init_tracing;
use pipeline_builder::templates::{TemplateStore, DEFAULT_PARTITION_DATE_EXPR};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "pipeline-builder")]
#[command(about = "Generate PySpark, SQL and dbt pipeline code from natural language")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask the model for pipeline code and print the JSON response
    Generate {
        /// The pipeline request in natural language
        request: String,

        /// Target backend (defaults to DEFAULT_TARGET)
        #[arg(short, long)]
        target: Option<String>,

        /// Schema hint lines in `table:col1,col2` form
        #[arg(short, long)]
        schema: Vec<String>,

        /// How to repair replies that are not strict JSON
        #[arg(long, value_enum, default_value_t = Repair::Blind)]
        repair: Repair,
    },

    /// Render the static guardrail templates
    Templates {
        /// Partition date phrase, e.g. "yesterday" or "2025-10-04"
        #[arg(long, default_value = DEFAULT_PARTITION_DATE_EXPR)]
        partition_date: String,

        /// Resolve the phrase to a concrete date instead of passing it through
        #[arg(long)]
        resolve: bool,
    },

    /// Dry-run (default) or execute a SQL file through psql
    RunSql {
        /// SQL file to run
        file: PathBuf,

        /// Actually execute instead of printing a dry-run summary
        #[arg(long)]
        execute: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Repair {
    Blind,
    StringAware,
}

impl From<Repair> for RepairStrategy {
    fn from(repair: Repair) -> Self {
        match repair {
            Repair::Blind => RepairStrategy::Blind,
            Repair::StringAware => RepairStrategy::StringAware,
        }
    }
}

fn templates_from(settings: &Settings) -> Result<TemplateStore> {
    Ok(match &settings.templates_dir {
        Some(dir) => TemplateStore::load_dir(dir)?,
        None => TemplateStore::builtin(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::from_env().context("failed to load settings")?;
    init_tracing(settings.log_filter());

    match args.command {
        Command::Generate {
            request,
            target,
            schema,
            repair,
        } => {
            let target = match target {
                Some(raw) => raw.parse::<Target>()?,
                None => settings.default_target,
            };
            let mut request = GenerationRequest::new(request, target);
            if !schema.is_empty() {
                request = request.with_schema_hint(parse_schema_text(&schema.join("\n")));
            }

            let mut state = AppState::from_settings(&settings)?;
            state.generator = state
                .generator
                .with_normalizer(Normalizer::new(repair.into()));

            let output = match state.generate(&request).await {
                Ok(response) => serde_json::to_value(&response)?,
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Templates {
            partition_date,
            resolve,
        } => {
            let partition_expr = if resolve {
                match normalize_date_phrase_utc(&partition_date) {
                    Some(date) => date,
                    None => bail!("could not resolve a date from '{}'", partition_date),
                }
            } else {
                partition_date
            };
            info!("Rendering templates for partition '{}'", partition_expr);

            let templates = templates_from(&settings)?;
            let artifact = templates.render_all_with(&settings.s3_sales_prefix, &partition_expr);
            println!("{}", serde_json::to_string_pretty(&artifact)?);
        }

        Command::RunSql { file, execute } => {
            let sql = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            // Dry runs never connect, so missing connection settings only matter for --execute.
            let conn = match ConnectionInfo::from_settings(&settings) {
                Ok(conn) => conn,
                Err(e) if execute => return Err(e.into()),
                Err(_) => ConnectionInfo::default(),
            };

            let report = SqlExecutor::default().run_sql(&sql, &conn, !execute).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
