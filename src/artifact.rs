//! Request and artifact types shared by the generator, gateway and CLI.

use crate::error::{PipelineError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Keys every model-generated artifact must carry, in validation order.
pub const REQUIRED_KEYS: [&str; 4] = ["pyspark", "sql", "dbt", "explanation"];

/// Table name -> ordered column names, in the order the caller supplied them.
pub type SchemaHint = IndexMap<String, Vec<String>>;

/// Output backend requested by the user.
///
/// Serialized lowercase; parsed case-insensitively everywhere, JSON bodies included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Pyspark,
    Sql,
    Dbt,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Pyspark, Target::Sql, Target::Dbt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Pyspark => "pyspark",
            Target::Sql => "sql",
            Target::Dbt => "dbt",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pyspark" => Ok(Target::Pyspark),
            "sql" => Ok(Target::Sql),
            "dbt" => Ok(Target::Dbt),
            other => Err(PipelineError::InvalidTarget(format!(
                "'{}' (expected one of: pyspark, sql, dbt)",
                other
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Body of `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub user_request: String,

    /// Falls back to the configured default target when omitted.
    #[serde(default)]
    pub target: Option<Target>,

    #[serde(default)]
    pub schema_hint: Option<SchemaHint>,

    /// Accepted for compatibility with existing clients; generation never executes SQL.
    #[serde(default)]
    pub run: bool,
}

impl GenerationRequest {
    pub fn new(user_request: impl Into<String>, target: Target) -> Self {
        Self {
            user_request: user_request.into(),
            target: Some(target),
            schema_hint: None,
            run: false,
        }
    }

    pub fn with_schema_hint(mut self, hint: SchemaHint) -> Self {
        self.schema_hint = Some(hint);
        self
    }

    pub fn target_or(&self, default: Target) -> Target {
        self.target.unwrap_or(default)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(hint) = &self.schema_hint {
            if hint.keys().any(|table| table.trim().is_empty()) {
                return Err(PipelineError::InvalidRequest(
                    "schema_hint contains an empty table name".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Validated model output: a JSON object holding at least the four required keys.
///
/// The object is kept exactly as parsed; extra keys survive and values are not re-typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedArtifact(Map<String, Value>);

impl GeneratedArtifact {
    /// Callers must have checked the required keys; see `normalizer::validate_artifact`.
    pub(crate) fn from_validated(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`, or `None` when absent or not a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn code_for(&self, target: Target) -> Option<&str> {
        self.text(target.as_str())
    }

    pub fn explanation(&self) -> Option<&str> {
        self.text("explanation")
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Guardrail code rendered from static templates; no model involvement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateArtifact {
    pub pyspark: String,
    pub sql: String,
    pub dbt: String,
}

impl TemplateArtifact {
    pub fn code_for(&self, target: Target) -> &str {
        match target {
            Target::Pyspark => &self.pyspark,
            Target::Sql => &self.sql,
            Target::Dbt => &self.dbt,
        }
    }
}

/// Success body of `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub llm_outputs: GeneratedArtifact,
    pub templates: TemplateArtifact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        assert_eq!("pyspark".parse::<Target>().unwrap(), Target::Pyspark);
        assert_eq!(" SQL ".parse::<Target>().unwrap(), Target::Sql);
        assert_eq!("dbt".parse::<Target>().unwrap(), Target::Dbt);
        assert!(matches!(
            "spark".parse::<Target>(),
            Err(PipelineError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_request_defaults() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"user_request": "load sales"}"#).unwrap();
        assert_eq!(request.target, None);
        assert_eq!(request.target_or(Target::Dbt), Target::Dbt);
        assert!(request.schema_hint.is_none());
        assert!(!request.run);
    }

    #[test]
    fn test_request_target_is_case_insensitive() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"user_request": "x", "target": "SQL"}"#).unwrap();
        assert_eq!(request.target, Some(Target::Sql));
        assert_eq!(serde_json::to_string(&Target::Sql).unwrap(), r#""sql""#);
    }

    #[test]
    fn test_request_rejects_unknown_target() {
        let parsed = serde_json::from_str::<GenerationRequest>(
            r#"{"user_request": "x", "target": "spark"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_schema_hint_keeps_caller_order() {
        let request: GenerationRequest = serde_json::from_str(
            r#"{"user_request": "x", "schema_hint": {"zeta": ["a"], "alpha": ["b"]}}"#,
        )
        .unwrap();
        let tables: Vec<&String> = request.schema_hint.as_ref().unwrap().keys().collect();
        assert_eq!(tables, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_validate_rejects_blank_table_name() {
        let mut hint = SchemaHint::new();
        hint.insert("  ".to_string(), vec!["id".to_string()]);
        let request = GenerationRequest::new("x", Target::Sql).with_schema_hint(hint);
        assert!(matches!(
            request.validate(),
            Err(PipelineError::InvalidRequest(_))
        ));
    }
}
