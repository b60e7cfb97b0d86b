use thiserror::Error;

/// Longest prefix of a raw model reply carried by `MalformedReply`.
pub const RAW_PREVIEW_LIMIT: usize = 500;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No JSON object found in LLM response: {raw}")]
    MalformedReply { raw: String },

    #[error("Failed to parse LLM response as JSON:\n{raw}")]
    UnparseableReply { raw: String },

    #[error("LLM response JSON missing required key '{key}'. Raw response:\n{raw}")]
    IncompleteArtifact { key: String, raw: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Database(err.to_string())
    }
}

/// Cut `raw` down to at most `RAW_PREVIEW_LIMIT` characters on a char boundary.
pub fn truncate_raw(raw: &str) -> String {
    match raw.char_indices().nth(RAW_PREVIEW_LIMIT) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_raw_short_input_unchanged() {
        assert_eq!(truncate_raw("no braces here"), "no braces here");
    }

    #[test]
    fn test_truncate_raw_long_input() {
        let raw = "x".repeat(RAW_PREVIEW_LIMIT + 20);
        let cut = truncate_raw(&raw);
        assert_eq!(cut.len(), RAW_PREVIEW_LIMIT + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_incomplete_artifact_message_names_key() {
        let err = PipelineError::IncompleteArtifact {
            key: "explanation".to_string(),
            raw: "{}".to_string(),
        };
        assert!(err.to_string().contains("'explanation'"));
    }
}
