//! Response Normalizer
//!
//! Converts raw model text into a validated [`GeneratedArtifact`]. The model is asked for a
//! bare JSON object but routinely wraps it in prose or leaves raw control characters inside
//! string values, so one bounded repair pass runs before giving up:
//!
//! 1. strict parse of the whole reply;
//! 2. otherwise cut from the first `{` to the last `}` and escape raw newlines/tabs;
//! 3. strict parse of the repaired slice.
//!
//! The parsed value must be an object holding every key in [`REQUIRED_KEYS`]. Only presence
//! is checked; values are returned exactly as parsed. Valid JSON that is not an object
//! (`[1]`, `42`, `null`) has no object boundary and is rejected like brace-free text.

use crate::artifact::{GeneratedArtifact, REQUIRED_KEYS};
use crate::error::{truncate_raw, PipelineError, Result};
use serde_json::Value;
use std::fmt::Write;
use tracing::{debug, warn};

/// How the repair pass escapes control characters in the extracted slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepairStrategy {
    /// Escape every raw newline and tab in the slice, inside string literals or not.
    ///
    /// Mis-escapes when braces inside string content throw off the boundaries.
    #[default]
    Blind,
    /// Track string-literal state and escape control characters only inside open strings.
    StringAware,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    strategy: RepairStrategy,
}

impl Normalizer {
    pub fn new(strategy: RepairStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> RepairStrategy {
        self.strategy
    }

    pub fn normalize(&self, raw: &str) -> Result<GeneratedArtifact> {
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("Direct parse of LLM response failed ({}), attempting repair", e);
                self.repair_and_parse(raw)?
            }
        };
        validate_artifact(value, raw)
    }

    fn repair_and_parse(&self, raw: &str) -> Result<Value> {
        let slice = object_slice(raw).ok_or_else(|| PipelineError::MalformedReply {
            raw: truncate_raw(raw),
        })?;

        let repaired = match self.strategy {
            RepairStrategy::Blind => escape_blind(slice),
            RepairStrategy::StringAware => escape_in_strings(slice),
        };

        serde_json::from_str::<Value>(&repaired).map_err(|e| {
            warn!("Repaired LLM response still not valid JSON: {}", e);
            PipelineError::UnparseableReply {
                raw: raw.to_string(),
            }
        })
    }
}

/// Normalize with the default (blind) repair strategy.
pub fn normalize(raw: &str) -> Result<GeneratedArtifact> {
    Normalizer::default().normalize(raw)
}

/// Slice from the first `{` through the last `}`, if both exist in that order.
fn object_slice(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn escape_blind(slice: &str) -> String {
    slice.replace('\n', "\\n").replace('\t', "\\t")
}

fn escape_in_strings(slice: &str) -> String {
    let mut out = String::with_capacity(slice.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for ch in slice.chars() {
        if !in_string {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(ch);
            continue;
        }

        match ch {
            '\\' => {
                escaped = true;
                out.push(ch);
            }
            '"' => {
                in_string = false;
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }

    out
}

/// Check that `value` is an object carrying every required key.
fn validate_artifact(value: Value, raw: &str) -> Result<GeneratedArtifact> {
    let fields = match value {
        Value::Object(fields) => fields,
        _ => {
            return Err(PipelineError::MalformedReply {
                raw: truncate_raw(raw),
            })
        }
    };

    if let Some(key) = REQUIRED_KEYS.iter().find(|key| !fields.contains_key(**key)) {
        return Err(PipelineError::IncompleteArtifact {
            key: key.to_string(),
            raw: raw.to_string(),
        });
    }

    Ok(GeneratedArtifact::from_validated(fields))
}
