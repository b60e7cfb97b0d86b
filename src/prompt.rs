//! Prompt Composer
//!
//! Fills the fixed code-generation instructions with the user request, the schema context
//! and the target backend. Pure text substitution; no validation happens here.

use crate::artifact::Target;

/// Build the single prompt sent to the model for one generation request.
pub fn compose(user_request: &str, context: &str, target: Target) -> String {
    format!(
        r#"
You are a pipeline code generator.

User request: {user_request}
Context: {context}
Target backend: {target}

Generate a JSON object with exactly the following keys:
- "pyspark": a string containing the PySpark code for the requested pipeline
- "sql": a string containing SQL code for the requested pipeline
- "dbt": dbt model(s) SQL (as single string).
  For the dbt output:
    - Always use {{{{ ref() }}}} for other models and {{{{ source() }}}} for raw tables.
    - Do NOT resolve or render these macros yourself. Just output valid dbt SQL.
    - Assume the user will run dbt to resolve them.
- "explanation": a string with a plain English explanation of each step

IMPORTANT REQUIREMENTS:
1. Return ONLY JSON. Do NOT include any text, markdown, or code blocks outside JSON.
2. All strings must be properly escaped:
   - Newlines as "\n"
   - Double quotes inside strings as \"
   - Tabs as "\t"
3. Do not truncate code. Include complete pipeline code for each key.
4. The JSON must be a single valid object parseable by any strict JSON parser.

Example structure of the JSON you should return:

{{
  "pyspark": "spark.read.csv('s3://sales.csv').createOrReplaceTempView('sales')\n...",
  "sql": "CREATE TABLE ...;\nINSERT INTO ...;\nSELECT ...;",
  "dbt": "select * from {{{{ source('raw', 'sales') }}}}",
  "explanation": "Step 1: ... Step 2: ..."
}}
"#,
        user_request = user_request,
        context = context,
        target = target,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_all_inputs() {
        let prompt = compose(
            "Ingest yesterday's sales",
            "Table `sales` has columns: id, price",
            Target::Sql,
        );
        assert!(prompt.contains("User request: Ingest yesterday's sales"));
        assert!(prompt.contains("Context: Table `sales` has columns: id, price"));
        assert!(prompt.contains("Target backend: sql"));
    }

    #[test]
    fn test_names_every_required_key() {
        let prompt = compose("x", "y", Target::Pyspark);
        for key in crate::artifact::REQUIRED_KEYS {
            assert!(prompt.contains(&format!("\"{}\"", key)), "missing {}", key);
        }
    }

    #[test]
    fn test_dbt_macros_are_left_unexpanded() {
        let prompt = compose("x", "y", Target::Dbt);
        assert!(prompt.contains("{{ ref() }}"));
        assert!(prompt.contains("{{ source() }}"));
    }

    #[test]
    fn test_escaping_rules_are_literal() {
        let prompt = compose("x", "y", Target::Dbt);
        assert!(prompt.contains(r#"Newlines as "\n""#));
        assert!(prompt.contains(r#"Tabs as "\t""#));
    }

    #[test]
    fn test_braces_in_user_input_are_not_interpreted() {
        let prompt = compose("use {context} literally", "ctx", Target::Sql);
        assert!(prompt.contains("User request: use {context} literally"));
    }
}
