//! Interactive HTML form served at `/`

use crate::artifact::{GeneratedArtifact, SchemaHint, Target, TemplateArtifact};
use std::collections::HashMap;

pub const DEFAULT_REQUEST: &str = "Ingest yesterday's sales data from S3, clean out nulls in price, and join with customer table on id";
pub const DEFAULT_SCHEMA_TEXT: &str = "sales:id,price,order_date,customer_id\ncustomer:id,name,email";
pub const NO_EXPLANATION: &str = "No explanation returned";

/// Values shown in the form, plus the outcome of the last submission.
#[derive(Debug, Clone)]
pub struct FormView {
    pub user_request: String,
    pub target: Target,
    pub schema_text: String,
    pub code: Option<String>,
    pub explanation: Option<String>,
    pub error: Option<String>,
}

impl FormView {
    pub fn initial(target: Target) -> Self {
        Self {
            user_request: DEFAULT_REQUEST.to_string(),
            target,
            schema_text: DEFAULT_SCHEMA_TEXT.to_string(),
            code: None,
            explanation: None,
            error: None,
        }
    }
}

/// Parse `table:col1,col2` lines. Lines without a colon are skipped, blank columns dropped.
pub fn parse_schema_text(text: &str) -> SchemaHint {
    let mut tables = SchemaHint::new();
    for line in text.lines() {
        if let Some((table, columns)) = line.split_once(':') {
            let columns = columns
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            tables.insert(table.trim().to_string(), columns);
        }
    }
    tables
}

/// Decode an `application/x-www-form-urlencoded` body.
pub fn parse_form_body(body: &str) -> HashMap<String, String> {
    let decode = |raw: &str| {
        let spaced = raw.replace('+', " ");
        urlencoding::decode(&spaced)
            .map(|s| s.into_owned())
            .unwrap_or(spaced)
    };

    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

/// Code to display for `target`: model output first, then the template, then PySpark.
pub fn pick_code(
    llm: Option<&GeneratedArtifact>,
    templates: Option<&TemplateArtifact>,
    target: Target,
) -> Option<String> {
    let from_llm = |t: Target| llm.and_then(|a| a.code_for(t)).filter(|c| !c.is_empty());
    let from_templates =
        |t: Target| templates.map(|tpl| tpl.code_for(t)).filter(|c| !c.is_empty());

    from_llm(target)
        .or_else(|| from_templates(target))
        .or_else(|| from_llm(Target::Pyspark))
        .or_else(|| from_templates(Target::Pyspark))
        .map(str::to_string)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render_form(view: &FormView) -> String {
    let options: String = Target::ALL
        .iter()
        .map(|t| {
            let selected = if *t == view.target { " selected" } else { "" };
            format!("<option value=\"{0}\"{1}>{0}</option>", t, selected)
        })
        .collect();

    let result = match (&view.error, &view.code) {
        (Some(error), _) => format!(
            "<h2>Error</h2>\n<pre class=\"error\">{}</pre>",
            escape_html(error)
        ),
        (None, Some(code)) => format!(
            "<h2>Generated Code</h2>\n<textarea rows=\"16\" readonly>{}</textarea>\n\
             <h2>Explanation</h2>\n<textarea rows=\"10\" readonly>{}</textarea>",
            escape_html(code),
            escape_html(view.explanation.as_deref().unwrap_or(NO_EXPLANATION))
        ),
        (None, None) => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>NL → Data Pipeline Builder</title>
<style>
body {{ font-family: sans-serif; max-width: 960px; margin: 2em auto; }}
textarea {{ width: 100%; font-family: monospace; }}
.error {{ color: #a00; white-space: pre-wrap; }}
</style>
</head>
<body>
<h1>NL → Data Pipeline Builder</h1>
<form method="post" action="/">
<label>Natural language request (Write your request)<br>
<textarea name="user_request" rows="2">{request}</textarea></label>
<label>Target<br><select name="target">{options}</select></label><br>
<label>Schema hint (format 'table:col1,col2')<br>
<textarea name="schema" rows="4">{schema}</textarea></label>
<button type="submit">Generate</button>
</form>
{result}
</body>
</html>
"#,
        request = escape_html(&view.user_request),
        options = options,
        schema = escape_html(&view.schema_text),
        result = result,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;

    #[test]
    fn test_parse_schema_text() {
        let hint = parse_schema_text("sales: id, price ,,\nnot a table line\ncustomer:id,name\n");
        let tables: Vec<(&String, &Vec<String>)> = hint.iter().collect();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].0, "sales");
        assert_eq!(tables[0].1, &vec!["id".to_string(), "price".to_string()]);
        assert_eq!(tables[1].0, "customer");
    }

    #[test]
    fn test_parse_form_body() {
        let fields = parse_form_body("user_request=load+sales%21&target=sql&schema=sales%3Aid%2Cprice%0Acustomer%3Aid");
        assert_eq!(fields["user_request"], "load sales!");
        assert_eq!(fields["target"], "sql");
        assert_eq!(fields["schema"], "sales:id,price\ncustomer:id");
    }

    #[test]
    fn test_pick_code_prefers_llm_for_target() {
        let llm = normalize(r#"{"pyspark":"lp","sql":"ls","dbt":"","explanation":"e"}"#).unwrap();
        let templates = TemplateArtifact {
            pyspark: "tp".to_string(),
            sql: "ts".to_string(),
            dbt: "td".to_string(),
        };
        assert_eq!(pick_code(Some(&llm), Some(&templates), Target::Sql).as_deref(), Some("ls"));
        assert_eq!(pick_code(Some(&llm), Some(&templates), Target::Dbt).as_deref(), Some("td"));
        assert_eq!(pick_code(None, Some(&templates), Target::Sql).as_deref(), Some("ts"));
        assert_eq!(pick_code(None, None, Target::Sql), None);
    }

    #[test]
    fn test_render_form_escapes_output() {
        let mut view = FormView::initial(Target::Dbt);
        view.code = Some("select '<b>' from t".to_string());
        let html = render_form(&view);
        assert!(html.contains("select &#39;&lt;b&gt;&#39; from t"));
        assert!(html.contains("<option value=\"dbt\" selected>dbt</option>"));
        assert!(html.contains(NO_EXPLANATION));
    }

    #[test]
    fn test_render_form_shows_error() {
        let mut view = FormView::initial(Target::Sql);
        view.error = Some("LLM error: boom".to_string());
        let html = render_form(&view);
        assert!(html.contains("LLM error: boom"));
        assert!(!html.contains("Generated Code"));
    }
}
