//! Backend response cleanup and parsing

use serde_json::Value;

/// Fields read from a backend's JSON answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub sql: Option<String>,
    pub intent: Option<String>,
    pub used_tables: Vec<String>,
    pub used_columns: Vec<String>,
    pub clarify_required: bool,
    pub destructive: bool,
    pub explanation: Option<String>,
}

impl ModelReply {
    /// Read fields leniently: wrong-typed values count as absent, and
    /// `"true"`/`1` style flags are accepted.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let flag = |key: &str| match obj.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        };

        let list = |key: &str| {
            obj.get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        Some(Self {
            sql: text("sql"),
            intent: text("intent"),
            used_tables: list("used_tables"),
            used_columns: list("used_columns"),
            clarify_required: flag("clarify_required"),
            destructive: flag("destructive"),
            explanation: text("explanation"),
        })
    }
}

/// Remove a surrounding code fence, with or without a language tag.
pub fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    let rest = rest
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        .trim();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Parse a backend answer, salvaging the outermost `{...}` when the whole text is not JSON.
///
/// On failure returns the error strings to report; any echoed output is cut
/// to `snippet_chars` characters.
pub fn parse_reply(raw: &str, snippet_chars: usize) -> Result<ModelReply, Vec<String>> {
    let text = strip_code_fences(raw);

    let not_an_object = || {
        vec![
            "Model output JSON is not an object".to_string(),
            format!("raw_output_snippet:{}", snippet(text, snippet_chars)),
        ]
    };

    let first_error = match serde_json::from_str::<Value>(text) {
        Ok(value) => return ModelReply::from_value(&value).ok_or_else(not_an_object),
        Err(e) => e,
    };

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => {
            match serde_json::from_str::<Value>(&text[start..=end]) {
                Ok(value) => ModelReply::from_value(&value).ok_or_else(not_an_object),
                Err(salvage_error) => Err(vec![
                    format!(
                        "Failed to parse model JSON: {}. Salvage attempt also failed: {}",
                        first_error, salvage_error
                    ),
                    format!("raw_output_snippet:{}", snippet(text, snippet_chars)),
                ]),
            }
        }
        _ => Err(vec![format!(
            "Model output not valid JSON and no JSON blob found: {}. Raw output snippet: {}",
            first_error,
            snippet(text, snippet_chars)
        )]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```{}```"), "{}");
        assert_eq!(strip_code_fences("```json\n{}"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn test_parse_direct() {
        let reply = parse_reply(
            r#"{"sql": "SELECT 1", "intent": "select", "used_tables": [], "used_columns": [],
                "clarify_required": false, "destructive": false, "explanation": "one"}"#,
            1000,
        )
        .unwrap();
        assert_eq!(reply.sql.as_deref(), Some("SELECT 1"));
        assert_eq!(reply.intent.as_deref(), Some("select"));
        assert_eq!(reply.explanation.as_deref(), Some("one"));
    }

    #[test]
    fn test_parse_salvages_embedded_object() {
        let reply = parse_reply(
            "Sure! Here you go: {\"sql\": null, \"clarify_required\": true} Hope it helps.",
            1000,
        )
        .unwrap();
        assert!(reply.sql.is_none());
        assert!(reply.clarify_required);
    }

    #[test]
    fn test_lenient_fields() {
        let reply = parse_reply(
            r#"{"sql": "  ", "destructive": "true", "clarify_required": 0, "used_tables": ["a", 3]}"#,
            1000,
        )
        .unwrap();
        assert!(reply.sql.is_none());
        assert!(reply.destructive);
        assert!(!reply.clarify_required);
        assert_eq!(reply.used_tables, vec!["a"]);
    }

    #[test]
    fn test_unparseable_reports_bounded_snippet() {
        let raw = format!("not json {{ broken {} }}", "y".repeat(5000));
        let errors = parse_reply(&raw, 1000).unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Failed to parse model JSON"));
        let snippet = errors[1].strip_prefix("raw_output_snippet:").unwrap();
        assert_eq!(snippet.chars().count(), 1000);
    }

    #[test]
    fn test_no_blob() {
        let errors = parse_reply("I cannot help with that.", 1000).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Model output not valid JSON and no JSON blob found"));
    }

    #[test]
    fn test_non_object_json() {
        let errors = parse_reply("[1, 2, 3]", 1000).unwrap_err();
        assert_eq!(errors[0], "Model output JSON is not an object");
    }
}
