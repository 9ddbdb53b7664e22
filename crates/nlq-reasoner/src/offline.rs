//! Deterministic rule-based backend used when no remote model is configured

use async_trait::async_trait;
use nlq_core::Result;
use nlq_model::LanguageModel;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

use crate::prompt::{extract_schema_tables, extract_user_request};

/// Label recorded on outputs the rule-based backend produced
pub const OFFLINE_LABEL: &str = "offline";

/// Field type given to every column of an offline CREATE TABLE
const GENERIC_STRING_TYPE: &str = "VARCHAR(255)";

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bcreate\s+(?:a\s+)?(?:new\s+)?table\s+(?:called|named)\s+(\w+)\s+with\s+(?:fields|columns)\s+(.+)",
    )
    .expect("valid regex")
});

static COUNT_REQUEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:count|how\s+many)\b").expect("valid regex"));

static FROM_OR_OF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:from|of)\s+(?:the\s+)?(\w+)").expect("valid regex"));

static HOW_MANY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bhow\s+many\s+(\w+)").expect("valid regex"));

static STARTS_WITH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(\w+)\s+(?:that\s+)?(?:starts|begins)\s+with\s+['"]?(\w+)"#)
        .expect("valid regex")
});

static SHOW_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:show|list|display|find|get)(?:\s+me)?(?:\s+all)?(?:\s+the)?(?:\s+rows)?(?:\s+of)?\s+(\w+)",
    )
    .expect("valid regex")
});

/// Answers a handful of recognizable request shapes without any network call.
///
/// The backend reads the user request and the known table names back out of
/// the prompt, so it sees exactly what a remote model would see. Requests
/// it does not recognize come back with `sql: null` and
/// `clarify_required: true`.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedModel;

impl RuleBasedModel {
    pub fn new() -> Self {
        Self
    }

    /// Produce the JSON answer for one request.
    pub fn answer(&self, request: &str, known_tables: &[String]) -> Value {
        let request = request.trim();

        if let Some(answer) = create_table(request) {
            return answer;
        }

        if COUNT_REQUEST.is_match(request)
            && let Some(table) = mentioned_table(request, known_tables)
                .or_else(|| capture(&FROM_OR_OF, request))
                .or_else(|| capture(&HOW_MANY, request))
        {
            return reply(
                format!("SELECT COUNT(*) FROM {};", table),
                "select",
                &[table.as_str()],
                &[],
                false,
                format!("Counts the rows of {}", table),
            );
        }

        if let Some(caps) = STARTS_WITH.captures(request) {
            let column = caps[1].to_lowercase();
            let prefix = caps[2].replace('\'', "''");
            if let Some(table) = mentioned_table(request, known_tables)
                .or_else(|| capture(&SHOW_TABLE, request))
            {
                return reply(
                    format!("SELECT * FROM {} WHERE {} LIKE '{}%';", table, column, prefix),
                    "select",
                    &[table.as_str()],
                    &[format!("{}.{}", table, column).as_str()],
                    false,
                    format!("Rows of {} whose {} starts with {}", table, column, prefix),
                );
            }
        }

        if let Some(table) = capture(&SHOW_TABLE, request).map(|word| {
            mentioned_table(request, known_tables).unwrap_or(word)
        }) {
            return reply(
                format!("SELECT * FROM {};", table),
                "select",
                &[table.as_str()],
                &[],
                false,
                format!("All rows of {}", table),
            );
        }

        json!({
            "sql": null,
            "intent": "other",
            "used_tables": [],
            "used_columns": [],
            "clarify_required": true,
            "destructive": false,
            "explanation": "[offline] Request not recognized; please rephrase or name the table",
        })
    }
}

#[async_trait]
impl LanguageModel for RuleBasedModel {
    fn name(&self) -> &str {
        "rules"
    }

    fn provider(&self) -> &str {
        OFFLINE_LABEL
    }

    fn label(&self) -> String {
        OFFLINE_LABEL.to_string()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = extract_user_request(prompt);
        let tables = extract_schema_tables(prompt);
        tracing::debug!(known_tables = tables.len(), "Answering with offline rules");
        Ok(self.answer(request, &tables).to_string())
    }
}

fn create_table(request: &str) -> Option<Value> {
    let caps = CREATE_TABLE.captures(request)?;
    let table = caps[1].to_string();

    let fields: Vec<String> = caps[2]
        .split(',')
        .flat_map(|part| part.split(" and "))
        .filter_map(|part| {
            part.split_whitespace()
                .find(|word| *word != "and")
                .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric() && c != '_'))
                .filter(|word| !word.is_empty())
                .map(str::to_string)
        })
        .collect();

    if fields.is_empty() {
        return None;
    }

    let definitions = fields
        .iter()
        .map(|field| format!("{} {}", field, GENERIC_STRING_TYPE))
        .collect::<Vec<_>>()
        .join(", ");
    let columns: Vec<String> = fields.iter().map(|f| format!("{}.{}", table, f)).collect();
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();

    Some(reply(
        format!("CREATE TABLE {} ({});", table, definitions),
        "create_table",
        &[table.as_str()],
        &columns,
        true,
        format!("Creates table {} with {} text fields", table, fields.len()),
    ))
}

fn reply(
    sql: String,
    intent: &str,
    tables: &[&str],
    columns: &[&str],
    destructive: bool,
    explanation: String,
) -> Value {
    json!({
        "sql": sql,
        "intent": intent,
        "used_tables": tables,
        "used_columns": columns,
        "clarify_required": false,
        "destructive": destructive,
        "explanation": format!("[{}] {}", OFFLINE_LABEL, explanation),
    })
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First known table named in the request, accepting singular forms.
fn mentioned_table(request: &str, known_tables: &[String]) -> Option<String> {
    request
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|word| !word.is_empty())
        .find_map(|word| {
            known_tables
                .iter()
                .find(|table| {
                    table.eq_ignore_ascii_case(word)
                        || table.eq_ignore_ascii_case(&format!("{}s", word))
                })
                .cloned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_of(answer: &Value) -> Option<&str> {
        answer["sql"].as_str()
    }

    #[test]
    fn test_count_known_table() {
        let answer =
            RuleBasedModel::new().answer("count how many classes exist", &["classes".to_string()]);
        assert_eq!(sql_of(&answer), Some("SELECT COUNT(*) FROM classes;"));
        assert_eq!(answer["clarify_required"], false);
    }

    #[test]
    fn test_count_without_schema() {
        let model = RuleBasedModel::new();
        assert_eq!(
            sql_of(&model.answer("count the rows from orders", &[])),
            Some("SELECT COUNT(*) FROM orders;")
        );
        assert_eq!(
            sql_of(&model.answer("how many users are there", &[])),
            Some("SELECT COUNT(*) FROM users;")
        );
    }

    #[test]
    fn test_starts_with_filter() {
        let answer =
            RuleBasedModel::new().answer("show me students whose surname starts with A", &[]);
        assert_eq!(
            sql_of(&answer),
            Some("SELECT * FROM students WHERE surname LIKE 'A%';")
        );
    }

    #[test]
    fn test_starts_with_prefers_known_table() {
        let answer = RuleBasedModel::new().answer(
            "find every student whose surname starts with B",
            &["classes".to_string(), "students".to_string()],
        );
        assert_eq!(
            sql_of(&answer),
            Some("SELECT * FROM students WHERE surname LIKE 'B%';")
        );
    }

    #[test]
    fn test_create_table() {
        let answer = RuleBasedModel::new()
            .answer("create a new table called pets with fields name, species, age", &[]);
        let sql = sql_of(&answer).unwrap();
        assert!(sql.starts_with("CREATE TABLE pets ("));
        for field in ["name", "species", "age"] {
            assert!(sql.contains(&format!("{} VARCHAR(255)", field)), "{sql}");
        }
        assert_eq!(answer["destructive"], true);
        assert_eq!(answer["intent"], "create_table");
    }

    #[test]
    fn test_show_table() {
        let answer = RuleBasedModel::new().answer("list all the classes", &[]);
        assert_eq!(sql_of(&answer), Some("SELECT * FROM classes;"));
    }

    #[test]
    fn test_unrecognized_asks_for_clarification() {
        let answer = RuleBasedModel::new().answer("asdkjasldk random nonsense", &[]);
        assert!(answer["sql"].is_null());
        assert_eq!(answer["clarify_required"], true);
        assert_eq!(answer["intent"], "other");
    }

    #[test]
    fn test_explanations_carry_provenance() {
        let model = RuleBasedModel::new();
        for request in ["list all the classes", "asdkjasldk"] {
            let answer = model.answer(request, &[]);
            assert!(answer["explanation"].as_str().unwrap().starts_with("[offline]"));
        }
        assert_eq!(model.label(), "offline");
    }

    #[tokio::test]
    async fn test_complete_reads_prompt() {
        let prompt = crate::PromptBuilder::default().build(
            "Database: school\n\nTable classes:\n  Rows: 2",
            "count how many classes exist",
            "sqlite",
        );
        let raw = RuleBasedModel::new().complete(&prompt).await.unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["sql"], "SELECT COUNT(*) FROM classes;");
    }
}
