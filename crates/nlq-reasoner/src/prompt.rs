//! Prompt construction

/// Appended to a schema section that was cut to fit the budget
pub const TRUNCATION_MARKER: &str = "\n...[TRUNCATED]";

/// Schema text used before any snapshot has been loaded
pub const NO_SCHEMA_PLACEHOLDER: &str = "NO_SCHEMA_PROVIDED";

/// Default character budget for the schema section
pub const DEFAULT_MAX_SCHEMA_CHARS: usize = 14_000;

const INSTRUCTIONS: &str = r#"You are a strict SQL generation assistant.
Rules:
1) Respond with ONLY a single JSON object. No prose, no markdown, no code fences.
2) Use only tables and columns that appear in SCHEMA_SNAPSHOT. Never invent names.
3) If the request is ambiguous, set "clarify_required": true and "sql": null.
4) Set "destructive": true for any DROP, ALTER, DELETE, TRUNCATE or CREATE TABLE statement.
5) List every table and column the SQL uses.

The JSON object must contain exactly these keys:
{
  "sql": "<SQL statement, or null>",
  "intent": "<select|insert|update|delete|create_table|alter|other>",
  "used_tables": ["t1", "t2"],
  "used_columns": ["t1.col1", "t2.col2"],
  "clarify_required": false,
  "destructive": false,
  "explanation": "<short explanation, 30 words max>"
}
Output the JSON object only."#;

/// Builds the single instruction string sent to a backend.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_schema_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SCHEMA_CHARS)
    }
}

impl PromptBuilder {
    pub fn new(max_schema_chars: usize) -> Self {
        Self { max_schema_chars }
    }

    pub fn max_schema_chars(&self) -> usize {
        self.max_schema_chars
    }

    /// Cut `schema_text` to the budget, appending [`TRUNCATION_MARKER`] when anything was dropped.
    ///
    /// The budget counts characters, not bytes.
    pub fn fit_schema(&self, schema_text: &str) -> String {
        match schema_text.char_indices().nth(self.max_schema_chars) {
            Some((cut, _)) => format!("{}{}", &schema_text[..cut], TRUNCATION_MARKER),
            None => schema_text.to_string(),
        }
    }

    pub fn build(&self, schema_text: &str, command_text: &str, dialect: &str) -> String {
        let schema = if schema_text.trim().is_empty() {
            NO_SCHEMA_PLACEHOLDER.to_string()
        } else {
            self.fit_schema(schema_text)
        };

        format!(
            "{INSTRUCTIONS}\n\n\
             SCHEMA_SNAPSHOT:\n{schema}\n\n\
             DIALECT: {dialect}\n\n\
             USER_REQUEST: {command_text}\n\n\
             Produce the JSON output matching the structure above."
        )
    }
}

/// Pull the text after `USER_REQUEST:` out of a built prompt.
pub fn extract_user_request(prompt: &str) -> &str {
    let Some(start) = prompt.find("USER_REQUEST:") else {
        return prompt.trim();
    };
    let rest = &prompt[start + "USER_REQUEST:".len()..];
    let end = rest.find("\n\n").unwrap_or(rest.len());
    rest[..end].trim()
}

/// Table names declared in the schema section of a built prompt.
pub fn extract_schema_tables(prompt: &str) -> Vec<String> {
    prompt
        .lines()
        .filter_map(|line| {
            let name = line.trim_start().strip_prefix("Table ")?.trim_end().strip_suffix(':')?;
            (!name.is_empty() && !name.contains(' ')).then(|| name.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_sections() {
        let prompt = PromptBuilder::default().build(
            "Database: school\n\nTable students:\n  - id (INTEGER) NOT NULL",
            "count the students",
            "sqlite",
        );

        assert!(prompt.contains("SCHEMA_SNAPSHOT:\nDatabase: school"));
        assert!(prompt.contains("DIALECT: sqlite"));
        assert!(prompt.contains("USER_REQUEST: count the students"));
        assert!(!prompt.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_prompt_states_output_contract() {
        let prompt = PromptBuilder::default().build("Database: x", "anything", "mysql");
        assert!(prompt.contains("ONLY a single JSON object"));
        for key in [
            "\"sql\"",
            "\"intent\"",
            "\"used_tables\"",
            "\"used_columns\"",
            "\"clarify_required\"",
            "\"destructive\"",
            "\"explanation\"",
        ] {
            assert!(prompt.contains(key), "missing {key}");
        }
        assert!(prompt.contains("select|insert|update|delete|create_table|alter|other"));
    }

    #[test]
    fn test_truncation_keeps_marker_within_budget() {
        let builder = PromptBuilder::new(100);
        let schema = "x".repeat(250);

        let fitted = builder.fit_schema(&schema);
        assert!(fitted.ends_with(TRUNCATION_MARKER));
        assert!(fitted.chars().count() <= 100 + TRUNCATION_MARKER.chars().count());

        let prompt = builder.build(&schema, "list users", "mysql");
        assert!(prompt.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let builder = PromptBuilder::new(3);
        assert_eq!(builder.fit_schema("ééééé"), format!("ééé{}", TRUNCATION_MARKER));
        assert_eq!(builder.fit_schema("ééé"), "ééé");
    }

    #[test]
    fn test_empty_schema_uses_placeholder() {
        let prompt = PromptBuilder::default().build("", "show users", "mysql");
        assert!(prompt.contains(NO_SCHEMA_PLACEHOLDER));
    }

    #[test]
    fn test_extract_from_built_prompt() {
        let prompt = PromptBuilder::default().build(
            "Database: school\n\nTable classes:\n  Rows: 2\n\nTable students:\n  Rows: 3",
            "count how many classes exist",
            "mysql",
        );

        assert_eq!(extract_user_request(&prompt), "count how many classes exist");
        assert_eq!(extract_schema_tables(&prompt), vec!["classes", "students"]);
    }
}
