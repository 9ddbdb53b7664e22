//! Entity extraction: tables, columns, conditions, limit and ordering

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::SchemaDocument;
use crate::normalize::collapse_whitespace;

static TABLE_AFTER_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:from|into|table)\s+(\w+)").expect("valid regex"));

static WORD_CONDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(\w+)\s+(starts\s+with|begins\s+with|ends\s+with|contains|equals|equal\s+to|is\s+greater\s+than|greater\s+than|more\s+than|is\s+less\s+than|less\s+than|is)\s+['"]?([\w.@%+-]+)"#,
    )
    .expect("valid regex")
});

static SYMBOL_CONDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(\w+)\s*(>=|<=|!=|<>|=|>|<)\s*['"]?([\w.@%+-]+)"#).expect("valid regex")
});

static LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:top|first|limit)\s+(\d+)\b").expect("valid regex"));

static ORDER_BY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:order(?:ed)?|sort(?:ed)?)\s+by\s+(\w+)").expect("valid regex")
});

/// Words never taken as a condition's column
const STOPWORDS: &[&str] = &[
    "what", "which", "who", "where", "that", "there", "it", "this", "how", "name", "table",
    "all", "the", "a", "an", "whose",
];

/// `<column> <operator> <value>` found in the text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    /// One of `starts_with`, `ends_with`, `contains`, `=`, `!=`, `>`, `<`, `>=`, `<=`
    pub operator: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    pub tables: Vec<String>,
    pub columns: Vec<String>,
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
}

impl Entities {
    /// No table, column or condition was found.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.columns.is_empty() && self.conditions.is_empty()
    }

    /// 1.0 with tables and columns or conditions, 0.7 tables only,
    /// 0.5 columns or conditions only, 0.0 otherwise.
    pub fn confidence(&self) -> f32 {
        let has_tables = !self.tables.is_empty();
        let has_details = !self.columns.is_empty() || !self.conditions.is_empty();
        match (has_tables, has_details) {
            (true, true) => 1.0,
            (true, false) => 0.7,
            (false, true) => 0.5,
            (false, false) => 0.0,
        }
    }
}

fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn known_table<'a>(word: &str, schema: &'a SchemaDocument) -> Option<&'a str> {
    schema.table_names().into_iter().find(|table| {
        table.eq_ignore_ascii_case(word)
            || table.eq_ignore_ascii_case(&format!("{}s", word))
            || table.eq_ignore_ascii_case(&format!("{}es", word))
    })
}

fn operator_label(raw: &str) -> &'static str {
    let raw = collapse_whitespace(&raw.to_lowercase());
    match raw.as_str() {
        "starts with" | "begins with" => "starts_with",
        "ends with" => "ends_with",
        "contains" => "contains",
        "is greater than" | "greater than" | "more than" | ">" => ">",
        "is less than" | "less than" | "<" => "<",
        ">=" => ">=",
        "<=" => "<=",
        "!=" | "<>" => "!=",
        _ => "=",
    }
}

/// Pull entities out of user text.
///
/// With a schema, tables and columns are the schema's names mentioned as
/// words (singular table names accepted) and condition columns must be
/// known columns. Without one, tables are the words after `from`, `into`
/// or `table`. Condition values keep their original case.
pub fn extract_entities(text: &str, schema: Option<&SchemaDocument>) -> Entities {
    let text = collapse_whitespace(text);
    let mut entities = Entities::default();

    match schema {
        Some(schema) => {
            for word in words(&text) {
                if let Some(table) = known_table(&word, schema) {
                    push_unique(&mut entities.tables, table.to_string());
                }
            }
        }
        None => {
            for caps in TABLE_AFTER_KEYWORD.captures_iter(&text) {
                push_unique(&mut entities.tables, caps[1].to_lowercase());
            }
        }
    }

    let known_columns: Vec<String> = schema
        .map(|schema| {
            let mut columns = Vec::new();
            for table in schema.table_names() {
                for column in schema.columns(table).unwrap_or_default() {
                    push_unique(&mut columns, column.to_lowercase());
                }
            }
            columns
        })
        .unwrap_or_default();

    for word in words(&text) {
        if known_columns.contains(&word) && !entities.tables.contains(&word) {
            push_unique(&mut entities.columns, word);
        }
    }

    let condition_matches = WORD_CONDITION
        .captures_iter(&text)
        .chain(SYMBOL_CONDITION.captures_iter(&text));
    for caps in condition_matches {
        let column = caps[1].to_lowercase();
        let operator = &caps[2];
        if STOPWORDS.contains(&column.as_str()) {
            continue;
        }
        let known = known_columns.contains(&column);
        if schema.is_some() && !known {
            continue;
        }
        // "is" alone reads as prose too often without a schema to check against
        if schema.is_none() && operator.eq_ignore_ascii_case("is") {
            continue;
        }

        let condition = Condition {
            column,
            operator: operator_label(operator).to_string(),
            value: caps[3].to_string(),
        };
        if !entities.conditions.contains(&condition) {
            entities.conditions.push(condition);
        }
    }

    entities.limit = LIMIT
        .captures(&text)
        .and_then(|caps| caps[1].parse().ok());
    entities.order_by = ORDER_BY.captures(&text).map(|caps| caps[1].to_lowercase());

    entities
}
