//! SQL validation and metadata extraction

use nlq_core::{Dialect, OutputMetadata};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::ast::{Expr, Statement, visit_expressions, visit_relations};
use sqlparser::dialect::{
    Dialect as SqlDialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};
use std::collections::BTreeSet;
use std::ops::ControlFlow;

pub const NO_SQL_WARNING: &str = "No SQL provided";
pub const DESTRUCTIVE_KEYWORD_WARNING: &str =
    "Destructive keyword detected (drop/alter/delete/truncate)";
pub const CARTESIAN_WARNING: &str =
    "Multiple tables referenced without explicit JOIN/WHERE (possible Cartesian product)";

static DESTRUCTIVE_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(drop|alter|delete|truncate)\b").expect("valid regex"));

static CREATE_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcreate\s+table\b").expect("valid regex"));

static FROM_OR_INTO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(?:from|into)\s+[`"]?(\w+)"#).expect("valid regex"));

/// Words the pretty-printer upper-cases
const UPPERCASE_WORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "AVG", "BETWEEN", "BY", "CASE", "COLUMN",
    "COUNT", "CREATE", "CROSS", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END",
    "EXISTS", "FROM", "FULL", "GROUP", "HAVING", "IF", "IN", "INNER", "INSERT", "INTO", "IS",
    "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "MAX", "MIN", "NOT", "NULL", "OFFSET", "ON", "OR",
    "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SET", "SUM", "TABLE",
    "THEN", "TRUNCATE", "UNION", "UPDATE", "VALUES", "WHEN", "WHERE", "WITH",
];

/// Words that start a new line in pretty output
const CLAUSE_WORDS: &[&str] = &[
    "FROM", "WHERE", "GROUP", "ORDER", "HAVING", "LIMIT", "OFFSET", "UNION", "VALUES", "SET",
    "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS",
];

/// Words that keep a following JOIN on the same line
const JOIN_MODIFIERS: &[&str] = &["INNER", "LEFT", "RIGHT", "FULL", "CROSS", "OUTER", "NATURAL"];

/// How much structure the validator verifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Parse into an AST; parse failures reject the SQL
    #[default]
    Ast,
    /// Regex extraction of table names only; structure is assumed valid
    Regex,
}

/// Outcome of validating one SQL candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub ok: bool,
    pub warnings: Vec<String>,
    pub metadata: OutputMetadata,
    /// The statement drops, alters, deletes, truncates or creates a table
    pub destructive: bool,
}

impl Validation {
    fn rejected(sql: &str, warnings: Vec<String>, destructive: bool) -> Self {
        Self {
            ok: false,
            warnings,
            metadata: OutputMetadata {
                pretty: sql.to_string(),
                ..OutputMetadata::default()
            },
            destructive,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SqlValidator {
    mode: ValidationMode,
}

impl SqlValidator {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn validate(&self, sql: &str, dialect: Dialect) -> Validation {
        let sql = sql.trim();
        if sql.is_empty() {
            return Validation::rejected(sql, vec![NO_SQL_WARNING.to_string()], false);
        }

        let mut warnings = Vec::new();
        let keyword_hit = DESTRUCTIVE_KEYWORD.is_match(sql);
        if keyword_hit {
            warnings.push(DESTRUCTIVE_KEYWORD_WARNING.to_string());
        }

        match self.mode {
            ValidationMode::Ast => validate_ast(sql, dialect, warnings, keyword_hit),
            ValidationMode::Regex => validate_regex(sql, warnings, keyword_hit),
        }
    }
}

fn parser_dialect(dialect: Dialect) -> Box<dyn SqlDialect> {
    match dialect {
        Dialect::Mysql => Box::new(MySqlDialect {}),
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::Generic => Box::new(GenericDialect {}),
    }
}

fn is_destructive(statement: &Statement) -> bool {
    matches!(
        statement,
        Statement::Drop { .. }
            | Statement::AlterTable { .. }
            | Statement::Delete { .. }
            | Statement::Truncate { .. }
            | Statement::CreateTable { .. }
    )
}

fn validate_ast(
    sql: &str,
    dialect: Dialect,
    mut warnings: Vec<String>,
    keyword_hit: bool,
) -> Validation {
    let parser_dialect = parser_dialect(dialect);

    let statements = match Parser::parse_sql(parser_dialect.as_ref(), sql) {
        Ok(statements) => statements,
        Err(e) => {
            warnings.push(format!("SQL parse error: {}", e));
            return Validation::rejected(sql, warnings, keyword_hit);
        }
    };

    match statements.len() {
        0 => {
            warnings.push(NO_SQL_WARNING.to_string());
            return Validation::rejected(sql, warnings, keyword_hit);
        }
        1 => {}
        n => {
            warnings.push(format!("Expected a single SQL statement, found {}", n));
            let destructive = keyword_hit || statements.iter().any(is_destructive);
            return Validation::rejected(sql, warnings, destructive);
        }
    }

    let statement = &statements[0];

    let mut tables = BTreeSet::new();
    let _ = visit_relations(statement, |name| {
        if let Some(ident) = name.0.last() {
            tables.insert(ident.value.clone());
        }
        ControlFlow::<()>::Continue(())
    });

    let mut columns = BTreeSet::new();
    let _ = visit_expressions(statement, |expr| {
        match expr {
            Expr::Identifier(ident) => {
                columns.insert(ident.value.clone());
            }
            Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
                let column = &parts[parts.len() - 1].value;
                let table = &parts[parts.len() - 2].value;
                columns.insert(format!("{}.{}", table, column));
            }
            Expr::CompoundIdentifier(parts) => {
                if let Some(ident) = parts.last() {
                    columns.insert(ident.value.clone());
                }
            }
            _ => {}
        }
        ControlFlow::<()>::Continue(())
    });

    let lowered = sql.to_lowercase();
    if tables.len() > 1 && !lowered.contains("join") && !lowered.contains("where") {
        warnings.push(CARTESIAN_WARNING.to_string());
    }

    let pretty = pretty_print(sql, parser_dialect.as_ref()).unwrap_or_else(|| sql.to_string());

    Validation {
        ok: true,
        warnings,
        metadata: OutputMetadata {
            tables,
            columns,
            pretty,
            backend: None,
        },
        destructive: keyword_hit || is_destructive(statement),
    }
}

fn validate_regex(sql: &str, warnings: Vec<String>, keyword_hit: bool) -> Validation {
    let tables = FROM_OR_INTO
        .captures_iter(sql)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect();

    Validation {
        ok: true,
        warnings,
        metadata: OutputMetadata {
            tables,
            columns: BTreeSet::new(),
            pretty: sql.to_string(),
            backend: None,
        },
        destructive: keyword_hit || CREATE_TABLE.is_match(sql),
    }
}

/// Upper-case common keywords and start each major clause on its own line.
///
/// Returns None when the text cannot be tokenized.
pub fn pretty_print(sql: &str, dialect: &dyn SqlDialect) -> Option<String> {
    let tokens = Tokenizer::new(dialect, sql).tokenize().ok()?;

    let mut out = String::with_capacity(sql.len() + 16);
    let mut pending_space = false;
    let mut previous_word: Option<String> = None;

    for token in &tokens {
        let (text, breaks_line, word) = match token {
            Token::EOF => continue,
            Token::Whitespace(Whitespace::SingleLineComment { .. })
            | Token::Whitespace(Whitespace::MultiLineComment(_)) => (token.to_string(), false, None),
            Token::Whitespace(_) => {
                pending_space = true;
                continue;
            }
            Token::Word(w) if w.quote_style.is_none() => {
                let upper = w.value.to_ascii_uppercase();
                let after_modifier = previous_word
                    .as_deref()
                    .is_some_and(|p| JOIN_MODIFIERS.contains(&p));
                let breaks = CLAUSE_WORDS.contains(&upper.as_str())
                    && !(after_modifier && (upper == "JOIN" || JOIN_MODIFIERS.contains(&upper.as_str())));
                let text = if UPPERCASE_WORDS.contains(&upper.as_str()) {
                    upper.clone()
                } else {
                    w.value.clone()
                };
                (text, breaks, Some(upper))
            }
            other => (other.to_string(), false, None),
        };

        if breaks_line && !out.is_empty() {
            let trimmed = out.trim_end().len();
            out.truncate(trimmed);
            out.push('\n');
        } else if pending_space && !out.is_empty() && !out.ends_with('\n') {
            out.push(' ');
        }

        out.push_str(&text);
        pending_space = false;
        previous_word = word;
    }

    let pretty = out.trim().to_string();
    (!pretty.is_empty()).then_some(pretty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(sql: &str) -> Validation {
        SqlValidator::default().validate(sql, Dialect::Sqlite)
    }

    #[test]
    fn test_empty_sql() {
        let result = validate("   ");
        assert!(!result.ok);
        assert_eq!(result.warnings, vec![NO_SQL_WARNING]);
    }

    #[test]
    fn test_select_metadata() {
        let result = validate("select s.surname, grade from students s where s.surname like 'A%'");
        assert!(result.ok);
        assert!(!result.destructive);
        assert!(result.warnings.is_empty());
        assert_eq!(result.metadata.tables.iter().collect::<Vec<_>>(), vec!["students"]);
        assert!(result.metadata.columns.contains("s.surname"));
        assert!(result.metadata.columns.contains("grade"));
        assert!(result.metadata.pretty.starts_with("SELECT s.surname, grade\nFROM students s\nWHERE"));
        assert!(result.metadata.pretty.contains("LIKE 'A%'"));
    }

    #[test]
    fn test_destructive_keywords_warn() {
        for sql in [
            "DROP TABLE x",
            "TRUNCATE TABLE y",
            "DELETE FROM z",
            "ALTER TABLE w ADD COLUMN c INT",
        ] {
            let result = validate(sql);
            assert!(
                result.warnings.iter().any(|w| w == DESTRUCTIVE_KEYWORD_WARNING),
                "{sql}"
            );
            assert!(result.destructive, "{sql}");
        }

        let select = validate("SELECT * FROM t");
        assert!(!select.warnings.iter().any(|w| w == DESTRUCTIVE_KEYWORD_WARNING));
    }

    #[test]
    fn test_any_drop_or_alter_statement_is_destructive() {
        for sql in [
            "DROP FUNCTION f",
            "DROP VIEW v",
            "ALTER VIEW v AS SELECT 1",
            "ALTER INDEX i RENAME TO j",
            "ALTER ROLE r WITH PASSWORD 'x'",
        ] {
            for dialect in [Dialect::Generic, Dialect::Postgres, Dialect::Sqlite] {
                let result = SqlValidator::default().validate(sql, dialect);
                assert!(result.destructive, "{sql} ({dialect:?})");
            }
            let regex = SqlValidator::new(ValidationMode::Regex).validate(sql, Dialect::Generic);
            assert!(regex.destructive, "{sql}");
        }
    }

    #[test]
    fn test_keyword_must_be_whole_word() {
        let result = validate("SELECT dropped_at, altered FROM deletions");
        assert!(result.ok);
        assert!(result.warnings.is_empty());
        assert!(!result.destructive);
    }

    #[test]
    fn test_create_table_is_destructive_without_keyword_warning() {
        let result = validate("CREATE TABLE pets (name VARCHAR(255))");
        assert!(result.ok);
        assert!(result.destructive);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_parse_error_is_surfaced() {
        let result = validate("SELEC * FRM students");
        assert!(!result.ok);
        assert!(result.warnings.iter().any(|w| w.starts_with("SQL parse error:")));
        assert_eq!(result.metadata.pretty, "SELEC * FRM students");
    }

    #[test]
    fn test_stacked_statements_are_rejected() {
        let result = validate("SELECT * FROM t; DROP TABLE t");
        assert!(!result.ok);
        assert!(result.destructive);
        assert!(result.warnings.iter().any(|w| w.contains("single SQL statement")));
    }

    #[test]
    fn test_cartesian_warning() {
        let result = validate("SELECT * FROM students, classes");
        assert!(result.ok);
        assert!(result.warnings.iter().any(|w| w == CARTESIAN_WARNING));

        let joined = validate("SELECT * FROM students JOIN classes ON students.class_id = classes.id");
        assert!(!joined.warnings.iter().any(|w| w == CARTESIAN_WARNING));
        assert!(joined.metadata.columns.contains("students.class_id"));
    }

    #[test]
    fn test_regex_mode() {
        let validator = SqlValidator::new(ValidationMode::Regex);
        let result = validator.validate(
            "INSERT INTO `pets` SELECT * FROM animals WHERE x = 1 nonsense (",
            Dialect::Mysql,
        );
        assert!(result.ok);
        assert!(result.metadata.columns.is_empty());
        assert!(result.metadata.tables.contains("pets"));
        assert!(result.metadata.tables.contains("animals"));
        assert!(!result.destructive);

        let drop = validator.validate("drop table pets", Dialect::Mysql);
        assert!(drop.destructive);
    }

    #[test]
    fn test_pretty_join_stays_together() {
        let pretty = pretty_print(
            "select a.x from a left outer join b on a.id = b.id",
            &GenericDialect {},
        )
        .unwrap();
        assert_eq!(pretty, "SELECT a.x\nFROM a\nLEFT OUTER JOIN b ON a.id = b.id");
    }
}
