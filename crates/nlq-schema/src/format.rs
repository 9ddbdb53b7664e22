//! Canonical schema text rendering
//!
//! ```text
//! Database: school
//!
//! Table students:
//!   - id (INTEGER) NOT NULL PRIMARY KEY
//!   - surname (TEXT) NULL
//!   Foreign Keys:
//!     - class_id → classes.id
//!   Rows: 3
//! ```
//!
//! Blocks are separated by one blank line and the text has no trailing
//! newline. Consumers split on [`TABLE_DELIMITER`], so the `Table ` prefix
//! must stay exactly as written.

use sha2::{Digest, Sha256};

use crate::types::{ColumnInfo, TableSchema};

/// Substring that starts every table block after the header
pub const TABLE_DELIMITER: &str = "\nTable ";

/// Render tables in the given order under a `Database:` header.
pub fn render_schema_text(database_name: &str, tables: &[TableSchema]) -> String {
    let mut blocks = Vec::with_capacity(tables.len() + 1);
    blocks.push(format!("Database: {}", database_name));
    blocks.extend(tables.iter().map(render_table));
    blocks.join("\n\n")
}

fn render_table(table: &TableSchema) -> String {
    let mut lines = vec![format!("Table {}:", table.name)];

    lines.extend(table.columns.iter().map(render_column));

    if !table.foreign_keys.is_empty() {
        lines.push("  Foreign Keys:".to_string());
        for fk in &table.foreign_keys {
            lines.push(format!(
                "    - {} → {}.{}",
                fk.column, fk.referenced_table, fk.referenced_column
            ));
        }
    }

    if let Some(rows) = table.row_count {
        lines.push(format!("  Rows: {}", rows));
    }

    lines.join("\n")
}

fn render_column(column: &ColumnInfo) -> String {
    let mut parts = vec![
        format!("- {} ({})", column.name, column.data_type),
        if column.nullable { "NULL" } else { "NOT NULL" }.to_string(),
    ];

    if let Some(default) = column.default_value.as_deref()
        && !default.is_empty()
    {
        parts.push(format!("DEFAULT {}", default));
    }

    if column.is_primary_key {
        parts.push("PRIMARY KEY".to_string());
    }

    format!("  {}", parts.join(" "))
}

/// SHA-256 hex digest of a schema text
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Recover table names from canonical text by splitting on the block delimiter.
pub fn table_names_from_text(text: &str) -> Vec<String> {
    let mut segments = text.split(TABLE_DELIMITER);

    // The first segment is the database header, unless the text opens with a table block.
    let first = segments.next().unwrap_or_default();
    let leading = first.strip_prefix("Table ");

    leading
        .into_iter()
        .chain(segments)
        .filter_map(|block| {
            let header = block.lines().next()?;
            let name = header.trim_end().strip_suffix(':')?;
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForeignKeyInfo;

    fn column(name: &str, data_type: &str, nullable: bool) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
            default_value: None,
            is_primary_key: false,
        }
    }

    fn students() -> TableSchema {
        let mut grade = column("grade", "INTEGER", true);
        grade.default_value = Some("0".to_string());

        TableSchema::assemble(
            "students",
            vec![
                column("id", "INTEGER", false),
                column("surname", "TEXT", true),
                grade,
                column("class_id", "INTEGER", true),
            ],
            vec!["id".to_string()],
            vec![ForeignKeyInfo {
                column: "class_id".to_string(),
                referenced_table: "classes".to_string(),
                referenced_column: "id".to_string(),
            }],
            Some(3),
        )
    }

    #[test]
    fn test_render_exact_shape() {
        let classes = TableSchema::assemble(
            "classes",
            vec![column("id", "INTEGER", false)],
            vec!["id".to_string()],
            Vec::new(),
            Some(2),
        );

        let text = render_schema_text("school", &[classes, students()]);
        let expected = "Database: school\n\
            \n\
            Table classes:\n\
            \x20 - id (INTEGER) NOT NULL PRIMARY KEY\n\
            \x20 Rows: 2\n\
            \n\
            Table students:\n\
            \x20 - id (INTEGER) NOT NULL PRIMARY KEY\n\
            \x20 - surname (TEXT) NULL\n\
            \x20 - grade (INTEGER) NULL DEFAULT 0\n\
            \x20 - class_id (INTEGER) NULL\n\
            \x20 Foreign Keys:\n\
            \x20   - class_id → classes.id\n\
            \x20 Rows: 3";

        assert_eq!(text, expected);
    }

    #[test]
    fn test_missing_row_count_and_empty_default_are_omitted() {
        let mut note = column("note", "TEXT", true);
        note.default_value = Some(String::new());
        let table = TableSchema::assemble("notes", vec![note], Vec::new(), Vec::new(), None);

        let text = render_schema_text("db", &[table]);
        assert!(text.ends_with("  - note (TEXT) NULL"));
        assert!(!text.contains("Rows:"));
    }

    #[test]
    fn test_table_names_round_trip() {
        let tables: Vec<TableSchema> = ["a", "users_2024", "Orders", "x_y_z"]
            .into_iter()
            .map(TableSchema::empty)
            .collect();

        let text = render_schema_text("db", &tables);
        assert_eq!(
            table_names_from_text(&text),
            vec!["a", "users_2024", "Orders", "x_y_z"]
        );
    }

    #[test]
    fn test_header_only_has_no_tables() {
        assert!(table_names_from_text("Database: empty").is_empty());
    }

    #[test]
    fn test_hash_is_stable_and_sensitive() {
        let text = render_schema_text("school", &[students()]);
        assert_eq!(content_hash(&text), content_hash(&text));
        assert_eq!(content_hash(&text).len(), 64);

        let mut changed = students();
        changed.columns.push(column("email", "TEXT", true));
        let other = render_schema_text("school", &[changed]);
        assert_ne!(content_hash(&text), content_hash(&other));
    }
}
