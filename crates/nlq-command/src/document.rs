//! Text-level view of the canonical schema format

use nlq_core::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static TABLE_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*Table ").expect("valid regex"));

/// Canonical schema text parsed into ordered `Table <name>:` blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDocument {
    database: Option<String>,
    tables: Vec<(String, String)>,
}

impl SchemaDocument {
    /// Split schema text into per-table blocks.
    ///
    /// Accepts full snapshots (with a `Database:` header) as well as
    /// specialized ones that start directly with a table block.
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();
        let mut sections = TABLE_SPLIT.split(text);

        if let Some(first) = sections.next() {
            let first = first.trim_start();
            if let Some(header) = first.strip_prefix("Database:") {
                let name = header.lines().next().unwrap_or_default().trim();
                doc.database = (!name.is_empty()).then(|| name.to_string());
            } else if let Some(block) = first.strip_prefix("Table ") {
                doc.push_section(block);
            }
        }

        for section in sections {
            doc.push_section(section);
        }

        if doc.tables.is_empty() && !text.trim().is_empty() {
            tracing::warn!("No table definitions found in schema text");
        }
        doc
    }

    /// Read and parse a schema file such as `schema.txt`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let doc = Self::parse(&text);
        tracing::debug!(
            path = %path.as_ref().display(),
            tables = doc.tables.len(),
            "Loaded schema document"
        );
        Ok(doc)
    }

    fn push_section(&mut self, section: &str) {
        let Some((name, definition)) = section.split_once(':') else {
            return;
        };
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return;
        }
        self.tables.push((
            name.to_string(),
            format!("Table {}:{}", name, definition.trim_end()),
        ));
    }

    pub fn database_name(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table names in document order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn contains(&self, table: &str) -> bool {
        self.block(table).is_some()
    }

    /// The `Table <name>:` block for one table
    pub fn block(&self, table: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, block)| block.as_str())
    }

    /// Column names of one table, in declaration order.
    pub fn columns(&self, table: &str) -> Option<Vec<&str>> {
        let block = self.block(table)?;
        let columns = block
            .lines()
            .skip(1)
            .take_while(|line| line.trim() != "Foreign Keys:")
            .filter_map(|line| {
                let entry = line.trim_start().strip_prefix("- ")?;
                let name = entry.split(" (").next()?.trim();
                (!name.is_empty()).then_some(name)
            })
            .collect();
        Some(columns)
    }

    /// Blocks for the requested tables joined by a blank line.
    ///
    /// Returns `None` when the request is empty or names a table the
    /// document does not have.
    pub fn specialized(&self, tables: &[impl AsRef<str>]) -> Option<String> {
        if tables.is_empty() {
            return None;
        }

        let mut blocks = Vec::with_capacity(tables.len());
        for table in tables {
            match self.block(table.as_ref()) {
                Some(block) => blocks.push(block),
                None => {
                    tracing::warn!(table = table.as_ref(), "Table not found in schema document");
                    return None;
                }
            }
        }
        Some(blocks.join("\n\n"))
    }

    /// Table name to block, for display.
    pub fn to_json(&self) -> serde_json::Value {
        self.tables
            .iter()
            .map(|(name, block)| (name.clone(), serde_json::Value::String(block.clone())))
            .collect::<serde_json::Map<_, _>>()
            .into()
    }
}
