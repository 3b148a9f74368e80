// Source reader abstraction
//
// This is the boundary between whatever extracts measurement tables from the
// inspection document and the engine. Readers only hand over ordered rows;
// grouping and classification happen downstream.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One upstream record, as extracted from the source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Blank when the row continues the previous component.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub aggregate: String,
    #[serde(default)]
    pub is_header: bool,
}

impl SourceRow {
    pub fn new<S: AsRef<str>>(name: &str, values: &[S], aggregate: &str) -> Self {
        Self {
            name: name.to_string(),
            values: values.iter().map(|v| v.as_ref().to_string()).collect(),
            aggregate: aggregate.to_string(),
            is_header: false,
        }
    }

    pub fn header(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Vec::new(),
            aggregate: String::new(),
            is_header: true,
        }
    }
}

/// How `SourceRow::values` maps onto the 8 reading cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueLayout {
    /// Up to 8 readings, one per cell.
    Readings,
    /// Up to 4 measurement points, each written into two cells.
    #[default]
    Points,
}

/// Rows plus their layout, as handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTable {
    #[serde(default)]
    pub layout: ValueLayout,
    pub rows: Vec<SourceRow>,
}

// JSON input is either a bare row array or a table object.
#[derive(Deserialize)]
#[serde(untagged)]
enum SourceJson {
    Table(SourceTable),
    Rows(Vec<SourceRow>),
}

/// Source reader trait - produces ordered rows for one run
pub trait SourceReader {
    fn read_table(&self) -> Result<SourceTable>;

    /// Reader name for logging
    fn name(&self) -> &str;
}

/// Reads a JSON table (or row array) from disk.
pub struct JsonSourceReader {
    path: PathBuf,
}

impl JsonSourceReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn supports_file_type(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }
}

pub fn parse_source_json(json: &str) -> Result<SourceTable> {
    let parsed: SourceJson =
        serde_json::from_str(json).map_err(|e| anyhow!("Failed to parse source rows: {}", e))?;
    Ok(match parsed {
        SourceJson::Table(table) => table,
        SourceJson::Rows(rows) => SourceTable {
            layout: ValueLayout::default(),
            rows,
        },
    })
}

impl SourceReader for JsonSourceReader {
    fn read_table(&self) -> Result<SourceTable> {
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read source file {}", self.path.display()))?;
        parse_source_json(&json)
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// In-memory rows, for tests and embedding callers.
pub struct VecSource {
    table: SourceTable,
}

impl VecSource {
    pub fn new(layout: ValueLayout, rows: Vec<SourceRow>) -> Self {
        Self {
            table: SourceTable { layout, rows },
        }
    }
}

impl SourceReader for VecSource {
    fn read_table(&self) -> Result<SourceTable> {
        Ok(self.table.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_row_array() {
        let table = parse_source_json(
            r#"[{"name": "GZ1 3F", "values": ["120", "130"], "aggregate": "125"},
                {"values": ["110"]}]"#,
        )
        .unwrap();
        assert_eq!(table.layout, ValueLayout::Points);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].name, "");
        assert!(!table.rows[1].is_header);
    }

    #[test]
    fn test_parse_table_object() {
        let table = parse_source_json(
            r#"{"layout": "readings", "rows": [{"name": "构件", "is_header": true}]}"#,
        )
        .unwrap();
        assert_eq!(table.layout, ValueLayout::Readings);
        assert!(table.rows[0].is_header);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(parse_source_json("{not json").is_err());
    }

    #[test]
    fn test_supports_json_only() {
        assert!(JsonSourceReader::supports_file_type(Path::new("rows.JSON")));
        assert!(!JsonSourceReader::supports_file_type(Path::new("rows.docx")));
    }
}
