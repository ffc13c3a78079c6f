//! Reference collection loaders.
//!
//! A [`ReferenceSource`] yields the raw records of the standards collection.
//! The index only needs a sequence of records, so where they come from (an
//! export file, an in-memory fixture) is up to the caller.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, instrument, warn};

use standardsriver_shared::{Document, Result, StandardsRiverError};

use crate::reference::ReferenceIndex;

/// Something that can produce the raw standards records.
pub trait ReferenceSource {
    /// Short description used in logs and errors.
    fn describe(&self) -> String;

    /// Read every raw record.
    fn load(&self) -> Result<Vec<Document>>;
}

/// Load all records from `source` and build the index.
#[instrument(skip_all, fields(source = %source.describe()))]
pub fn load_index(source: &dyn ReferenceSource) -> Result<ReferenceIndex> {
    let records = source.load()?;
    let index = ReferenceIndex::build(&records);
    info!(
        records = records.len(),
        indexed = index.len(),
        "loaded standards reference"
    );
    Ok(index)
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

/// Records already held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecSource(pub Vec<Document>);

impl ReferenceSource for VecSource {
    fn describe(&self) -> String {
        format!("{} in-memory records", self.0.len())
    }

    fn load(&self) -> Result<Vec<Document>> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Export file source
// ---------------------------------------------------------------------------

/// An exported copy of the collection: either one JSON array or JSON Lines.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReferenceSource for JsonFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<Document>> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| StandardsRiverError::io(&self.path, e))?;
        parse_records(&content)
            .map_err(|e| StandardsRiverError::reference(format!("{}: {e}", self.path.display())))
    }
}

/// Parse an export, detecting the array form by its leading `[`.
///
/// Entries that are not JSON objects are skipped with a warning; syntax errors
/// fail the whole load.
pub fn parse_records(content: &str) -> std::result::Result<Vec<Document>, String> {
    let values = if content.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<Value>>(content)
            .map_err(|e| format!("invalid JSON array: {e}"))?
    } else {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<Value>(line).map_err(|e| format!("line {}: {e}", i + 1))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    let mut records = Vec::with_capacity(values.len());
    for (position, value) in values.into_iter().enumerate() {
        match value {
            Value::Object(map) => records.push(map),
            other => warn!(
                position,
                kind = json_kind(&other),
                "skipping non-object reference entry"
            ),
        }
    }
    Ok(records)
}

/// JSON type name, for log fields and error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_array() {
        let records =
            parse_records(r#"[{"dotNotation": "A.1"}, {"dotNotation": "A.2"}]"#).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn parses_json_lines_skipping_blank_lines() {
        let content = "{\"dotNotation\": \"A.1\"}\n\n  \n{\"dotNotation\": \"A.2\"}\n";
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["dotNotation"], "A.2");
    }

    #[test]
    fn skips_non_object_entries() {
        let records = parse_records(r#"[1, "two", null, {"dotNotation": "A.1"}]"#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn reports_bad_line_number() {
        let err = parse_records("{\"dotNotation\": \"A.1\"}\n{oops\n").unwrap_err();
        assert!(err.starts_with("line 2:"), "{err}");
    }

    #[test]
    fn empty_content_yields_no_records() {
        assert!(parse_records("").unwrap().is_empty());
        assert!(parse_records("[]").unwrap().is_empty());
    }

    #[test]
    fn fixture_array_builds_index() {
        let source = JsonFileSource::new("../../../fixtures/json/standards.fixture.json");
        let index = load_index(&source).expect("load fixture");
        assert_eq!(index.len(), 4);

        let record = index.lookup("W.5.2c").expect("W.5.2c indexed");
        assert_eq!(record.category(), Some("Writing"));
        assert_eq!(record.sub_category(), Some("Text Types and Purposes"));
        assert!(!record.fields().contains_key("extra"));
        assert!(!record.fields().contains_key("_id"));
    }

    #[test]
    fn fixture_lines_builds_index() {
        let source = JsonFileSource::new("../../../fixtures/json/standards.fixture.jsonl");
        let index = load_index(&source).expect("load fixture");
        assert_eq!(index.len(), 2);
        assert!(index.lookup("4.OA.C.5").is_some());
    }

    #[test]
    fn missing_file_is_io_error() {
        let source = JsonFileSource::new("../../../fixtures/json/no-such-export.json");
        let err = load_index(&source).unwrap_err();
        assert!(matches!(err, StandardsRiverError::Io { .. }));
    }

    #[test]
    fn vec_source_loads_clones() {
        let mut record = Document::new();
        record.insert("dotNotation".into(), "A.1".into());
        let source = VecSource(vec![record]);
        assert_eq!(load_index(&source).unwrap().len(), 1);
        assert_eq!(source.describe(), "1 in-memory records");
    }
}
