//! Standards reference index.
//!
//! Maps a standard's dot-notation short code to its metadata record. The index
//! is built once, in bulk, from the raw records of the standards collection and
//! is read-only afterwards; rebuilding it is the only way to pick up changes.

use std::borrow::Borrow;
use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use standardsriver_shared::{
    CATEGORY_KEY, DOT_NOTATION_KEY, Document, STANDARD_FIELDS, STANDARD_KEY, SUB_CATEGORY_KEY,
};

// ---------------------------------------------------------------------------
// StandardRecord
// ---------------------------------------------------------------------------

/// A reference standard reduced to the allow-listed fields.
///
/// Fields absent from the raw record stay absent. Values are copied as they
/// appear in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardRecord {
    fields: Map<String, Value>,
}

impl StandardRecord {
    /// Filter a raw record down to [`STANDARD_FIELDS`].
    ///
    /// Returns `None` when the record has no string `dotNotation`.
    pub fn from_raw(raw: &Document) -> Option<Self> {
        raw.get(DOT_NOTATION_KEY)?.as_str()?;

        let fields = STANDARD_FIELDS
            .iter()
            .filter_map(|&key| raw.get(key).map(|value| (key.to_owned(), value.clone())))
            .collect();
        Some(Self { fields })
    }

    /// The short code this record is indexed under.
    pub fn dot_notation(&self) -> &str {
        // always a string, checked in `from_raw`
        self.fields
            .get(DOT_NOTATION_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn category(&self) -> Option<&str> {
        self.fields.get(CATEGORY_KEY).and_then(Value::as_str)
    }

    /// The standard's full text (`standard` key).
    pub fn standard_text(&self) -> Option<&str> {
        self.fields.get(STANDARD_KEY).and_then(Value::as_str)
    }

    pub fn sub_category(&self) -> Option<&str> {
        self.fields.get(SUB_CATEGORY_KEY).and_then(Value::as_str)
    }

    /// The filtered fields, in allow-list order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The record as a JSON object, ready to embed in a document.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

// ---------------------------------------------------------------------------
// ReferenceIndex
// ---------------------------------------------------------------------------

/// Immutable short code → [`StandardRecord`] mapping.
///
/// Safe to share across threads once built; nothing mutates it.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    records: HashMap<String, StandardRecord>,
}

impl ReferenceIndex {
    /// Build the index from raw reference records.
    ///
    /// Records without a string `dotNotation` are skipped. When two records
    /// share a code, the one seen last wins.
    #[instrument(skip_all)]
    pub fn build<I>(raw_records: I) -> Self
    where
        I: IntoIterator,
        I::Item: Borrow<Document>,
    {
        let mut records = HashMap::new();
        let mut skipped = 0usize;
        let mut replaced = 0usize;

        for raw in raw_records {
            let Some(record) = StandardRecord::from_raw(raw.borrow()) else {
                skipped += 1;
                continue;
            };
            let code = record.dot_notation().to_owned();
            if let Some(previous) = records.insert(code, record) {
                debug!(
                    code = previous.dot_notation(),
                    "duplicate dot notation, keeping the later record"
                );
                replaced += 1;
            }
        }

        debug!(
            indexed = records.len(),
            skipped,
            replaced,
            "built standards reference index"
        );
        Self { records }
    }

    /// Look up a short code. `None` means "drop this entry", not a failure.
    pub fn lookup(&self, code: &str) -> Option<&StandardRecord> {
        self.records.get(code)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All indexed short codes, in no particular order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn factor_pairs() -> Document {
        doc(json!({
            "dotNotation": "4.OA.B.4",
            "category": "Math",
            "standard": "Find factor pairs",
            "subCategory": "Algebra",
            "extra": "drop-me"
        }))
    }

    #[test]
    fn filters_to_allow_listed_fields() {
        let index = ReferenceIndex::build([factor_pairs()]);
        let record = index.lookup("4.OA.B.4").expect("indexed");

        assert_eq!(
            record.to_value(),
            json!({
                "dotNotation": "4.OA.B.4",
                "category": "Math",
                "standard": "Find factor pairs",
                "subCategory": "Algebra"
            })
        );
        assert!(!record.fields().contains_key("extra"));
        assert_eq!(record.category(), Some("Math"));
        assert_eq!(record.standard_text(), Some("Find factor pairs"));
        assert_eq!(record.sub_category(), Some("Algebra"));
    }

    #[test]
    fn absent_fields_are_not_synthesized() {
        let index =
            ReferenceIndex::build([doc(json!({ "dotNotation": "K.CC.1", "category": "Math" }))]);
        let record = index.lookup("K.CC.1").unwrap();

        assert_eq!(record.fields().len(), 2);
        assert_eq!(record.standard_text(), None);
        assert!(!record.fields().contains_key("subCategory"));
    }

    #[test]
    fn skips_records_without_string_code() {
        let index = ReferenceIndex::build([
            doc(json!({ "category": "Math" })),
            doc(json!({ "dotNotation": 42, "category": "Math" })),
            doc(json!({ "dotNotation": null })),
            factor_pairs(),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.codes().collect::<Vec<_>>(), vec!["4.OA.B.4"]);
    }

    #[test]
    fn duplicate_codes_keep_last_record() {
        let index = ReferenceIndex::build([
            doc(json!({ "dotNotation": "RL.4.5", "category": "first" })),
            doc(json!({ "dotNotation": "RL.4.5", "category": "second" })),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("RL.4.5").unwrap().category(), Some("second"));
    }

    #[test]
    fn lookup_miss_is_none() {
        let index = ReferenceIndex::build([factor_pairs()]);
        assert!(index.lookup("UNKNOWN").is_none());
        assert!(index.lookup("4.oa.b.4").is_none());
        assert!(ReferenceIndex::default().is_empty());
    }

    #[test]
    fn builds_from_borrowed_records() {
        let raw = vec![factor_pairs()];
        let index = ReferenceIndex::build(&raw);
        assert_eq!(index.len(), 1);
        assert_eq!(raw[0].len(), 5);
    }

    #[test]
    fn index_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReferenceIndex>();
    }
}
