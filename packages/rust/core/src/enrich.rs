//! Standards enrichment for content documents.
//!
//! Replaces a document's list of dot-notation codes with the matching
//! reference records, so the search index can serve standard metadata without
//! joining against a second index. For example
//!
//! ```text
//! { "standards": ["4.OA.B.4", "4.OA.C.5"] }
//! ```
//!
//! becomes
//!
//! ```text
//! { "standards": [
//!     { "category": "Operations & Algebraic Thinking", "dotNotation": "4.OA.B.4", ... },
//!     { "category": "Operations & Algebraic Thinking", "dotNotation": "4.OA.C.5", ... }
//! ] }
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use standardsriver_shared::{Document, STANDARDS_FIELD};

use crate::reference::ReferenceIndex;

/// What a single enrichment pass did to a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichOutcome {
    /// Codes expanded into records.
    pub matched: usize,
    /// Codes with no reference record.
    pub dropped: usize,
    /// Entries that were not strings.
    pub skipped: usize,
    /// Whether the standards field was overwritten.
    pub replaced: bool,
}

/// Expands standard codes against a shared [`ReferenceIndex`].
#[derive(Debug, Clone)]
pub struct DocumentEnricher {
    index: Arc<ReferenceIndex>,
    field: String,
}

impl DocumentEnricher {
    /// Enricher over the conventional `standards` field.
    pub fn new(index: Arc<ReferenceIndex>) -> Self {
        Self {
            index,
            field: STANDARDS_FIELD.into(),
        }
    }

    /// Use a different array field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Enrich `doc` in place and hand it back for chaining.
    pub fn enrich<'d>(&self, doc: &'d mut Document) -> &'d mut Document {
        self.enrich_with_outcome(doc);
        doc
    }

    /// Enrich `doc` in place and report what happened.
    pub fn enrich_with_outcome(&self, doc: &mut Document) -> EnrichOutcome {
        expand_standards(doc, &self.field, &self.index)
    }
}

/// Expand the codes held in `doc[field]`.
///
/// - a missing or non-array field leaves the document untouched;
/// - string entries are looked up in order, misses are dropped;
/// - non-string entries are skipped;
/// - the field is overwritten only when at least one code matched, so a
///   document whose codes are all unknown keeps its original list.
///
/// The field keeps its position in the document. Nothing else is touched.
pub fn expand_standards(doc: &mut Document, field: &str, index: &ReferenceIndex) -> EnrichOutcome {
    let mut outcome = EnrichOutcome::default();
    let Some(Value::Array(entries)) = doc.get_mut(field) else {
        return outcome;
    };

    let mut expanded = Vec::with_capacity(entries.len());
    for entry in entries.iter() {
        let Some(code) = entry.as_str() else {
            outcome.skipped += 1;
            continue;
        };
        match index.lookup(code) {
            Some(record) => {
                expanded.push(record.to_value());
                outcome.matched += 1;
            }
            None => {
                trace!(code, "no reference standard for code");
                outcome.dropped += 1;
            }
        }
    }

    if !expanded.is_empty() {
        *entries = expanded;
        outcome.replaced = true;
    }
    outcome
}
