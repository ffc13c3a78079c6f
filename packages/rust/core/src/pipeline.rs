//! Per-document transform applied to content coming off the change feed:
//! identifier normalization, then standards enrichment.

use std::io::{BufRead, Write};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use standardsriver_shared::{AppConfig, Document, FieldNames, Result, StandardsRiverError};

use crate::enrich::{DocumentEnricher, EnrichOutcome};
use crate::reference::ReferenceIndex;
use crate::versioned_id::{Normalization, normalize_with};

/// What the pipeline did to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    /// `None` when identifier normalization is switched off.
    pub normalization: Option<Normalization>,
    pub enrichment: EnrichOutcome,
}

/// Counters over a batch of documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub documents: usize,
    pub ids_normalized: usize,
    pub ids_unchanged: usize,
    pub ids_missing: usize,
    pub documents_enriched: usize,
    pub codes_matched: usize,
    pub codes_dropped: usize,
}

impl PipelineStats {
    /// Fold one document report into the totals.
    pub fn record(&mut self, report: &DocumentReport) {
        self.documents += 1;
        match &report.normalization {
            Some(Normalization::Normalized(_)) => self.ids_normalized += 1,
            Some(Normalization::Unchanged(_)) => self.ids_unchanged += 1,
            Some(Normalization::NoIdentifier) => self.ids_missing += 1,
            None => {}
        }
        if report.enrichment.replaced {
            self.documents_enriched += 1;
        }
        self.codes_matched += report.enrichment.matched;
        self.codes_dropped += report.enrichment.dropped;
    }
}

/// Normalizes identifiers and expands standards, one document at a time.
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    enricher: DocumentEnricher,
    fields: FieldNames,
    normalize_ids: bool,
}

impl DocumentPipeline {
    /// Pipeline with default field names and normalization on.
    pub fn new(index: Arc<ReferenceIndex>) -> Self {
        Self {
            enricher: DocumentEnricher::new(index),
            fields: FieldNames::default(),
            normalize_ids: true,
        }
    }

    /// Pipeline using the field names and switches from `config`.
    pub fn from_config(index: Arc<ReferenceIndex>, config: &AppConfig) -> Self {
        Self {
            enricher: DocumentEnricher::new(index).with_field(config.fields.standards.clone()),
            fields: config.fields.clone(),
            normalize_ids: config.pipeline.normalize_ids,
        }
    }

    pub fn with_normalize_ids(mut self, normalize_ids: bool) -> Self {
        self.normalize_ids = normalize_ids;
        self
    }

    pub fn enricher(&self) -> &DocumentEnricher {
        &self.enricher
    }

    /// Transform one document in place.
    pub fn process(&self, doc: &mut Document) -> DocumentReport {
        let normalization = self
            .normalize_ids
            .then(|| normalize_with(doc, &self.fields));
        let enrichment = self.enricher.enrich_with_outcome(doc);
        DocumentReport {
            normalization,
            enrichment,
        }
    }

    /// Transform every document in `docs`.
    #[instrument(skip_all, fields(documents = docs.len()))]
    pub fn process_batch(&self, docs: &mut [Document]) -> PipelineStats {
        let mut stats = PipelineStats::default();
        for doc in docs.iter_mut() {
            stats.record(&self.process(doc));
        }
        info!(?stats, "processed batch");
        stats
    }

    /// Stream JSON Lines from `reader` to `writer`, one document per line.
    ///
    /// Blank lines are skipped. A line that is not a JSON object fails the
    /// run with its line number.
    #[instrument(skip_all)]
    pub fn process_lines<R, W>(&self, reader: R, mut writer: W) -> Result<PipelineStats>
    where
        R: BufRead,
        W: Write,
    {
        let mut stats = PipelineStats::default();

        for (i, line) in reader.lines().enumerate() {
            let line_no = i + 1;
            let line = line.map_err(|e| StandardsRiverError::io("<input>", e))?;
            if line.trim().is_empty() {
                continue;
            }

            let mut doc = match serde_json::from_str::<Value>(&line) {
                Ok(Value::Object(doc)) => doc,
                Ok(_) => {
                    return Err(StandardsRiverError::parse(format!(
                        "line {line_no}: expected a JSON object"
                    )));
                }
                Err(e) => {
                    return Err(StandardsRiverError::parse(format!("line {line_no}: {e}")));
                }
            };

            let report = self.process(&mut doc);
            debug!(line_no, ?report, "processed document");
            stats.record(&report);

            serde_json::to_writer(&mut writer, &doc)
                .map_err(|e| StandardsRiverError::parse(format!("line {line_no}: {e}")))?;
            writer
                .write_all(b"\n")
                .map_err(|e| StandardsRiverError::io("<output>", e))?;
        }

        writer
            .flush()
            .map_err(|e| StandardsRiverError::io("<output>", e))?;
        info!(?stats, "processed document stream");
        Ok(stats)
    }
}
