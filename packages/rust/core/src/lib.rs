//! Standards enrichment and versioned identifier handling for standardsriver.
//!
//! The reference table is loaded once through a [`source::ReferenceSource`]
//! into an immutable [`ReferenceIndex`], which is then passed explicitly to
//! the [`DocumentEnricher`] (or a [`DocumentPipeline`]) that transforms each
//! content document.

pub mod enrich;
pub mod pipeline;
pub mod reference;
pub mod source;
pub mod versioned_id;

pub use enrich::{DocumentEnricher, EnrichOutcome, expand_standards};
pub use pipeline::{DocumentPipeline, DocumentReport, PipelineStats};
pub use reference::{ReferenceIndex, StandardRecord};
pub use source::{JsonFileSource, ReferenceSource, VecSource, load_index};
pub use versioned_id::{
    IdInput, NormalizeError, Normalization, VersionedId, decode_base_id, decode_value, encode,
    normalize, normalize_with, range_condition, versioned_id_string,
};
