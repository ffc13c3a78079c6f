//! Shared types, error model, and configuration for standardsriver.
//!
//! This crate is the foundation depended on by the other standardsriver crates.
//! It provides:
//! - [`StandardsRiverError`]: the unified error type
//! - Domain types ([`ObjectId`], [`Document`], field-name constants)
//! - Configuration ([`AppConfig`], [`FieldNames`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FieldNames, PipelineConfig, ReferenceConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{IdError, Result, StandardsRiverError};
pub use types::{
    CATEGORY_KEY, DOT_NOTATION_KEY, Document, ID_FIELD, OID_KEY, ObjectId, ObjectIdError,
    STANDARD_FIELDS, STANDARD_KEY, STANDARDS_FIELD, SUB_CATEGORY_KEY, VERSION_FIELD,
};
