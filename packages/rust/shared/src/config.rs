//! Application configuration for standardsriver.
//!
//! User config lives at `~/.standardsriver/standardsriver.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StandardsRiverError};
use crate::types::{ID_FIELD, STANDARDS_FIELD, VERSION_FIELD};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "standardsriver.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".standardsriver";

// ---------------------------------------------------------------------------
// Config structs (matching standardsriver.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the standards reference table comes from.
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// Document field names.
    #[serde(default)]
    pub fields: FieldNames,

    /// Per-document pipeline switches.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[reference]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Name of the collection holding the standards.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Path to an exported copy of the collection (JSON array or JSON Lines).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            path: None,
        }
    }
}

fn default_collection() -> String {
    "ccstandards".into()
}

/// `[fields]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    /// Array field holding standard short codes.
    #[serde(default = "default_standards_field")]
    pub standards: String,

    /// Identifier field.
    #[serde(default = "default_id_field")]
    pub id: String,

    /// Version field written next to a flattened identifier.
    #[serde(default = "default_version_field")]
    pub version: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            standards: default_standards_field(),
            id: default_id_field(),
            version: default_version_field(),
        }
    }
}

fn default_standards_field() -> String {
    STANDARDS_FIELD.into()
}
fn default_id_field() -> String {
    ID_FIELD.into()
}
fn default_version_field() -> String {
    VERSION_FIELD.into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Flatten composite identifiers before enrichment.
    #[serde(default = "default_true")]
    pub normalize_ids: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            normalize_ids: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.standardsriver/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| StandardsRiverError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.standardsriver/standardsriver.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| StandardsRiverError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        StandardsRiverError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| StandardsRiverError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| StandardsRiverError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| StandardsRiverError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("ccstandards"));
        assert!(toml_str.contains("normalize_ids"));
        assert!(!toml_str.contains("path"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.reference.collection, "ccstandards");
        assert_eq!(parsed.fields, FieldNames::default());
        assert!(parsed.pipeline.normalize_ids);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[reference]
path = "/srv/exports/ccstandards.jsonl"

[fields]
standards = "alignedStandards"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(
            config.reference.path.as_deref(),
            Some(Path::new("/srv/exports/ccstandards.jsonl"))
        );
        assert_eq!(config.reference.collection, "ccstandards");
        assert_eq!(config.fields.standards, "alignedStandards");
        assert_eq!(config.fields.id, "_id");
        assert_eq!(config.fields.version, "version");
    }

    #[test]
    fn load_config_from_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("standardsriver-does-not-exist.toml");
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, StandardsRiverError::Io { .. }));
    }

    #[test]
    fn load_config_from_reports_parse_errors() {
        let path = std::env::temp_dir().join(format!(
            "standardsriver-bad-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[pipeline]\nnormalize_ids = \"sometimes\"\n").unwrap();
        let err = load_config_from(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(err.to_string().starts_with("config error: failed to parse"));
    }
}
