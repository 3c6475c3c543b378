use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::palette::Palette;

pub const DEFAULT_MARKER_SET_ID: &str = "gomlMarkerSet";
pub const DEFAULT_MARKER_SET_LABEL: &str = "GOML Claims";
pub const DEFAULT_FACES_PATH: &str = "tiles/faces/16x16";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelKeys {
    pub claim_type: String,
    pub owners: String,
    pub trusted: String,
    pub augments: String,
}

impl Default for LabelKeys {
    fn default() -> Self {
        Self {
            claim_type: "Claim Type".to_string(),
            owners: "Owners".to_string(),
            trusted: "Trusted".to_string(),
            augments: "Augments".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub marker_set_id: String,
    pub marker_set_label: String,
    pub fallback_world_name: String,
    pub fill_opacity: f64,
    pub line_width: u32,
    pub line_opacity: f64,
    pub include_y_range: bool,
    pub palette: Palette,
    pub label_keys: LabelKeys,
    pub faces_path: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            marker_set_id: DEFAULT_MARKER_SET_ID.to_string(),
            marker_set_label: DEFAULT_MARKER_SET_LABEL.to_string(),
            fallback_world_name: "world".to_string(),
            fill_opacity: 0.25,
            line_width: 2,
            line_opacity: 1.0,
            include_y_range: false,
            palette: Palette::default(),
            label_keys: LabelKeys::default(),
            faces_path: DEFAULT_FACES_PATH.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

pub fn load_sync_config(path: &Path) -> Result<SyncConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sync_config(path, &raw)
}

/// Parses and validates config JSON. `path` is only used in error messages.
pub fn parse_sync_config(path: &Path, raw: &str) -> Result<SyncConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let config = serde_path_to_error::deserialize::<_, SyncConfig>(&mut deserializer).map_err(
        |error| {
            let field = error.path().to_string();
            ConfigError::Parse {
                path: path.to_path_buf(),
                field,
                source: error.into_inner(),
            }
        },
    )?;
    validate(path, &config)?;
    Ok(config)
}

fn validate(path: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::Invalid {
        path: path.to_path_buf(),
        message,
    };
    if config.marker_set_id.trim().is_empty() {
        return Err(invalid("marker_set_id must not be empty".to_string()));
    }
    for (field, value) in [
        ("fill_opacity", config.fill_opacity),
        ("line_opacity", config.line_opacity),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(format!("{field} must be within 0..=1, got {value}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::palette::Rgb;

    #[test]
    fn empty_object_yields_defaults() {
        let config = parse_sync_config(Path::new("inline.json"), "{}").expect("config");
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.marker_set_id, "gomlMarkerSet");
        assert_eq!(config.palette.colors().len(), 16);
    }

    #[test]
    fn loads_overrides_from_file() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("markers.json");
        fs::write(
            &path,
            r##"{
                "marker_set_label": "Land Claims",
                "include_y_range": true,
                "palette": ["#ff0000", "00ff00"],
                "label_keys": { "owners": "Besitzer" }
            }"##,
        )
        .expect("write config");

        let config = load_sync_config(&path).expect("config");
        assert_eq!(config.marker_set_label, "Land Claims");
        assert!(config.include_y_range);
        assert_eq!(config.palette.colors(), &[Rgb(0xff0000), Rgb(0x00ff00)]);
        assert_eq!(config.label_keys.owners, "Besitzer");
        assert_eq!(config.label_keys.trusted, "Trusted");
    }

    #[test]
    fn parse_error_names_the_field() {
        let error = parse_sync_config(
            Path::new("bad.json"),
            r#"{ "palette": ["cfd5d6", "nothex"] }"#,
        )
        .expect_err("error");
        let ConfigError::Parse { field, .. } = error else {
            panic!("expected parse error");
        };
        assert!(field.starts_with("palette"), "field={field}");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = parse_sync_config(Path::new("bad.json"), r#"{ "colour": 1 }"#)
            .expect_err("error");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn opacity_out_of_range_is_invalid() {
        let error = parse_sync_config(Path::new("bad.json"), r#"{ "fill_opacity": 1.5 }"#)
            .expect_err("error");
        assert!(matches!(error, ConfigError::Invalid { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let temp = TempDir::new().expect("tempdir");
        let error = load_sync_config(&temp.path().join("absent.json")).expect_err("error");
        assert!(matches!(error, ConfigError::Read { .. }));
    }
}
