//! Bridge Configuration
//!
//! Engine, layout and output settings stored in TOML format. Settings are
//! read once per process: the coordinate convention never changes mid-run.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::geometry::{CoordinateUnits, VerticalOrigin};
use crate::layout::DEFAULT_SAME_LINE_OVERLAP;
use crate::vision::{OcrGranularity, OracleBackend};

/// Bridge settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// OCR engine settings
    pub engine: EngineSettings,
    /// Geometry and ordering settings
    pub layout: LayoutSettings,
    /// Serialization settings
    pub output: OutputSettings,
}

/// OCR engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Which oracle to use
    pub backend: OracleBackend,
    /// Recognizer language (BCP-47 tag, e.g. "en-US")
    pub language: String,
    /// Report whole lines or single words
    pub granularity: OcrGranularity,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backend: OracleBackend::Native,
            language: "en-US".to_string(),
            granularity: OcrGranularity::Line,
        }
    }
}

/// Normalizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Share of the shorter box height two boxes must overlap to be on one line (0.0 - 1.0)
    pub same_line_overlap: f64,
    /// Units of normalized output
    pub units: CoordinateUnits,
    /// Ignore the engine's declared vertical origin and use this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_override: Option<VerticalOrigin>,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            same_line_overlap: DEFAULT_SAME_LINE_OVERLAP,
            units: CoordinateUnits::Normalized,
            origin_override: None,
        }
    }
}

/// Serializer settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Indent the with-position JSON
    pub pretty_json: bool,
}

impl BridgeConfig {
    /// Clamp out-of-range values
    pub fn validated(mut self) -> Self {
        let overlap = self.layout.same_line_overlap;
        if !(0.0..=1.0).contains(&overlap) {
            let clamped = if overlap.is_nan() {
                DEFAULT_SAME_LINE_OVERLAP
            } else {
                overlap.clamp(0.0, 1.0)
            };
            warn!("same_line_overlap {} out of range, using {}", overlap, clamped);
            self.layout.same_line_overlap = clamped;
        }
        self
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: BridgeConfig = toml::from_str(&content)?;
    Ok(config.validated())
}

/// Save configuration to file
pub fn save_config(config: &BridgeConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "ocrbridge", "OcrBridge")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Load configuration from the default location or fall back to defaults
pub fn load_or_default() -> BridgeConfig {
    if let Ok(config_dir) = get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            match load_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return config;
                }
                Err(e) => warn!("Ignoring invalid configuration {:?}: {}", config_path, e),
            }
        }
    }
    info!("Using default configuration");
    BridgeConfig::default()
}
