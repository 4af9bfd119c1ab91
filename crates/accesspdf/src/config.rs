//! `accesspdf.yaml` configuration.
//!
//! Every field has a default, so a missing file or a partial file is
//! fine. Lookup order: an explicit path, `./accesspdf.yaml`, then
//! `<config dir>/accesspdf/accesspdf.yaml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use accesspdf_core::{DEFAULT_LANGUAGE, PdfError};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "accesspdf.yaml";

/// Settings for alt-text generation providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Provider name; `none` disables generation.
    pub provider: String,
    pub model: String,
    /// Fixed gap enforced between consecutive requests.
    pub min_interval_secs: f64,
    pub max_retries: u32,
    pub initial_backoff_secs: f64,
    pub max_backoff_secs: f64,
    /// Longest side of images sent to a provider.
    pub max_image_dim: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            model: String::new(),
            min_interval_secs: 5.0,
            max_retries: 3,
            initial_backoff_secs: 2.0,
            max_backoff_secs: 60.0,
            max_image_dim: 512,
        }
    }
}

impl AiConfig {
    pub fn min_interval(&self) -> Duration {
        secs(self.min_interval_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        secs(self.initial_backoff_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        secs(self.max_backoff_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Appended to the file stem of remediated copies.
    pub suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: "_accessible".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Deadline for the XMP title update.
    pub xmp_timeout_secs: f64,
    /// Language used when detection is inconclusive.
    pub default_lang: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            xmp_timeout_secs: 5.0,
            default_lang: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl MetadataConfig {
    pub fn xmp_timeout(&self) -> Duration {
        secs(self.xmp_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads; 0 uses one per core.
    pub workers: usize,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai: AiConfig,
    pub output: OutputConfig,
    pub metadata: MetadataConfig,
    pub batch: BatchConfig,
}

fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

impl Config {
    /// Parse YAML text. An empty document yields the defaults.
    pub fn from_yaml(text: &str) -> Result<Self, PdfError> {
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(text).map_err(|e| PdfError::ConfigError(e.to_string()))
    }

    /// Read a specific file.
    pub fn from_file(path: &Path) -> Result<Self, PdfError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PdfError::ConfigError(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&text)
            .map_err(|e| PdfError::ConfigError(format!("{}: {e}", path.display())))
    }

    /// Candidate paths in lookup order.
    pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = explicit {
            paths.push(path.to_path_buf());
        }
        paths.push(PathBuf::from(CONFIG_FILE_NAME));
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("accesspdf").join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Load the first configuration file found, or the defaults.
    ///
    /// An explicit path that does not exist is an error; the implicit
    /// locations are simply skipped.
    pub fn load(explicit: Option<&Path>) -> Result<Self, PdfError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(PdfError::ConfigError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
        }
        for path in Self::search_paths(explicit) {
            if path.is_file() {
                debug!(path = %path.display(), "loading configuration");
                return Self::from_file(&path);
            }
        }
        Ok(Config::default())
    }
}
