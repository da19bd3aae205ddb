//! tcex.json model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// File name of the CLI/package configuration
pub const TCEX_JSON: &str = "tcex.json";

/// Package section of tcex.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageConfig {
    /// App name used for the package folder and archive name
    #[serde(default)]
    pub app_name: String,

    /// Overrides the "v{major}" package folder suffix for older Apps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    /// Additional glob patterns excluded from the package
    #[serde(default)]
    pub excludes: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// tcex.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TcexJson {
    #[serde(default)]
    pub package: PackageConfig,

    #[serde(default)]
    pub template_name: Option<String>,

    #[serde(default)]
    pub template_type: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TcexJson {
    /// Load tcex.json from a file path
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::TcexError::Config(format!("Could not read {}: {}", path.display(), e))
        })?;
        let tj: Self = serde_json::from_str(&content)?;
        Ok(tj)
    }

    /// Load tcex.json from an App directory
    pub fn from_dir(dir: &Path) -> crate::Result<Self> {
        Self::from_file(&dir.join(TCEX_JSON))
    }

    /// Write tcex.json as pretty JSON with a trailing newline
    pub fn write(&self, path: &Path) -> crate::Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        std::fs::write(path, content)?;
        Ok(())
    }
}
