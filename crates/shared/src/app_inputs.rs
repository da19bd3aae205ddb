//! app_inputs.json model
//!
//! Local run configuration: the App inputs plus the key/value data staged
//! before a playbook App starts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Default file name of the local run configuration
pub const APP_INPUTS_JSON: &str = "app_inputs.json";

/// Data staged before the App runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Playbook variable -> value
    #[serde(default)]
    pub kvstore: Map<String, Value>,
}

/// app_inputs.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppInputs {
    #[serde(default)]
    pub inputs: Map<String, Value>,

    #[serde(default)]
    pub stage: Stage,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trigger_inputs: Vec<Value>,
}

impl AppInputs {
    /// Load app_inputs.json from a file path
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            crate::TcexError::Config(format!("Error loading {}: {}", path.display(), e))
        })
    }

    /// Write app_inputs.json with 4-space indentation
    pub fn write(&self, path: &Path) -> crate::Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        std::fs::write(path, buf)?;
        Ok(())
    }
}
