//! install.json model
//!
//! The App's platform metadata. Only the fields the CLI works with are typed,
//! everything else is carried through `extra` so a rewrite does not drop keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// File name of the App install configuration
pub const INSTALL_JSON: &str = "install.json";

/// Input parameter type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParamType {
    Boolean,
    Choice,
    EditChoice,
    KeyValueList,
    MultiChoice,
    String,
    StringMixed,
    Other(std::string::String),
}

impl From<std::string::String> for ParamType {
    fn from(value: std::string::String) -> Self {
        match value.as_str() {
            "Boolean" => ParamType::Boolean,
            "Choice" => ParamType::Choice,
            "EditChoice" => ParamType::EditChoice,
            "KeyValueList" => ParamType::KeyValueList,
            "MultiChoice" => ParamType::MultiChoice,
            "String" => ParamType::String,
            "StringMixed" => ParamType::StringMixed,
            _ => ParamType::Other(value),
        }
    }
}

impl From<ParamType> for std::string::String {
    fn from(value: ParamType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::Boolean => "Boolean",
            ParamType::Choice => "Choice",
            ParamType::EditChoice => "EditChoice",
            ParamType::KeyValueList => "KeyValueList",
            ParamType::MultiChoice => "MultiChoice",
            ParamType::String => "String",
            ParamType::StringMixed => "StringMixed",
            ParamType::Other(other) => other.as_str(),
        };
        f.write_str(s)
    }
}

/// App runtime level
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeLevel {
    Organization,
    Playbook,
    ApiService,
    FeedApiService,
    TriggerService,
    WebhookTriggerService,
    Other(String),
}

impl From<&str> for RuntimeLevel {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "organization" => RuntimeLevel::Organization,
            "playbook" => RuntimeLevel::Playbook,
            "apiservice" => RuntimeLevel::ApiService,
            "feedapiservice" => RuntimeLevel::FeedApiService,
            "triggerservice" => RuntimeLevel::TriggerService,
            "webhooktriggerservice" => RuntimeLevel::WebhookTriggerService,
            _ => RuntimeLevel::Other(value.to_string()),
        }
    }
}

/// A single App input parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Param {
    pub name: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(rename = "type")]
    pub param_type: ParamType,

    #[serde(default)]
    pub required: bool,

    /// Default value; install.json allows strings, bools and numbers here
    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub valid_values: Vec<String>,

    #[serde(default)]
    pub playbook_data_type: Vec<String>,

    #[serde(default)]
    pub encrypt: bool,

    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub note: Option<String>,

    #[serde(default)]
    pub sequence: Option<i64>,

    #[serde(default)]
    pub allow_multiple: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Param {
    /// Return the default as a string, if one is set and non-empty
    pub fn default_str(&self) -> Option<String> {
        match &self.default {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Playbook output variable definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub variable_type: String,
}

/// Playbook section of install.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playbook {
    #[serde(default)]
    pub output_variables: Vec<OutputVariable>,

    #[serde(rename = "type", default)]
    pub playbook_type: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// install.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallJson {
    #[serde(default)]
    pub allow_on_demand: Option<bool>,

    #[serde(default)]
    pub app_id: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub language_version: Option<String>,

    #[serde(default)]
    pub list_delimiter: Option<String>,

    #[serde(default)]
    pub min_server_version: Option<String>,

    #[serde(default)]
    pub note: Option<String>,

    #[serde(default)]
    pub params: Vec<Param>,

    #[serde(default)]
    pub playbook: Option<Playbook>,

    #[serde(default)]
    pub program_language: Option<String>,

    #[serde(default)]
    pub program_main: Option<String>,

    #[serde(default)]
    pub program_version: Option<String>,

    #[serde(default)]
    pub runtime_level: Option<String>,

    #[serde(default)]
    pub sdk_version: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstallJson {
    /// Load install.json from a file path
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::TcexError::Config(format!("Could not read {}: {}", path.display(), e))
        })?;
        let ij: Self = serde_json::from_str(&content)?;
        Ok(ij)
    }

    /// Load install.json from an App directory
    pub fn from_dir(dir: &Path) -> crate::Result<Self> {
        Self::from_file(&dir.join(INSTALL_JSON))
    }

    /// Major version prefixed with "v", used as the package folder suffix
    pub fn package_version(&self) -> String {
        let major = self
            .program_version
            .as_deref()
            .and_then(|v| v.trim().trim_start_matches('v').split('.').next())
            .and_then(|m| m.parse::<u64>().ok())
            .unwrap_or(1);
        format!("v{}", major)
    }

    /// Runtime level of the App
    pub fn runtime_level(&self) -> RuntimeLevel {
        RuntimeLevel::from(self.runtime_level.as_deref().unwrap_or_default())
    }

    /// Check if this is a playbook App
    pub fn is_playbook_app(&self) -> bool {
        self.runtime_level() == RuntimeLevel::Playbook
    }

    /// Look up a param by name
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Output variables formatted as playbook variables
    pub fn tc_playbook_out_variables(&self) -> Vec<String> {
        self.playbook
            .as_ref()
            .map(|pb| {
                pb.output_variables
                    .iter()
                    .map(|ov| format!("#App:1234:{}!{}", ov.name, ov.variable_type))
                    .collect()
            })
            .unwrap_or_default()
    }
}
