//! Playbook variables - `#App:{id}:{name}!{type}`

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tcex_shared::TcexError;

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#([A-Za-z]+):(\d+):([A-Za-z0-9_.\-\[\]]+)!([A-Za-z0-9]+)$")
            .expect("playbook variable pattern is valid")
    })
}

/// Playbook data types understood by the stager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybookDataType {
    Binary,
    BinaryArray,
    KeyValue,
    KeyValueArray,
    String,
    StringArray,
    TCEntity,
    TCEntityArray,
    TCBatch,
    /// Anything not listed above, staged as a String
    Unknown,
}

impl PlaybookDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybookDataType::Binary => "Binary",
            PlaybookDataType::BinaryArray => "BinaryArray",
            PlaybookDataType::KeyValue => "KeyValue",
            PlaybookDataType::KeyValueArray => "KeyValueArray",
            PlaybookDataType::String => "String",
            PlaybookDataType::StringArray => "StringArray",
            PlaybookDataType::TCEntity => "TCEntity",
            PlaybookDataType::TCEntityArray => "TCEntityArray",
            PlaybookDataType::TCBatch => "TCBatch",
            PlaybookDataType::Unknown => "Unknown",
        }
    }

    pub fn is_array(&self) -> bool {
        self.as_str().ends_with("Array")
    }
}

impl From<&str> for PlaybookDataType {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "binary" => PlaybookDataType::Binary,
            "binaryarray" => PlaybookDataType::BinaryArray,
            "keyvalue" => PlaybookDataType::KeyValue,
            "keyvaluearray" => PlaybookDataType::KeyValueArray,
            "string" => PlaybookDataType::String,
            "stringarray" => PlaybookDataType::StringArray,
            "tcentity" => PlaybookDataType::TCEntity,
            "tcentityarray" => PlaybookDataType::TCEntityArray,
            "tcbatch" => PlaybookDataType::TCBatch,
            _ => PlaybookDataType::Unknown,
        }
    }
}

impl fmt::Display for PlaybookDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A playbook variable whose value lives in the key/value store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedVariable {
    pub app_id: u64,
    pub name: String,
    pub data_type: String,
}

impl StagedVariable {
    /// Create a new staged variable
    pub fn new(app_id: u64, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            app_id,
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    /// Parse `#App:{id}:{name}!{type}`, returning None for anything else
    pub fn parse(value: &str) -> Option<Self> {
        let caps = variable_pattern().captures(value.trim())?;
        Some(Self {
            app_id: caps[2].parse().ok()?,
            name: caps[3].to_string(),
            data_type: caps[4].to_string(),
        })
    }

    /// Check if a string looks like a playbook variable
    pub fn is_variable(value: &str) -> bool {
        variable_pattern().is_match(value.trim())
    }

    pub fn playbook_data_type(&self) -> PlaybookDataType {
        PlaybookDataType::from(self.data_type.as_str())
    }
}

impl fmt::Display for StagedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#App:{}:{}!{}", self.app_id, self.name, self.data_type)
    }
}

impl FromStr for StagedVariable {
    type Err = TcexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            TcexError::Staging(format!("Invalid playbook variable: {}", s))
        })
    }
}

/// Infer the playbook data type of a literal value
pub fn detect_type(value: &Value) -> Option<PlaybookDataType> {
    match value {
        Value::Array(items) => match items.first().and_then(detect_type)? {
            PlaybookDataType::Binary => Some(PlaybookDataType::BinaryArray),
            PlaybookDataType::KeyValue => Some(PlaybookDataType::KeyValueArray),
            PlaybookDataType::String => Some(PlaybookDataType::StringArray),
            PlaybookDataType::TCEntity => Some(PlaybookDataType::TCEntityArray),
            _ => None,
        },
        Value::Object(map) => {
            if ["type", "value", "id"].iter().all(|k| map.contains_key(*k)) {
                Some(PlaybookDataType::TCEntity)
            } else if map.contains_key("key") && map.contains_key("value") {
                Some(PlaybookDataType::KeyValue)
            } else {
                None
            }
        }
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Some(PlaybookDataType::String),
        Value::Null => None,
    }
}
