//! Launcher - run an App locally with inputs from app_inputs.json

use crate::kvstore::KvStore;
use crate::stager::stage;
use crate::variable::{detect_type, StagedVariable};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::Command;
use tcex_shared::{AppInputs, InstallJson, ParamType, Result, TcexError, APP_INPUTS_JSON};

/// App id used for variables staged from literal inputs
const LITERAL_APP_ID: u64 = 1234;

/// Local App launcher
#[derive(Debug)]
pub struct Launcher {
    app_dir: PathBuf,
    config_path: PathBuf,
    python: String,
    install_json: InstallJson,
    app_inputs: AppInputs,
}

impl Launcher {
    /// Create a launcher for `app_dir` reading `app_inputs.json`
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        let app_dir = app_dir.into();
        Self {
            config_path: app_dir.join(APP_INPUTS_JSON),
            app_dir,
            python: "python3".to_string(),
            install_json: InstallJson::default(),
            app_inputs: AppInputs::default(),
        }
    }

    /// Use a different inputs file; relative paths resolve against the App directory
    pub fn with_config(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = self.app_dir.join(path);
        self
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// Read install.json and the inputs file. A missing inputs file means no inputs.
    pub fn load(mut self) -> Result<Self> {
        self.install_json = InstallJson::from_dir(&self.app_dir)?;
        self.app_inputs = if self.config_path.is_file() {
            AppInputs::from_file(&self.config_path)?
        } else {
            tracing::warn!(
                action = "load-inputs",
                path = %self.config_path.display(),
                "inputs file not found, running with defaults"
            );
            AppInputs::default()
        };
        Ok(self)
    }

    pub fn install_json(&self) -> &InstallJson {
        &self.install_json
    }

    pub fn app_inputs(&self) -> &AppInputs {
        &self.app_inputs
    }

    /// Default inputs for the App's runtime level
    fn default_inputs(&self) -> Map<String, Value> {
        let mut inputs = Map::new();
        for key in ["tc_log_path", "tc_in_path", "tc_out_path", "tc_temp_path"] {
            inputs.insert(key.to_string(), Value::from("log"));
        }
        inputs.insert("tc_log_file".to_string(), Value::from("app.log"));
        inputs.insert("tc_log_level".to_string(), Value::from("trace"));

        if self.install_json.is_playbook_app() {
            inputs.insert("tc_kvstore_host".to_string(), Value::from("localhost"));
            inputs.insert("tc_kvstore_port".to_string(), Value::from(6379));
            inputs.insert("tc_kvstore_type".to_string(), Value::from("Redis"));
            inputs.insert("tc_playbook_kvstore_id".to_string(), Value::from(0));
            inputs.insert(
                "tc_playbook_kvstore_context".to_string(),
                Value::from(uuid::Uuid::new_v4().to_string()),
            );
            inputs.insert(
                "tc_playbook_out_variables".to_string(),
                Value::from(self.install_json.tc_playbook_out_variables().join(",")),
            );
        }
        inputs
    }

    /// Inputs for the App process, staging playbook data along the way
    pub fn prepare_inputs(&self, store: &dyn KvStore) -> Result<Map<String, Value>> {
        let mut inputs = self.default_inputs();
        for (key, value) in &self.app_inputs.inputs {
            inputs.insert(key.clone(), value.clone());
        }

        if !self.install_json.is_playbook_app() {
            return Ok(inputs);
        }
        let context = playbook_context(&inputs)
            .ok_or_else(|| {
                TcexError::Config("tc_playbook_kvstore_context must be a string.".to_string())
            })?
            .to_string();

        for (name, value) in &self.app_inputs.stage.kvstore {
            let variable: StagedVariable = name.parse()?;
            stage(store, &context, &variable, value)?;
        }

        for param in &self.install_json.params {
            if param.name.starts_with("tc_")
                || !matches!(
                    param.param_type,
                    ParamType::String | ParamType::KeyValueList | ParamType::EditChoice
                )
            {
                continue;
            }
            let Some(value) = inputs.get(&param.name).filter(|v| !v.is_null()) else {
                continue;
            };
            if value.as_str().is_some_and(StagedVariable::is_variable) {
                continue;
            }

            let data_type = detect_type(value)
                .map(|t| t.as_str().to_string())
                .or_else(|| param.playbook_data_type.first().cloned())
                .unwrap_or_else(|| "String".to_string());
            let variable = StagedVariable::new(LITERAL_APP_ID, &param.name, data_type);
            if stage(store, &context, &variable, value)? {
                inputs.insert(param.name.clone(), Value::String(variable.to_string()));
            }
        }
        Ok(inputs)
    }

    /// Environment for the App process: upper-cased input names
    pub fn env(inputs: &Map<String, Value>) -> Vec<(String, String)> {
        inputs
            .iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    other => other.to_string(),
                };
                Some((key.to_ascii_uppercase(), value))
            })
            .collect()
    }

    /// Entry point script, `run.py` unless install.json sets `programMain`
    pub fn program_file(&self) -> String {
        let main = self
            .install_json
            .program_main
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("run");
        format!("{}.py", main.trim_end_matches(".py"))
    }

    /// Run the App and return its exit code
    pub fn launch(&self, inputs: &Map<String, Value>) -> Result<i32> {
        let program = self.program_file();
        tracing::info!(
            action = "launch",
            python = %self.python,
            program = %program,
            app_dir = %self.app_dir.display(),
            "launching App"
        );
        let status = Command::new(&self.python)
            .arg(&program)
            .current_dir(&self.app_dir)
            .envs(Self::env(inputs))
            .status()
            .map_err(|e| {
                TcexError::Other(format!("Failed to launch {} with {}: {}", program, self.python, e))
            })?;
        Ok(status.code().unwrap_or(1))
    }

    /// Everything the App wrote to its playbook context, JSON decoded
    pub fn output_data(store: &dyn KvStore, context: &str) -> Result<Map<String, Value>> {
        Ok(store
            .hgetall(context)?
            .into_iter()
            .map(|(key, raw)| {
                let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
                (key, value)
            })
            .collect())
    }
}

/// Playbook context from prepared inputs
pub fn playbook_context(inputs: &Map<String, Value>) -> Option<&str> {
    inputs.get("tc_playbook_kvstore_context").and_then(Value::as_str)
}

/// KV store `(host, port, db)` from prepared inputs
pub fn kvstore_address(inputs: &Map<String, Value>) -> (String, u16, u32) {
    fn number<T: std::str::FromStr>(value: Option<&Value>) -> Option<T> {
        match value? {
            Value::Number(n) => n.to_string().parse().ok(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
    let host = inputs
        .get("tc_kvstore_host")
        .and_then(Value::as_str)
        .unwrap_or("localhost")
        .to_string();
    let port: u16 = number(inputs.get("tc_kvstore_port")).unwrap_or(6379);
    let db: u32 = number(inputs.get("tc_playbook_kvstore_id")).unwrap_or(0);
    (host, port, db)
}
