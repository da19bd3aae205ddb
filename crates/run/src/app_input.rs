//! AppInputGenerator - scaffold app_inputs.json from install.json params

use serde_json::{json, Value};
use std::path::Path;
use tcex_shared::{AppInputs, InstallJson, Param, ParamType, Prompter, Result, TcexError};

/// App id used in generated variables
const GENERATED_APP_ID: u64 = 1022;

/// Types offered when a param accepts `Any`
const ANY_TYPES: [&str; 8] = [
    "Binary",
    "BinaryArray",
    "KeyValue",
    "KeyValueArray",
    "String",
    "StringArray",
    "TCEntity",
    "TCEntityArray",
];

/// Sample staged value for a playbook data type
fn sample_value(data_type: &str) -> Option<Value> {
    let key_value = json!({"key": "sampleKey", "value": "sampleValue"});
    let entity = json!({"id": "123", "type": "Address", "value": "1.1.1.1"});
    let value = match data_type {
        "Any" | "String" => json!("sampleString"),
        "Binary" => json!("<base64 encoded string>"),
        "BinaryArray" => json!(["<base64 encoded string>"]),
        "KeyValue" => key_value,
        "KeyValueArray" => json!([key_value]),
        "StringArray" => json!(["sampleString"]),
        "TCEntity" => entity,
        "TCEntityArray" => json!([entity]),
        _ => return None,
    };
    Some(value)
}

/// Generates app_inputs.json content
pub struct AppInputGenerator<'a> {
    install_json: InstallJson,
    include_optional: bool,
    prompter: &'a dyn Prompter,
}

impl<'a> AppInputGenerator<'a> {
    pub fn new(install_json: InstallJson, include_optional: bool, prompter: &'a dyn Prompter) -> Self {
        Self {
            install_json,
            include_optional,
            prompter,
        }
    }

    /// Build inputs and staged kvstore samples for every supported param
    pub fn generate(&self) -> Result<AppInputs> {
        let mut app_inputs = AppInputs::default();

        for param in &self.install_json.params {
            tracing::debug!(action = "app-input", param = %param.name, "processing parameter");

            // booleans always carry a value
            let required = param.required || param.param_type == ParamType::Boolean;
            if !required && !self.include_optional && !self.include(param)? {
                tracing::info!(action = "app-input", param = %param.name, "skipping optional parameter");
                continue;
            }

            match &param.param_type {
                ParamType::Boolean => {
                    let value = param
                        .default
                        .as_ref()
                        .filter(|v| !v.is_null())
                        .map(|v| match v {
                            Value::String(s) => s.to_lowercase(),
                            other => other.to_string().to_lowercase(),
                        })
                        .unwrap_or_else(|| "false|true".to_string());
                    app_inputs.inputs.insert(param.name.clone(), Value::String(value));
                }
                ParamType::Choice | ParamType::EditChoice | ParamType::MultiChoice => {
                    let value = param
                        .default_str()
                        .unwrap_or_else(|| param.valid_values.join("|"));
                    app_inputs.inputs.insert(param.name.clone(), Value::String(value));
                }
                ParamType::KeyValueList | ParamType::String => {
                    let data_type = self.playbook_data_type(param)?;
                    let variable = format!("#App:{}:{}!{}", GENERATED_APP_ID, param.name, data_type);
                    let value = stage_value(param, &data_type)?;
                    app_inputs
                        .inputs
                        .insert(param.name.clone(), Value::String(variable.clone()));
                    app_inputs.stage.kvstore.insert(variable, value);
                }
                other => {
                    tracing::debug!(action = "app-input", param = %param.name, param_type = %other, "type not generated");
                }
            }
        }
        Ok(app_inputs)
    }

    fn include(&self, param: &Param) -> Result<bool> {
        let answer = self.prompter.ask(
            &format!("Include optional parameter \"{}\"", param.name),
            &["y", "n"],
            "n",
        )?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }

    /// Data type for the staged variable
    fn playbook_data_type(&self, param: &Param) -> Result<String> {
        if param.param_type == ParamType::KeyValueList {
            return Ok("KeyValueArray".to_string());
        }

        let types: Vec<String> = if param.playbook_data_type.iter().any(|t| t == "Any") {
            if param.playbook_data_type.len() > 1 {
                tracing::warn!(
                    action = "app-input",
                    param = %param.name,
                    "\"Any\" should not be combined with other playbookDataTypes"
                );
            }
            ANY_TYPES.iter().map(|t| t.to_string()).collect()
        } else {
            param.playbook_data_type.clone()
        };

        match types.as_slice() {
            [] => Ok("String".to_string()),
            [only] => Ok(only.clone()),
            [first, ..] => {
                let choices: Vec<&str> = types.iter().map(String::as_str).collect();
                self.prompter.ask(
                    &format!(
                        "Parameter \"{}\" has multiple playbookDataTypes, please choose one",
                        param.name
                    ),
                    &choices,
                    first,
                )
            }
        }
    }

    /// Write `app_inputs` to `path`, asking before replacing an existing file
    pub fn write(&self, app_inputs: &AppInputs, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            let answer = self.prompter.ask(
                &format!("{} already exists. Overwrite?", path.display()),
                &["y", "N"],
                "N",
            )?;
            if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
                return Err(TcexError::Aborted("File not overwritten.".to_string()));
            }
        }
        app_inputs.write(path)?;
        tracing::info!(action = "app-input", path = %path.display(), "app inputs written");
        Ok(())
    }
}

/// Staged sample for a param: its default when set, else a sample for the type
fn stage_value(param: &Param, data_type: &str) -> Result<Value> {
    let sample = sample_value(data_type).ok_or_else(|| {
        TcexError::Config(format!(
            "Unsupported playbookDataType for {}: {}",
            param.name, data_type
        ))
    })?;

    match (param.default_str(), &param.param_type) {
        (Some(default), ParamType::KeyValueList) => serde_json::from_str(&default).map_err(|_| {
            TcexError::Config(format!(
                "Error parsing input for {} -> {}",
                param.name, default
            ))
        }),
        (Some(default), _) => Ok(Value::String(default)),
        (None, _) => Ok(sample),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcex_shared::{AlwaysPrompter, DefaultPrompter, ScriptedPrompter};
    use tempfile::TempDir;

    fn install(params: Value) -> InstallJson {
        serde_json::from_value(json!({"runtimeLevel": "Playbook", "params": params})).unwrap()
    }

    // ============== Generate ==============

    #[test]
    fn test_generate_required_params() {
        let ij = install(json!([
            {"name": "flag", "type": "Boolean", "default": true},
            {"name": "toggle", "type": "Boolean"},
            {"name": "action", "type": "Choice", "required": true, "validValues": ["A", "B"]},
            {"name": "mode", "type": "EditChoice", "required": true, "default": "fast"},
            {"name": "indicator", "type": "String", "required": true, "playbookDataType": ["TCEntity"]},
            {"name": "plain", "type": "String", "required": true},
            {"name": "headers", "type": "KeyValueList", "required": true},
            {"name": "unknown", "type": "Fancy", "required": true}
        ]));
        let prompter = DefaultPrompter;
        let inputs = AppInputGenerator::new(ij, false, &prompter).generate().unwrap();

        assert_eq!(inputs.inputs["flag"], "true");
        assert_eq!(inputs.inputs["toggle"], "false|true");
        assert_eq!(inputs.inputs["action"], "A|B");
        assert_eq!(inputs.inputs["mode"], "fast");
        assert_eq!(inputs.inputs["indicator"], "#App:1022:indicator!TCEntity");
        assert_eq!(inputs.inputs["plain"], "#App:1022:plain!String");
        assert_eq!(inputs.inputs["headers"], "#App:1022:headers!KeyValueArray");
        assert!(!inputs.inputs.contains_key("unknown"));

        let kv = &inputs.stage.kvstore;
        assert_eq!(
            kv["#App:1022:indicator!TCEntity"],
            json!({"id": "123", "type": "Address", "value": "1.1.1.1"})
        );
        assert_eq!(kv["#App:1022:plain!String"], "sampleString");
        assert_eq!(
            kv["#App:1022:headers!KeyValueArray"],
            json!([{"key": "sampleKey", "value": "sampleValue"}])
        );
    }

    #[test]
    fn test_defaults_are_staged() {
        let ij = install(json!([
            {"name": "text", "type": "String", "required": true, "default": "hello"},
            {"name": "pairs", "type": "KeyValueList", "required": true,
             "default": "[{\"key\": \"a\", \"value\": \"b\"}]"}
        ]));
        let inputs = AppInputGenerator::new(ij, false, &DefaultPrompter).generate().unwrap();
        assert_eq!(inputs.stage.kvstore["#App:1022:text!String"], "hello");
        assert_eq!(
            inputs.stage.kvstore["#App:1022:pairs!KeyValueArray"],
            json!([{"key": "a", "value": "b"}])
        );
    }

    #[test]
    fn test_invalid_key_value_default() {
        let ij = install(json!([
            {"name": "pairs", "type": "KeyValueList", "required": true, "default": "not json"}
        ]));
        let err = AppInputGenerator::new(ij, false, &DefaultPrompter)
            .generate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Error parsing input for pairs -> not json"
        );
    }

    #[test]
    fn test_optional_params_prompt() {
        let ij = install(json!([
            {"name": "first", "type": "String"},
            {"name": "second", "type": "String"}
        ]));
        let prompter = ScriptedPrompter::new(["y", "n"]);
        let inputs = AppInputGenerator::new(ij.clone(), false, &prompter).generate().unwrap();
        assert!(inputs.inputs.contains_key("first"));
        assert!(!inputs.inputs.contains_key("second"));
        assert_eq!(prompter.asked()[0], "Include optional parameter \"first\"");

        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        let inputs = AppInputGenerator::new(ij, true, &prompter).generate().unwrap();
        assert_eq!(inputs.inputs.len(), 2);
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn test_multiple_data_types_prompt() {
        let ij = install(json!([
            {"name": "multi", "type": "String", "required": true,
             "playbookDataType": ["String", "StringArray"]},
            {"name": "any", "type": "String", "required": true, "playbookDataType": ["Any"]}
        ]));
        let prompter = ScriptedPrompter::new(["StringArray"]);
        let inputs = AppInputGenerator::new(ij, false, &prompter).generate().unwrap();
        assert_eq!(inputs.inputs["multi"], "#App:1022:multi!StringArray");
        // falls back to the first choice
        assert_eq!(inputs.inputs["any"], "#App:1022:any!Binary");
        assert_eq!(
            inputs.stage.kvstore["#App:1022:any!Binary"],
            "<base64 encoded string>"
        );
    }

    #[test]
    fn test_unsupported_data_type() {
        let ij = install(json!([
            {"name": "batch", "type": "String", "required": true, "playbookDataType": ["TCBatch"]}
        ]));
        let err = AppInputGenerator::new(ij, false, &DefaultPrompter)
            .generate()
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported playbookDataType for batch: TCBatch"));
    }

    // ============== Write ==============

    #[test]
    fn test_write_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app_inputs.json");
        std::fs::write(&path, "{}").unwrap();
        let inputs = AppInputs::default();

        let generator = AppInputGenerator::new(InstallJson::default(), false, &DefaultPrompter);
        assert!(matches!(
            generator.write(&inputs, &path, false),
            Err(TcexError::Aborted(_))
        ));

        let yes = AlwaysPrompter("yes".to_string());
        let generator = AppInputGenerator::new(InstallJson::default(), false, &yes);
        generator.write(&inputs, &path, false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"inputs\""));

        let generator = AppInputGenerator::new(InstallJson::default(), false, &DefaultPrompter);
        generator.write(&inputs, &path, true).unwrap();
    }
}
