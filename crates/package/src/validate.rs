//! Validator - App configuration checks run before packaging

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tcex_shared::{
    is_semver, InstallJson, ParamType, Result, RuntimeLevel, TcexJson, INSTALL_JSON, TCEX_JSON,
};

/// Data types a param may accept from an upstream playbook App
const PLAYBOOK_DATA_TYPES: [&str; 11] = [
    "Any",
    "Binary",
    "BinaryArray",
    "KeyValue",
    "KeyValueArray",
    "String",
    "StringArray",
    "TCEntity",
    "TCEntityArray",
    "TCEnhancedEntity",
    "TCEnhancedEntityArray",
];

/// Result of parsing one configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxStatus {
    Passed,
    Failed,
}

impl fmt::Display for SyntaxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxStatus::Passed => f.write_str("passed"),
            SyntaxStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Syntax check for a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSyntax {
    pub filename: String,
    pub status: SyntaxStatus,
}

/// Validation results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub file_syntax: Vec<FileSyntax>,
}

impl ValidationReport {
    /// True when there are no errors and every file parsed
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
            && self
                .file_syntax
                .iter()
                .all(|f| f.status == SyntaxStatus::Passed)
    }

    fn syntax(&mut self, filename: &str, passed: bool) {
        self.file_syntax.push(FileSyntax {
            filename: filename.to_string(),
            status: if passed {
                SyntaxStatus::Passed
            } else {
                SyntaxStatus::Failed
            },
        });
    }
}

/// App validator
pub struct Validator;

impl Validator {
    /// Validate the App in `app_dir`
    pub fn validate(app_dir: &Path) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        let install_json = Self::check_syntax(app_dir, INSTALL_JSON, true, &mut report);
        let tcex_json = Self::check_syntax(app_dir, TCEX_JSON, true, &mut report);
        Self::check_syntax(app_dir, "layout.json", false, &mut report);

        let mut app_inputs: Vec<String> = std::fs::read_dir(app_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("app_inputs") && n.ends_with(".json"))
            .collect();
        app_inputs.sort();
        for name in &app_inputs {
            Self::check_syntax(app_dir, name, true, &mut report);
        }

        if let Some(value) = install_json {
            match serde_json::from_value::<InstallJson>(value) {
                Ok(ij) => Self::check_install_json(&ij, &mut report),
                Err(e) => report.errors.push(format!("Invalid install.json: {}", e)),
            }
        }

        if let Some(value) = tcex_json {
            match serde_json::from_value::<TcexJson>(value) {
                Ok(tj) if tj.package.app_name.trim().is_empty() => report
                    .errors
                    .push("tcex.json package.app_name must not be empty.".to_string()),
                Ok(_) => {}
                Err(e) => report.errors.push(format!("Invalid tcex.json: {}", e)),
            }
        }

        tracing::debug!(
            action = "validate",
            errors = report.errors.len(),
            files = report.file_syntax.len(),
            "validation complete"
        );
        Ok(report)
    }

    /// Parse a JSON file and record its syntax status
    fn check_syntax(
        app_dir: &Path,
        filename: &str,
        required: bool,
        report: &mut ValidationReport,
    ) -> Option<Value> {
        let path = app_dir.join(filename);
        if !path.is_file() {
            if required {
                report.errors.push(format!("{} file is missing.", filename));
                report.syntax(filename, false);
            }
            return None;
        }

        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<Value>(&content).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(value) => {
                report.syntax(filename, true);
                Some(value)
            }
            Err(e) => {
                report.errors.push(format!("Syntax error in {}: {}", filename, e));
                report.syntax(filename, false);
                None
            }
        }
    }

    fn check_install_json(ij: &InstallJson, report: &mut ValidationReport) {
        match ij.program_version.as_deref() {
            Some(version) if is_semver(version) => {}
            Some(version) => report.errors.push(format!(
                "install.json programVersion '{}' is not a valid semantic version.",
                version
            )),
            None => report
                .errors
                .push("install.json programVersion is required.".to_string()),
        }

        if let RuntimeLevel::Other(level) = ij.runtime_level() {
            report
                .errors
                .push(format!("install.json runtimeLevel '{}' is not valid.", level));
        }

        let mut seen = BTreeSet::new();
        for param in &ij.params {
            if !seen.insert(param.name.as_str()) {
                report
                    .errors
                    .push(format!("Duplicate param name '{}'.", param.name));
            }
            if !is_valid_param_name(&param.name) {
                report
                    .errors
                    .push(format!("Param name '{}' contains invalid characters.", param.name));
            }
            if matches!(param.param_type, ParamType::Choice | ParamType::MultiChoice)
                && param.valid_values.is_empty()
            {
                report.errors.push(format!(
                    "Param '{}' of type {} requires validValues.",
                    param.name, param.param_type
                ));
            }
            for data_type in &param.playbook_data_type {
                if !PLAYBOOK_DATA_TYPES.contains(&data_type.as_str()) {
                    report.errors.push(format!(
                        "Param '{}' has invalid playbookDataType '{}'.",
                        param.name, data_type
                    ));
                }
            }
        }

        if let Some(playbook) = &ij.playbook {
            let mut outputs = BTreeSet::new();
            for ov in &playbook.output_variables {
                if !outputs.insert((ov.name.as_str(), ov.variable_type.as_str())) {
                    report.errors.push(format!(
                        "Duplicate output variable '{}' ({}).",
                        ov.name, ov.variable_type
                    ));
                }
                if !PLAYBOOK_DATA_TYPES.contains(&ov.variable_type.as_str()) {
                    report.errors.push(format!(
                        "Output variable '{}' has invalid type '{}'.",
                        ov.name, ov.variable_type
                    ));
                }
            }
        }
    }
}

/// Param names are `[A-Za-z0-9_]+`
fn is_valid_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const INSTALL: &str = r#"{
        "programVersion": "1.0.0",
        "runtimeLevel": "Playbook",
        "params": [
            {"name": "action", "type": "Choice", "validValues": ["a", "b"]},
            {"name": "input", "type": "String", "playbookDataType": ["String"]}
        ],
        "playbook": {"outputVariables": [{"name": "out", "type": "String"}]}
    }"#;

    fn app(install: &str, tcex: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(INSTALL_JSON), install).unwrap();
        fs::write(dir.path().join(TCEX_JSON), tcex).unwrap();
        dir
    }

    #[test]
    fn test_valid_app_passes() {
        let dir = app(INSTALL, r#"{"package": {"app_name": "TCPB_-_Test"}}"#);
        fs::write(dir.path().join("app_inputs.json"), "{}").unwrap();

        let report = Validator::validate(dir.path()).unwrap();
        assert!(report.passed(), "{:?}", report.errors);
        let files: Vec<&str> = report.file_syntax.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(files, vec!["install.json", "tcex.json", "app_inputs.json"]);
    }

    #[test]
    fn test_syntax_error_fails() {
        let dir = app("{ nope", r#"{"package": {"app_name": "x"}}"#);
        let report = Validator::validate(dir.path()).unwrap();
        assert!(!report.passed());
        assert_eq!(report.file_syntax[0].status, SyntaxStatus::Failed);
        assert!(report.errors[0].starts_with("Syntax error in install.json"));
    }

    #[test]
    fn test_missing_files() {
        let dir = TempDir::new().unwrap();
        let report = Validator::validate(dir.path()).unwrap();
        assert!(report.errors.contains(&"install.json file is missing.".to_string()));
        assert!(report.errors.contains(&"tcex.json file is missing.".to_string()));
    }

    #[test]
    fn test_install_json_rules() {
        let install = r#"{
            "programVersion": "1.0",
            "runtimeLevel": "Nope",
            "params": [
                {"name": "bad name", "type": "String", "playbookDataType": ["Weird"]},
                {"name": "choice", "type": "MultiChoice"},
                {"name": "choice", "type": "String"}
            ],
            "playbook": {"outputVariables": [
                {"name": "out", "type": "String"},
                {"name": "out", "type": "String"},
                {"name": "any", "type": "Any"},
                {"name": "odd", "type": "Number"}
            ]}
        }"#;
        let dir = app(install, r#"{"package": {"app_name": ""}}"#);
        let report = Validator::validate(dir.path()).unwrap();
        let errors = report.errors.join("\n");

        assert!(errors.contains("programVersion '1.0'"));
        assert!(errors.contains("runtimeLevel 'Nope'"));
        assert!(errors.contains("Param name 'bad name' contains invalid characters."));
        assert!(errors.contains("invalid playbookDataType 'Weird'"));
        assert!(errors.contains("Param 'choice' of type MultiChoice requires validValues."));
        assert!(errors.contains("Duplicate param name 'choice'."));
        assert!(errors.contains("Duplicate output variable 'out' (String)."));
        assert!(!errors.contains("Output variable 'any'"));
        assert!(errors.contains("Output variable 'odd' has invalid type 'Number'."));
        assert!(errors.contains("package.app_name must not be empty"));
    }

    #[test]
    fn test_report_json_shape() {
        let report = ValidationReport {
            errors: vec![],
            file_syntax: vec![FileSyntax {
                filename: "install.json".to_string(),
                status: SyntaxStatus::Passed,
            }],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["fileSyntax"][0]["status"], "passed");
    }
}
