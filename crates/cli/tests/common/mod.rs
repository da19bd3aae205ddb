#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated HOME with a seeded template cache and an empty project directory
pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub project: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        let project = tmp.path().join("project");
        fs::create_dir_all(&project).expect("create project dir");
        seed_templates(&home.join(".tcex/templates/templates-v2"));

        Self {
            _tmp: tmp,
            home,
            project,
        }
    }

    /// `tcex` running in the project directory. Remote calls go to a closed
    /// port so the seeded cache is used as is.
    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("tcex");
        cmd.current_dir(&self.project)
            .env("HOME", &self.home)
            .env("TCEX_TEMPLATE_API_URL", "http://127.0.0.1:9")
            .env_remove("TC_PROXY_HOST")
            .env_remove("TC_PROXY_PORT")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn write(&self, rel: &str, content: &str) {
        write(&self.project, rel, content);
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.project.join(rel)).expect("read project file")
    }

    /// Minimal valid playbook App
    pub fn seed_app(&self) {
        self.write(
            "install.json",
            r#"{
    "displayName": "Sample App",
    "features": ["appBuilderCompliant"],
    "params": [
        {"name": "indicator", "type": "String", "required": true, "playbookDataType": ["String"]},
        {"name": "verbose", "type": "Boolean", "default": true}
    ],
    "playbook": {"outputVariables": [{"name": "sample.out", "type": "String"}]},
    "programMain": "run",
    "programVersion": "1.0.0",
    "runtimeLevel": "Playbook"
}"#,
        );
        self.write(
            "tcex.json",
            r#"{"package": {"app_name": "TCPB_-_Sample", "excludes": []}}"#,
        );
        self.write("run.py", "print('hello')\n");
        self.write("app.py", "class App: pass\n");
        self.write("log/app.log", "old log\n");
        self.write("tests/test_app.py", "def test(): pass\n");
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent dir")).expect("create parent dir");
    fs::write(path, content).expect("write file");
}

fn template_yaml(parents: &[&str]) -> String {
    let mut yaml = String::from(
        "contributor: ThreatConnect\ndescription: test\nsummary: test template\nversion: 1.0.0\n",
    );
    if !parents.is_empty() {
        yaml.push_str("template_parents:\n");
        for p in parents {
            yaml.push_str(&format!("  - {}\n", p));
        }
    }
    yaml
}

fn seed_templates(dir: &Path) {
    write(dir, "_app_common/template.yaml", &template_yaml(&[]));
    write(dir, "_app_common/README.md", "common readme\n");
    write(dir, "_app_common/requirements.txt", "tcex\n");
    write(dir, "_app_common/gitignore", "*.pyc\n");

    write(dir, "playbook/basic/template.yaml", &template_yaml(&["_app_common"]));
    write(dir, "playbook/basic/app.py", "class App: pass\n");
    write(dir, "playbook/basic/run.py", "run()\n");
    write(dir, "playbook/basic/.appbuilderconfig", "{}\n");
    write(
        dir,
        "playbook/basic/tcex.json",
        r#"{"package": {"app_name": "", "excludes": []}, "template_name": "basic", "template_type": "playbook"}"#,
    );

    write(dir, "organization/basic/template.yaml", &template_yaml(&["_app_common"]));
    write(dir, "organization/basic/job_app.py", "basic\n");
}
