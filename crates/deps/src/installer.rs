//! DepsInstaller - pip driven dependency install

use crate::runner::{CommandRunner, SystemRunner};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tcex_shared::{InstallJson, ProxySettings, Result, TcexError, INSTALL_JSON};

const REQUIREMENTS: &str = "requirements.txt";
const DEPS_DIR: &str = "deps";
const DEPS_TESTS_DIR: &str = "deps_tests";

/// Dependency installer for an App directory
pub struct DepsInstaller {
    app_dir: PathBuf,
    python: String,
    app_builder: bool,
    no_cache_dir: bool,
    pre: bool,
    proxy: ProxySettings,
    runner: Box<dyn CommandRunner>,
    env: Vec<(String, String)>,
    output: Vec<(String, String)>,
}

impl DepsInstaller {
    /// Create an installer that runs `python3` with the system runner
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
            python: "python3".to_string(),
            app_builder: false,
            no_cache_dir: false,
            pre: false,
            proxy: ProxySettings::default(),
            runner: Box::new(SystemRunner),
            env: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_app_builder(mut self, app_builder: bool) -> Self {
        self.app_builder = app_builder;
        self
    }

    pub fn with_no_cache_dir(mut self, no_cache_dir: bool) -> Self {
        self.no_cache_dir = no_cache_dir;
        self
    }

    pub fn with_pre(mut self, pre: bool) -> Self {
        self.pre = pre;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Summary rows collected while installing
    pub fn output(&self) -> &[(String, String)] {
        &self.output
    }

    fn record(&mut self, key: &str, value: impl Into<String>) {
        self.output.push((key.to_string(), value.into()));
    }

    /// Check the interpreter against install.json `languageVersion`.
    ///
    /// App Builder provides its own interpreter, so the check is skipped there.
    pub fn validate_python_version(&mut self) -> Result<()> {
        if self.app_builder || !self.app_dir.join(INSTALL_JSON).is_file() {
            return Ok(());
        }
        let ij = InstallJson::from_dir(&self.app_dir)?;
        let Some(expected) = ij.language_version.as_deref() else {
            return Ok(());
        };

        let output = self.runner.run(
            &self.python,
            &["--version".to_string()],
            &self.app_dir,
            &[],
        )?;
        // older interpreters print the version on stderr
        let reported = if output.stdout.trim().is_empty() {
            output.stderr.trim()
        } else {
            output.stdout.trim()
        };
        let found = reported.trim_start_matches("Python").trim();

        if major_minor(found) != major_minor(expected) {
            return Err(TcexError::Deps(format!(
                "The App requires Python {} (install.json languageVersion) but {} is Python {}.",
                expected, self.python, found
            )));
        }
        self.record("Python Version", found);
        Ok(())
    }

    /// Pass proxy settings to pip through the environment
    pub fn configure_proxy(&mut self) {
        if let (Some(url), Some(server)) = (self.proxy.url(), self.proxy.server()) {
            self.env.push(("HTTP_PROXY".to_string(), url.clone()));
            self.env.push(("HTTPS_PROXY".to_string(), url));
            self.record("Using Proxy Server", server);
        }
    }

    /// Install requirements.txt into `deps/`
    pub fn install_deps(&mut self) -> Result<()> {
        let requirements = self.app_dir.join(REQUIREMENTS);
        if !requirements.is_file() {
            return Err(TcexError::Deps(
                "A requirements.txt file is required to install modules.".to_string(),
            ));
        }
        self.pip_install(REQUIREMENTS, DEPS_DIR)
    }

    /// Install tests/requirements.txt into `deps_tests/` when present
    pub fn install_deps_tests(&mut self) -> Result<()> {
        let requirements = Path::new("tests").join(REQUIREMENTS);
        if !self.app_dir.join(&requirements).is_file() {
            tracing::debug!(action = "install-deps-tests", "no tests/requirements.txt");
            return Ok(());
        }
        self.pip_install(&requirements.to_string_lossy(), DEPS_TESTS_DIR)
    }

    fn pip_install(&mut self, requirements: &str, target: &str) -> Result<()> {
        remove_dir_if_exists(&self.app_dir.join(target))?;

        let mut args: Vec<String> = [
            "-m",
            "pip",
            "install",
            "-r",
            requirements,
            "--ignore-installed",
            "--quiet",
            "--target",
            target,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        if self.no_cache_dir {
            args.push("--no-cache-dir".to_string());
        }
        if self.pre {
            args.push("--pre".to_string());
        }

        let command_line = format!("{} {}", self.python, args.join(" "));
        self.record("Deps Directory", target);
        self.record("Requirements File", requirements);
        self.record("Running", command_line.clone());

        tracing::info!(action = "pip-install", command = %command_line, "installing dependencies");
        let output = self
            .runner
            .run(&self.python, &args, &self.app_dir, &self.env)?;
        if !output.success() {
            return Err(TcexError::Deps(format!(
                "Failed to install dependencies ({}): {}",
                requirements,
                output.stderr.trim()
            )));
        }
        Ok(())
    }
}

fn major_minor(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.trim().parse().ok()?;
    Some((major, minor))
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
