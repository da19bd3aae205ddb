//! Packager - build the `.tcx` archive for an App
//!
//! The folder name inside the archive (`{app_name}_{version}`) is the key the
//! platform uses to match upgrades, so it has to stay stable across releases.

use crate::validate::{ValidationReport, Validator};
use glob::Pattern;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tcex_shared::{InstallJson, Result, TcexError, TcexJson};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// Excluded at any depth
const EXCLUDES_GLOB: [&str; 5] = ["__pycache__", ".pytest_cache", "*.iml", "*.pyc", "*.zip"];

/// Excluded in the App root only
const EXCLUDES_BASE: [&str; 37] = [
    ".cache",
    ".c9",
    ".coverage",
    ".coveragerc",
    ".cspell",
    ".env",
    ".git",
    ".gitignore",
    ".gitlab-ci.yml",
    ".gitmodules",
    ".history",
    ".idea",
    ".pre-commit-config.yaml",
    ".prettierrc.toml",
    ".python-version",
    ".template_manifest.json",
    ".vscode",
    "angular.json",
    "app.yaml",
    "app_inputs*.json",
    "artifacts",
    "assets",
    "cspell.json",
    "deps_tests",
    "local-*",
    "log",
    "JIRA.html",
    "JIRA.md",
    "karma.conf.js",
    "package-lock.json",
    "package.json",
    "pyproject.toml",
    "README.html",
    "run_local.py",
    "target",
    "test-reports",
    "tests",
];

/// Name of the intermediate copy of the App under `build/`
const TEMPLATE_DIR: &str = "template";

/// Package metadata for display and App Builder output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppMetadata {
    pub name: String,
    pub package_name: String,
    pub template_directory: String,
    pub version: String,
    pub features: String,
}

/// Result of a package run
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    #[serde(rename = "package_data")]
    pub app_metadata: AppMetadata,
    #[serde(rename = "validation_data")]
    pub validation: Option<ValidationReport>,
}

/// App packager
#[derive(Debug, Clone)]
pub struct Packager {
    app_dir: PathBuf,
    output_dir: PathBuf,
    excludes: Vec<String>,
    ignore_validation: bool,
}

impl Packager {
    /// Create a packager for the App in `app_dir`, writing to `target`
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
            output_dir: PathBuf::from("target"),
            excludes: Vec::new(),
            ignore_validation: false,
        }
    }

    /// Set the output directory; relative paths are under the App directory
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Add exclude patterns for the App root
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Skip validation before packaging
    pub fn ignore_validation(mut self, ignore: bool) -> Self {
        self.ignore_validation = ignore;
        self
    }

    fn output_path(&self) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            self.app_dir.join(&self.output_dir)
        }
    }

    /// Validate, copy and zip the App
    pub fn package(&self) -> Result<PackageReport> {
        let validation = if self.ignore_validation {
            None
        } else {
            let report = Validator::validate(&self.app_dir)?;
            if !report.passed() {
                return Err(TcexError::Validation(report.errors.join("; ")));
            }
            Some(report)
        };

        let ij = InstallJson::from_dir(&self.app_dir)?;
        let tj = TcexJson::from_dir(&self.app_dir)?;
        if tj.package.app_name.trim().is_empty() {
            return Err(TcexError::Package(
                "tcex.json package.app_name must be set to build a package.".to_string(),
            ));
        }

        let output = self.output_path();
        let build = output.join("build");
        fs::create_dir_all(&build)?;

        // copy the App once, the copy is the source for the versioned folder
        let template = build.join(TEMPLATE_DIR);
        remove_dir_if_exists(&template)?;
        let base = self.base_patterns(&tj)?;
        let glob = compile(EXCLUDES_GLOB.iter().copied())?;
        copy_filtered(&self.app_dir, &template, &glob, Some(base.as_slice()))?;

        let app_version = tj
            .package
            .app_version
            .clone()
            .unwrap_or_else(|| ij.package_version());
        let folder = format!("{}_{}", tj.package.app_name, app_version);

        let app_build = build.join(&folder);
        remove_dir_if_exists(&app_build)?;
        copy_filtered(&template, &app_build, &[], None)?;

        // set the extension directly, versions like "v1.0" carry a dot
        let tcx = output.join(format!("{}.tcx", folder));
        zip_dir(&app_build, &folder, &tcx)?;
        fs::remove_dir_all(&app_build)?;

        tracing::info!(action = "package", package = %tcx.display(), "App packaged");

        Ok(PackageReport {
            app_metadata: AppMetadata {
                name: tj.package.app_name.clone(),
                package_name: tcx.display().to_string(),
                template_directory: TEMPLATE_DIR.to_string(),
                version: ij.program_version.clone().unwrap_or_default(),
                features: ij.features.join(", "),
            },
            validation,
        })
    }

    /// App root entry holding the output dir, when the output is inside the App
    fn output_root_entry(&self) -> Option<String> {
        let output = self.output_path();
        let relative = output.strip_prefix(&self.app_dir).ok()?;
        relative.components().find_map(|c| match c {
            Component::Normal(name) => Some(Pattern::escape(&name.to_string_lossy())),
            _ => None,
        })
    }

    /// Root-level patterns: defaults, the output dir, CLI and tcex.json excludes
    fn base_patterns(&self, tj: &TcexJson) -> Result<Vec<Pattern>> {
        let output_name = self.output_root_entry();
        let patterns = EXCLUDES_BASE
            .iter()
            .map(|p| p.to_string())
            .chain(output_name)
            .chain(self.excludes.iter().cloned())
            .chain(tj.package.excludes.iter().cloned())
            .chain(EXCLUDES_GLOB.iter().map(|p| p.to_string()))
            .collect::<Vec<_>>();
        compile(patterns.iter().map(String::as_str))
    }
}

fn compile<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<Vec<Pattern>> {
    patterns
        .map(|p| {
            Pattern::new(p)
                .map_err(|e| TcexError::Package(format!("Invalid exclude pattern '{}': {}", p, e)))
        })
        .collect()
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Copy `src` to `dest`, skipping names that match `glob` at any depth or
/// `root` in `src` itself
fn copy_filtered(src: &Path, dest: &Path, glob: &[Pattern], root: Option<&[Pattern]>) -> Result<()> {
    fs::create_dir_all(dest)?;
    let patterns = root.unwrap_or(glob);

    let mut entries = fs::read_dir(src)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if patterns.iter().any(|p| p.matches(&name)) {
            tracing::trace!(action = "package", excluded = %name, "skipping");
            continue;
        }
        let target = dest.join(&name);
        if entry.file_type()?.is_dir() {
            copy_filtered(&entry.path(), &target, glob, None)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Zip `dir` into `zip_path` with every entry under `prefix/`
fn zip_dir(dir: &Path, prefix: &str, zip_path: &Path) -> Result<()> {
    let archive_err = |e: zip::result::ZipError| TcexError::Archive(e.to_string());
    let mut writer = zip::ZipWriter::new(fs::File::create(zip_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer
        .add_directory(format!("{}/", prefix), options)
        .map_err(archive_err)?;

    let mut pending = vec![(dir.to_path_buf(), prefix.to_string())];
    while let Some((current, name)) = pending.pop() {
        let mut entries = fs::read_dir(&current)?.collect::<io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let entry_name = format!("{}/{}", name, entry.file_name().to_string_lossy());
            if entry.file_type()?.is_dir() {
                writer
                    .add_directory(format!("{}/", entry_name), options)
                    .map_err(archive_err)?;
                pending.push((entry.path(), entry_name));
                continue;
            }

            let file_options = file_mode(&entry.path())
                .map(|mode| options.unix_permissions(mode))
                .unwrap_or(options);
            writer
                .start_file(entry_name, file_options)
                .map_err(archive_err)?;
            writer.write_all(&fs::read(entry.path())?)?;
        }
    }

    writer.finish().map_err(archive_err)?;
    Ok(())
}

#[cfg(unix)]
fn file_mode(path: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).ok().map(|m| m.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture_app() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "install.json",
            r#"{"programVersion": "1.2.0", "runtimeLevel": "Organization",
                "features": ["fileParams", "secureParams"], "params": []}"#,
        );
        write(
            root,
            "tcex.json",
            r#"{"package": {"app_name": "TC_-_Sample", "excludes": ["docs"]}}"#,
        );
        write(root, "app.py", "app\n");
        write(root, "run.py", "run\n");
        write(root, "requirements.txt", "tcex\n");
        write(root, "deps/lib/module.py", "lib\n");
        write(root, "deps/lib/__pycache__/module.pyc", "x");
        write(root, "src/helper.pyc", "x");
        write(root, "app_inputs.json", "{}");
        write(root, "tests/test_app.py", "test\n");
        write(root, "docs/index.md", "docs\n");
        write(root, ".git/HEAD", "ref\n");
        write(root, "pyproject.toml", "[tool]\n");
        write(root, "local-notes.txt", "x");
        write(root, "old.zip", "x");
        dir
    }

    fn zip_names(path: &Path) -> BTreeSet<String> {
        let archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn test_package_contents_and_excludes() {
        let app = fixture_app();
        let report = Packager::new(app.path())
            .with_excludes(vec!["requirements.txt".to_string()])
            .package()
            .unwrap();

        let tcx = app.path().join("target/TC_-_Sample_v1.tcx");
        assert!(tcx.is_file());
        assert_eq!(report.app_metadata.package_name, tcx.display().to_string());
        assert_eq!(report.app_metadata.version, "1.2.0");
        assert_eq!(report.app_metadata.features, "fileParams, secureParams");
        assert!(report.validation.unwrap().passed());

        let names = zip_names(&tcx);
        assert!(names.contains("TC_-_Sample_v1/install.json"));
        assert!(names.contains("TC_-_Sample_v1/app.py"));
        assert!(names.contains("TC_-_Sample_v1/deps/lib/module.py"));
        for excluded in [
            "requirements.txt",
            "app_inputs.json",
            "tests/test_app.py",
            "docs/index.md",
            ".git/HEAD",
            "pyproject.toml",
            "local-notes.txt",
            "old.zip",
            "src/helper.pyc",
            "deps/lib/__pycache__/module.pyc",
        ] {
            let name = format!("TC_-_Sample_v1/{}", excluded);
            assert!(!names.contains(&name), "{} should be excluded", name);
        }
        assert!(names.iter().all(|n| !n.contains("target/")));

        // the versioned build folder is removed, the template copy stays
        assert!(!app.path().join("target/build/TC_-_Sample_v1").exists());
        assert!(app.path().join("target/build/template/app.py").is_file());
    }

    #[test]
    fn test_app_version_override_keeps_dots() {
        let app = fixture_app();
        write(
            app.path(),
            "tcex.json",
            r#"{"package": {"app_name": "TC_-_Sample", "app_version": "v2.0"}}"#,
        );
        Packager::new(app.path()).package().unwrap();
        let tcx = app.path().join("target/TC_-_Sample_v2.0.tcx");
        assert!(zip_names(&tcx).contains("TC_-_Sample_v2.0/install.json"));
    }

    #[test]
    fn test_validation_failure_stops_packaging() {
        let app = fixture_app();
        write(app.path(), "install.json", "{ broken");
        let err = Packager::new(app.path()).package().unwrap_err();
        assert!(matches!(err, TcexError::Validation(_)));
        assert!(!app.path().join("target").exists());
    }

    #[test]
    fn test_ignore_validation_and_custom_output() {
        let app = fixture_app();
        write(app.path(), "app_inputs.json", "{ not json");
        let out = TempDir::new().unwrap();
        let report = Packager::new(app.path())
            .with_output_dir(out.path())
            .ignore_validation(true)
            .package()
            .unwrap();
        assert!(report.validation.is_none());
        assert!(out.path().join("TC_-_Sample_v1.tcx").is_file());
    }

    #[test]
    fn test_nested_output_dir_is_not_copied() {
        let app = fixture_app();
        Packager::new(app.path())
            .with_output_dir("out/pkg")
            .package()
            .unwrap();

        let tcx = app.path().join("out/pkg/TC_-_Sample_v1.tcx");
        assert!(zip_names(&tcx).iter().all(|n| !n.contains("/out/")));
        assert!(!app.path().join("out/pkg/build/template/out").exists());
        assert!(app.path().join("out/pkg/build/template/app.py").is_file());
    }

    #[test]
    fn test_report_serializes_for_app_builder() {
        let app = fixture_app();
        let report = Packager::new(app.path()).package().unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["package_data"]["name"], "TC_-_Sample");
        assert!(value["validation_data"]["errors"].as_array().unwrap().is_empty());
    }
}
