//! Planner - manifest comparison and update plans
//!
//! A project tracks the template files it received in `manifest.json`. On
//! update the freshly merged template manifest is compared with the project
//! manifest and each file is sorted into a plan bucket. Applying the plan
//! copies or removes files, asking before touching anything the user edited.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::Path;
use tcex_shared::{Prompter, Result, TcexError};

/// Manifest entry for a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub last_commit: String,
    pub sha256: String,
    pub template_path: String,
}

/// POSIX project-relative path -> metadata
pub type Manifest = BTreeMap<String, FileMeta>;

// ============== Hashing ==============

const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// SHA-256 file hashing
pub struct Hasher;

impl Hasher {
    /// Lowercase hex SHA-256 of a file, or None when the file does not exist
    pub fn sha256_file(path: &Path) -> Option<String> {
        let mut file = fs::File::open(path).ok()?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; HASH_CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf).ok()?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Some(hex::encode(hasher.finalize()))
    }
}

// ============== Manifest I/O ==============

/// Load and save manifest.json files
pub struct ManifestStore;

impl ManifestStore {
    /// Load a manifest; a missing file is an empty manifest
    pub fn load(path: &Path) -> Result<Manifest> {
        if !path.exists() {
            return Ok(Manifest::new());
        }
        let content = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        if !value.is_object() {
            return Err(TcexError::Template(format!(
                "Expected object at top-level in {}",
                path.display()
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Save a manifest as sorted, 2-space indented JSON
    pub fn save(path: &Path, manifest: &Manifest) -> Result<()> {
        let mut content = serde_json::to_string_pretty(manifest)?;
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }

    /// Return (keys in template, keys only in local), both sorted
    pub fn collect_keys(template: &Manifest, local: &Manifest) -> (Vec<String>, Vec<String>) {
        let in_template = template.keys().cloned().collect();
        let removed = local
            .keys()
            .filter(|k| !template.contains_key(*k))
            .cloned()
            .collect();
        (in_template, removed)
    }
}

// ============== Plan ==============

/// A project file and where it comes from in the template
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PlanItem {
    pub key: String,
    pub template_path: String,
}

impl PlanItem {
    fn new(key: &str, template_path: &str) -> Self {
        Self {
            key: key.to_string(),
            template_path: template_path.to_string(),
        }
    }
}

/// Update plan for template files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub skip: Vec<PlanItem>,
    pub auto_update: Vec<PlanItem>,
    pub prompt_user: Vec<PlanItem>,
    pub template_new: Vec<PlanItem>,
    pub template_removed: Vec<PlanItem>,
}

impl Plan {
    /// Ordered (label, count) rows for the plan summary table
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Skip", self.skip.len().to_string()),
            ("Auto Update", self.auto_update.len().to_string()),
            ("Prompt User", self.prompt_user.len().to_string()),
            ("Template New", self.template_new.len().to_string()),
            ("Template Removed", self.template_removed.len().to_string()),
        ]
    }
}

// ============== File operations ==============

/// Filesystem mutations that keep file modes
#[derive(Debug, Clone, Default)]
pub struct SafeFileOps;

impl SafeFileOps {
    /// Copy `template_root/template_path` to `dest`.
    ///
    /// An existing destination keeps its permissions; a new one gets the
    /// source's.
    pub fn copy_from_template(
        &self,
        template_root: &Path,
        template_path: &str,
        dest: &Path,
    ) -> Result<()> {
        let src = template_root.join(template_path);
        if !src.is_file() {
            return Err(TcexError::Template(format!(
                "Template file does not exist: {}",
                src.display()
            )));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        if dest.exists() {
            let permissions = fs::metadata(dest)?.permissions();
            fs::write(dest, fs::read(&src)?)?;
            fs::set_permissions(dest, permissions)?;
        } else {
            fs::copy(&src, dest)?;
        }
        Ok(())
    }

    /// Remove a file if it exists
    pub fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============== Planner ==============

/// Builds and applies update plans
#[derive(Debug, Clone, Default)]
pub struct Planner {
    file_ops: SafeFileOps,
}

impl Planner {
    /// Create a new Planner
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the manifest in `template_dir` with the one in `project_dir`
    pub fn build(&self, template_dir: &Path, project_dir: &Path, force: bool) -> Result<Plan> {
        let template_meta = ManifestStore::load(&template_dir.join(crate::MANIFEST_JSON))?;
        let local_meta = ManifestStore::load(&project_dir.join(crate::MANIFEST_JSON))?;
        let (in_template, removed) = ManifestStore::collect_keys(&template_meta, &local_meta);

        let mut plan = Plan::default();

        for key in &in_template {
            let template_info = &template_meta[key];
            let item = PlanItem::new(key, &template_info.template_path);
            let project_path = project_dir.join(key);

            if force {
                plan.auto_update.push(item);
                continue;
            }

            let Some(local_info) = local_meta.get(key) else {
                plan.template_new.push(item.clone());
                if project_path.exists() {
                    plan.prompt_user.push(item);
                } else {
                    plan.auto_update.push(item);
                }
                continue;
            };

            if template_info.last_commit == local_info.last_commit {
                plan.skip.push(item);
                continue;
            }

            match Hasher::sha256_file(&project_path) {
                None => plan.skip.push(item),
                Some(hash) if hash == template_info.sha256 => plan.skip.push(item),
                Some(_) => plan.prompt_user.push(item),
            }
        }

        for key in &removed {
            let local_info = &local_meta[key];
            let item = PlanItem::new(key, &local_info.template_path);
            plan.template_removed.push(item.clone());

            match Hasher::sha256_file(&project_dir.join(key)) {
                None => plan.auto_update.push(item),
                Some(hash) if hash == local_info.sha256 => plan.auto_update.push(item),
                Some(_) => plan.prompt_user.push(item),
            }
        }

        tracing::debug!(
            action = "build-plan",
            skip = plan.skip.len(),
            auto_update = plan.auto_update.len(),
            prompt_user = plan.prompt_user.len(),
            "plan built"
        );
        Ok(plan)
    }

    /// Apply a plan to `project_root`, copying from `template_root`
    pub fn apply(
        &self,
        plan: &Plan,
        template_root: &Path,
        project_root: &Path,
        force: bool,
        prompter: &dyn Prompter,
    ) -> Result<()> {
        let removed: BTreeSet<&str> = plan
            .template_removed
            .iter()
            .map(|i| i.key.as_str())
            .collect();
        let auto: BTreeSet<&PlanItem> = plan.auto_update.iter().collect();
        let prompt: BTreeSet<&PlanItem> = plan.prompt_user.iter().collect();

        for item in auto {
            self.apply_item(item, &removed, template_root, project_root)?;
        }

        for item in prompt {
            if !force {
                let question = if removed.contains(item.key.as_str()) {
                    format!("Remove modified file '{}'?", item.key)
                } else {
                    format!("Overwrite modified file '{}' from template?", item.key)
                };
                let answer = prompter.ask(&question, &["y", "N"], "N")?;
                if !answer.trim().eq_ignore_ascii_case("y") {
                    tracing::info!(action = "apply-plan", key = %item.key, "kept local file");
                    continue;
                }
            }
            self.apply_item(item, &removed, template_root, project_root)?;
        }
        Ok(())
    }

    fn apply_item(
        &self,
        item: &PlanItem,
        removed: &BTreeSet<&str>,
        template_root: &Path,
        project_root: &Path,
    ) -> Result<()> {
        let dest = project_root.join(&item.key);
        if removed.contains(item.key.as_str()) {
            tracing::debug!(action = "apply-plan", key = %item.key, "removing file");
            self.file_ops.remove_file(&dest)
        } else {
            tracing::debug!(action = "apply-plan", key = %item.key, "copying file");
            self.file_ops
                .copy_from_template(template_root, &item.template_path, &dest)
        }
    }
}
