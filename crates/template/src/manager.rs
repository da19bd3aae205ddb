//! TemplateManager - list, merge and update project templates
//!
//! Templates inherit through `template_parents` in template.yaml. Files are
//! copied parent first so a child overrides what its ancestors ship:
//! `_app_common` -> `basic` -> `egress`.

use crate::cache::TemplateCache;
use crate::config::{TemplateConfig, TemplateType};
use crate::planner::{FileMeta, Hasher, Manifest, ManifestStore, Plan, Planner};
use crate::source::TemplateSource;
use crate::{APP_COMMON, LEGACY_MANIFEST_JSON, MANIFEST_JSON};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tcex_shared::{Prompter, Result, TcexError, TcexJson, TemplateNotFoundError, TCEX_JSON};
use tempfile::TempDir;

/// Top-level names that never leave the template repository
const SKIP_NAMES: [&str; 3] = ["template.yaml", ".gitignore", "tcex.json"];

/// Only copied for App Builder projects
const APP_BUILDER_CONFIG: &str = ".appbuilderconfig";

/// Merged template plus the plan to bring a project up to date
pub struct PreparedUpdate {
    pub cache_dir: PathBuf,
    pub template_name: String,
    pub template_type: TemplateType,
    pub merged: TempDir,
    pub plan: Plan,
}

/// Template manager
pub struct TemplateManager {
    cache: TemplateCache,
    source: Box<dyn TemplateSource>,
    planner: Planner,
    errors: Cell<bool>,
    fresh: RefCell<BTreeSet<String>>,
}

impl TemplateManager {
    /// Create a new TemplateManager
    pub fn new(cache: TemplateCache, source: Box<dyn TemplateSource>) -> Self {
        Self {
            cache,
            source,
            planner: Planner::new(),
            errors: Cell::new(false),
            fresh: RefCell::new(BTreeSet::new()),
        }
    }

    /// Whether any template.yaml failed to parse
    pub fn has_errors(&self) -> bool {
        self.errors.get()
    }

    /// The template cache
    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Ensure the branch cache is fresh; checked once per manager
    pub fn ensure_cache(&self, branch: &str) -> Result<PathBuf> {
        if self.fresh.borrow().contains(branch) {
            return Ok(self.cache.dir(branch));
        }
        let dir = self.cache.ensure(branch, self.source.as_ref())?;
        self.fresh.borrow_mut().insert(branch.to_string());
        Ok(dir)
    }

    /// Remove the branch cache
    pub fn clear_cache(&self, branch: &str) -> Result<()> {
        self.fresh.borrow_mut().remove(branch);
        self.cache.clear(branch)
    }

    // ============== Template configs ==============

    /// Read template.yaml for a template in the cache
    pub fn read_config(
        &self,
        cache_dir: &Path,
        template_type: &str,
        name: &str,
    ) -> Option<TemplateConfig> {
        let path = template_dir(cache_dir, template_type, name).join("template.yaml");
        if !path.is_file() {
            tracing::warn!(action = "read-template-config", path = %path.display(), "file not found");
            return None;
        }

        let parsed = fs::read_to_string(&path)
            .map_err(TcexError::from)
            .and_then(|content| TemplateConfig::from_yaml(&content, name, template_type));
        match parsed {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::error!(action = "read-template-config", path = %path.display(), error = %e, "could not parse template config");
                self.errors.set(true);
                None
            }
        }
    }

    /// List templates of every type, or of `type_filter` only
    pub fn list(
        &self,
        branch: &str,
        type_filter: Option<&str>,
    ) -> Result<BTreeMap<TemplateType, Vec<TemplateConfig>>> {
        let types: Vec<TemplateType> = match type_filter {
            Some(filter) => vec![filter
                .parse::<TemplateType>()
                .map_err(|_| TcexError::Other(format!("Invalid Types: {}", filter)))?],
            None => TemplateType::ALL.to_vec(),
        };
        let cache_dir = self.ensure_cache(branch)?;

        let mut listing = BTreeMap::new();
        for template_type in types {
            for name in sorted_subdirs(&cache_dir.join(template_type.as_str()))? {
                if let Some(config) = self.read_config(&cache_dir, template_type.as_str(), &name) {
                    listing
                        .entry(template_type)
                        .or_insert_with(Vec::new)
                        .push(config);
                }
            }
        }
        Ok(listing)
    }

    /// Resolve the parent chain of a template, ancestors first
    pub fn resolve_parents(&self, cache_dir: &Path, name: &str, template_type: &str) -> Vec<String> {
        let mut resolved = Vec::new();
        let mut seen = BTreeSet::new();
        self.resolve_into(cache_dir, name, template_type, &mut seen, &mut resolved);
        resolved
    }

    fn resolve_into(
        &self,
        cache_dir: &Path,
        name: &str,
        template_type: &str,
        seen: &mut BTreeSet<String>,
        resolved: &mut Vec<String>,
    ) {
        if !seen.insert(name.to_string()) {
            return;
        }
        if let Some(config) = self.read_config(cache_dir, template_type, name) {
            for parent in &config.template_parents {
                self.resolve_into(cache_dir, parent, template_type, seen, resolved);
            }
        }
        resolved.push(name.to_string());
    }

    // ============== Merge ==============

    /// Merge a template and its parents into a temp directory with a manifest
    pub fn build_merged(
        &self,
        cache_dir: &Path,
        name: &str,
        template_type: &str,
        app_builder: bool,
    ) -> Result<TempDir> {
        let parents = self.resolve_parents(cache_dir, name, template_type);
        let merged = tempfile::Builder::new().prefix("tcex_merged_").tempdir()?;
        let mut manifest = Manifest::new();

        for parent in &parents {
            let src_dir = template_dir(cache_dir, template_type, parent);
            if !src_dir.is_dir() {
                tracing::warn!(action = "build-merged-template", missing_dir = %src_dir.display(), parent = %parent, "parent directory missing");
                continue;
            }

            for src_file in walk_files(&src_dir)? {
                let Ok(rel) = src_file.strip_prefix(&src_dir) else {
                    continue;
                };
                let mut parts: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                let Some(first) = parts.first() else {
                    continue;
                };
                if SKIP_NAMES.contains(&first.as_str())
                    || (parts.len() == 1 && first.as_str() == MANIFEST_JSON)
                    || (first.as_str() == APP_BUILDER_CONFIG && !app_builder)
                {
                    continue;
                }
                if let Some(last) = parts.last_mut() {
                    if last.as_str() == "gitignore" {
                        *last = ".gitignore".to_string();
                    }
                }

                let key = parts.join("/");
                let dest = merged.path().join(&key);
                if let Some(parent_dir) = dest.parent() {
                    fs::create_dir_all(parent_dir)?;
                }
                fs::copy(&src_file, &dest)?;

                let sha = Hasher::sha256_file(&dest).unwrap_or_default();
                manifest.insert(
                    key.clone(),
                    FileMeta {
                        last_commit: sha.clone(),
                        sha256: sha,
                        template_path: key,
                    },
                );
            }
        }

        ManifestStore::save(&merged.path().join(MANIFEST_JSON), &manifest)?;
        tracing::debug!(action = "build-merged-template", files = manifest.len(), parents = ?parents, "merged template built");
        Ok(merged)
    }

    /// Convert a legacy `.template_manifest.json` project to `manifest.json`.
    ///
    /// Returns true when a migration happened.
    pub fn migrate_legacy_manifest(&self, merged: &Path, project: &Path) -> Result<bool> {
        let legacy = project.join(LEGACY_MANIFEST_JSON);
        let target = project.join(MANIFEST_JSON);
        if target.exists() || !legacy.exists() {
            return Ok(false);
        }

        let template_meta = ManifestStore::load(&merged.join(MANIFEST_JSON))?;
        let mut local = Manifest::new();
        for (key, entry) in template_meta {
            let Some(local_hash) = Hasher::sha256_file(&project.join(&key)) else {
                continue;
            };
            if local_hash == entry.sha256 {
                local.insert(key, entry);
            } else {
                local.insert(
                    key,
                    FileMeta {
                        last_commit: "legacy_migrated".to_string(),
                        sha256: local_hash,
                        template_path: entry.template_path,
                    },
                );
            }
        }

        ManifestStore::save(&target, &local)?;
        fs::remove_file(&legacy)?;
        tracing::info!(action = "migrate-legacy-manifest", migrated_files = local.len(), "legacy manifest migrated");
        Ok(true)
    }

    // ============== Update ==============

    /// Validate the template, merge it and build the update plan
    pub fn prepare_update(
        &self,
        project: &Path,
        branch: &str,
        name: &str,
        template_type: &str,
        force: bool,
        app_builder: bool,
    ) -> Result<PreparedUpdate> {
        let parsed_type: TemplateType = template_type.parse()?;
        let cache_dir = self.ensure_cache(branch)?;

        if !template_dir(&cache_dir, template_type, name).is_dir() {
            return Err(TemplateNotFoundError {
                template_name: name.to_string(),
                template_type: template_type.to_string(),
                available: sorted_subdirs(&cache_dir.join(template_type))?,
            }
            .into());
        }

        let merged = self.build_merged(&cache_dir, name, template_type, app_builder)?;
        self.migrate_legacy_manifest(merged.path(), project)?;
        let plan = self.planner.build(merged.path(), project, force)?;

        Ok(PreparedUpdate {
            cache_dir,
            template_name: name.to_string(),
            template_type: parsed_type,
            merged,
            plan,
        })
    }

    /// Apply a prepared update to the project
    pub fn apply_update(
        &self,
        prepared: &PreparedUpdate,
        project: &Path,
        force: bool,
        prompter: &dyn Prompter,
    ) -> Result<()> {
        self.planner.apply(
            &prepared.plan,
            prepared.merged.path(),
            project,
            force,
            prompter,
        )?;

        let merged_manifest = prepared.merged.path().join(MANIFEST_JSON);
        if merged_manifest.is_file() {
            fs::copy(&merged_manifest, project.join(MANIFEST_JSON))?;
        }

        self.ensure_tcex_json(
            &prepared.cache_dir,
            project,
            &prepared.template_name,
            prepared.template_type.as_str(),
        )
    }

    /// Update (or initialize) a project with the latest template files
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &self,
        project: &Path,
        branch: &str,
        name: &str,
        template_type: &str,
        force: bool,
        app_builder: bool,
        prompter: &dyn Prompter,
    ) -> Result<Plan> {
        let prepared = self.prepare_update(project, branch, name, template_type, force, app_builder)?;
        self.apply_update(&prepared, project, force, prompter)?;
        Ok(prepared.plan)
    }

    /// Copy the leaf template's tcex.json, or set the template fields in the existing one
    pub fn ensure_tcex_json(
        &self,
        cache_dir: &Path,
        project: &Path,
        name: &str,
        template_type: &str,
    ) -> Result<()> {
        let project_tcex = project.join(TCEX_JSON);
        if !project_tcex.is_file() {
            let src = template_dir(cache_dir, template_type, name).join(TCEX_JSON);
            if src.is_file() {
                fs::copy(&src, &project_tcex)?;
            }
            return Ok(());
        }

        let mut tj = TcexJson::from_file(&project_tcex)?;
        tj.template_name = Some(name.to_string());
        tj.template_type = Some(template_type.to_string());
        tj.write(&project_tcex)
    }
}

/// Default App name for a new project: `{PREFIX}_{directory name}`
pub fn default_app_name(template_type: TemplateType, project: &Path) -> String {
    let dir_name = project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sanitized: String = dir_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match template_type.app_prefix() {
        Some(prefix) => format!("{}_{}", prefix.to_uppercase(), sanitized),
        None => sanitized,
    }
}

/// Directory of a template in the cache; `_app_common` lives at the root
fn template_dir(cache_dir: &Path, template_type: &str, name: &str) -> PathBuf {
    if name == APP_COMMON {
        cache_dir.join(APP_COMMON)
    } else {
        cache_dir.join(template_type).join(name)
    }
}

/// Sorted names of the subdirectories of `dir`; empty when `dir` is missing
fn sorted_subdirs(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// All files below `dir`, sorted
fn walk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcex_shared::{DefaultPrompter, ScriptedPrompter};

    /// Source that never reports a newer remote, so the seeded cache is used
    struct OfflineSource;

    impl TemplateSource for OfflineSource {
        fn latest_commit_date(&self, _branch: &str) -> Option<String> {
            None
        }

        fn download_zipball(&self, _branch: &str, _dest: &Path) -> Result<()> {
            Err(TcexError::Http("offline".to_string()))
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
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

    /// Seed `templates-v2` with `_app_common`, playbook/basic and organization/{basic,egress}
    fn seed_cache(root: &Path) -> PathBuf {
        let dir = root.join("templates-v2");
        write(&dir, "_app_common/template.yaml", &template_yaml(&[]));
        write(&dir, "_app_common/README.md", "common readme\n");
        write(&dir, "_app_common/requirements.txt", "tcex\n");
        write(&dir, "_app_common/gitignore", "*.pyc\n");
        write(&dir, "_app_common/.gitignore", "ignored\n");

        write(&dir, "playbook/basic/template.yaml", &template_yaml(&["_app_common"]));
        write(&dir, "playbook/basic/app.py", "class App: pass\n");
        write(&dir, "playbook/basic/run.py", "run()\n");
        write(&dir, "playbook/basic/README.md", "playbook readme\n");
        write(&dir, "playbook/basic/.appbuilderconfig", "{}\n");
        write(&dir, "playbook/basic/manifest.json", "{}\n");
        write(
            &dir,
            "playbook/basic/tcex.json",
            r#"{"package": {"app_name": "", "excludes": []}, "template_name": "basic", "template_type": "playbook"}"#,
        );

        write(&dir, "organization/basic/template.yaml", &template_yaml(&["_app_common"]));
        write(&dir, "organization/basic/job_app.py", "basic\n");
        write(&dir, "organization/egress/template.yaml", &template_yaml(&["_app_common", "basic"]));
        write(&dir, "organization/egress/job_app.py", "egress\n");
        write(&dir, "organization/egress/src/egress.py", "egress\n");
        write(&dir, "organization/broken/template.yaml", "contributor: [unterminated\n");
        dir
    }

    fn manager(root: &Path) -> TemplateManager {
        TemplateManager::new(TemplateCache::new(root), Box::new(OfflineSource))
    }

    // ============== Configs / listing ==============

    #[test]
    fn test_read_config_app_common_at_root() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = seed_cache(root.path());
        let m = manager(root.path());

        let config = m.read_config(&cache_dir, "playbook", "_app_common").unwrap();
        assert_eq!(config.name, "_app_common");
        assert!(m.read_config(&cache_dir, "playbook", "missing").is_none());
        assert!(!m.has_errors());
    }

    #[test]
    fn test_read_config_parse_error_sets_errors() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = seed_cache(root.path());
        let m = manager(root.path());

        assert!(m.read_config(&cache_dir, "organization", "broken").is_none());
        assert!(m.has_errors());
    }

    #[test]
    fn test_list_by_type() {
        let root = tempfile::tempdir().unwrap();
        seed_cache(root.path());
        let m = manager(root.path());

        let listing = m.list("v2", None).unwrap();
        let org: Vec<&str> = listing[&TemplateType::Organization]
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(org, vec!["basic", "egress"]);
        assert_eq!(listing[&TemplateType::Playbook].len(), 1);
        assert!(!listing.contains_key(&TemplateType::Tie));

        let only = m.list("v2", Some("playbook")).unwrap();
        assert_eq!(only.keys().collect::<Vec<_>>(), vec![&TemplateType::Playbook]);
    }

    #[test]
    fn test_list_invalid_type() {
        let root = tempfile::tempdir().unwrap();
        seed_cache(root.path());
        let err = manager(root.path()).list("v2", Some("bogus")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid Types: bogus");
    }

    // ============== Parents / merge ==============

    #[test]
    fn test_resolve_parents_three_levels() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = seed_cache(root.path());
        let parents = manager(root.path()).resolve_parents(&cache_dir, "egress", "organization");
        assert_eq!(parents, vec!["_app_common", "basic", "egress"]);
    }

    #[test]
    fn test_resolve_parents_cycle() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = seed_cache(root.path());
        write(&cache_dir, "tie/a/template.yaml", &template_yaml(&["b"]));
        write(&cache_dir, "tie/b/template.yaml", &template_yaml(&["a"]));
        let parents = manager(root.path()).resolve_parents(&cache_dir, "a", "tie");
        assert_eq!(parents, vec!["b", "a"]);
    }

    #[test]
    fn test_build_merged_filters_and_renames() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = seed_cache(root.path());
        let merged = manager(root.path())
            .build_merged(&cache_dir, "basic", "playbook", false)
            .unwrap();

        let manifest = ManifestStore::load(&merged.path().join(MANIFEST_JSON)).unwrap();
        let keys: Vec<&str> = manifest.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![".gitignore", "README.md", "app.py", "requirements.txt", "run.py"]
        );

        // child overrides parent and the manifest hash follows the final content
        assert_eq!(
            fs::read_to_string(merged.path().join("README.md")).unwrap(),
            "playbook readme\n"
        );
        assert_eq!(
            fs::read_to_string(merged.path().join(".gitignore")).unwrap(),
            "*.pyc\n"
        );
        for (key, meta) in &manifest {
            let sha = Hasher::sha256_file(&merged.path().join(key)).unwrap();
            assert_eq!(meta.sha256, sha);
            assert_eq!(meta.last_commit, sha);
            assert_eq!(&meta.template_path, key);
        }
        assert!(!merged.path().join("tcex.json").exists());
        assert!(!merged.path().join("template.yaml").exists());
    }

    #[test]
    fn test_build_merged_app_builder_keeps_config() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = seed_cache(root.path());
        let merged = manager(root.path())
            .build_merged(&cache_dir, "basic", "playbook", true)
            .unwrap();
        assert!(merged.path().join(".appbuilderconfig").is_file());
    }

    #[test]
    fn test_build_merged_nested_files() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = seed_cache(root.path());
        let merged = manager(root.path())
            .build_merged(&cache_dir, "egress", "organization", false)
            .unwrap();
        let manifest = ManifestStore::load(&merged.path().join(MANIFEST_JSON)).unwrap();
        assert!(manifest.contains_key("src/egress.py"));
        assert_eq!(
            fs::read_to_string(merged.path().join("job_app.py")).unwrap(),
            "egress\n"
        );
    }

    // ============== Update ==============

    #[test]
    fn test_update_unknown_template_lists_available() {
        let root = tempfile::tempdir().unwrap();
        seed_cache(root.path());
        let project = tempfile::tempdir().unwrap();

        let err = manager(root.path())
            .update(project.path(), "v2", "nope", "organization", false, false, &DefaultPrompter)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Template 'nope' not found for type 'organization'. Available templates: basic, broken, egress"
        );
    }

    #[test]
    fn test_update_invalid_type() {
        let root = tempfile::tempdir().unwrap();
        seed_cache(root.path());
        let project = tempfile::tempdir().unwrap();
        let err = manager(root.path())
            .update(project.path(), "v2", "basic", "bogus", false, false, &DefaultPrompter)
            .unwrap_err();
        assert!(matches!(err, TcexError::InvalidTemplateType(_)));
    }

    #[test]
    fn test_init_then_update_is_stable() {
        let root = tempfile::tempdir().unwrap();
        seed_cache(root.path());
        let project = tempfile::tempdir().unwrap();
        let m = manager(root.path());

        m.update(project.path(), "v2", "basic", "playbook", true, false, &DefaultPrompter)
            .unwrap();
        assert!(project.path().join("app.py").is_file());
        assert!(project.path().join(MANIFEST_JSON).is_file());
        let tj = TcexJson::from_dir(project.path()).unwrap();
        assert_eq!(tj.template_name.as_deref(), Some("basic"));

        let before = fs::read(project.path().join(MANIFEST_JSON)).unwrap();
        let plan = m
            .update(project.path(), "v2", "basic", "playbook", false, false, &DefaultPrompter)
            .unwrap();
        assert_eq!(plan.skip.len(), 5);
        assert!(plan.prompt_user.is_empty());
        assert_eq!(fs::read(project.path().join(MANIFEST_JSON)).unwrap(), before);
    }

    #[test]
    fn test_update_prompts_for_modified_file_when_template_changes() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = seed_cache(root.path());
        let project = tempfile::tempdir().unwrap();
        let m = manager(root.path());

        m.update(project.path(), "v2", "basic", "playbook", true, false, &DefaultPrompter)
            .unwrap();
        fs::write(project.path().join("app.py"), "local edit\n").unwrap();

        // unchanged template: local edit is left alone without asking
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        m.update(project.path(), "v2", "basic", "playbook", false, false, &prompter)
            .unwrap();
        assert!(prompter.asked().is_empty());

        // template changes the file: "N" keeps it, "y" overwrites it
        write(&cache_dir, "playbook/basic/app.py", "class App: v2\n");
        m.update(project.path(), "v2", "basic", "playbook", false, false, &ScriptedPrompter::new(["N"]))
            .unwrap();
        assert_eq!(
            fs::read_to_string(project.path().join("app.py")).unwrap(),
            "local edit\n"
        );

        // the project manifest now tracks that template version, so the next
        // template change asks again
        write(&cache_dir, "playbook/basic/app.py", "class App: v3\n");
        let prompter = ScriptedPrompter::new(["y"]);
        m.update(project.path(), "v2", "basic", "playbook", false, false, &prompter)
            .unwrap();
        assert_eq!(
            prompter.asked(),
            vec!["Overwrite modified file 'app.py' from template?"]
        );
        assert_eq!(
            fs::read_to_string(project.path().join("app.py")).unwrap(),
            "class App: v3\n"
        );
    }

    #[test]
    fn test_update_sets_template_fields_in_existing_tcex_json() {
        let root = tempfile::tempdir().unwrap();
        seed_cache(root.path());
        let project = tempfile::tempdir().unwrap();
        write(
            project.path(),
            TCEX_JSON,
            r#"{"package": {"app_name": "my_app", "excludes": []}}"#,
        );

        manager(root.path())
            .update(project.path(), "v2", "egress", "organization", true, false, &DefaultPrompter)
            .unwrap();
        let tj = TcexJson::from_dir(project.path()).unwrap();
        assert_eq!(tj.package.app_name, "my_app");
        assert_eq!(tj.template_name.as_deref(), Some("egress"));
        assert_eq!(tj.template_type.as_deref(), Some("organization"));
    }

    #[test]
    fn test_migrate_legacy_manifest() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = seed_cache(root.path());
        let project = tempfile::tempdir().unwrap();
        let m = manager(root.path());

        write(project.path(), LEGACY_MANIFEST_JSON, "{}");
        write(project.path(), "run.py", "run()\n");
        write(project.path(), "app.py", "customized\n");

        let merged = m.build_merged(&cache_dir, "basic", "playbook", false).unwrap();
        assert!(m.migrate_legacy_manifest(merged.path(), project.path()).unwrap());
        assert!(!project.path().join(LEGACY_MANIFEST_JSON).exists());

        let local = ManifestStore::load(&project.path().join(MANIFEST_JSON)).unwrap();
        assert_eq!(local.len(), 2);
        assert_ne!(local["run.py"].last_commit, "legacy_migrated");
        assert_eq!(local["app.py"].last_commit, "legacy_migrated");

        // second call is a no-op once manifest.json exists
        assert!(!m.migrate_legacy_manifest(merged.path(), project.path()).unwrap());
    }

    #[test]
    fn test_default_app_name() {
        let name = default_app_name(TemplateType::Playbook, Path::new("/tmp/my-app 1"));
        assert_eq!(name, "TCPB_my_app_1");
        assert_eq!(default_app_name(TemplateType::Tie, Path::new("/x/feed")), "feed");
    }
}
