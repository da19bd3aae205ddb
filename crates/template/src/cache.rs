//! TemplateCache - local copy of the template repository per branch
//!
//! Templates live in `~/.tcex/templates/templates-{branch}`. Freshness is a
//! single API call comparing the branch head commit date with the cache
//! directory mtime.

use crate::source::TemplateSource;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tcex_shared::{Result, TcexError};

/// Branch keyed template cache
#[derive(Debug, Clone)]
pub struct TemplateCache {
    root: PathBuf,
}

impl TemplateCache {
    /// Create a cache rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache at `~/.tcex/templates`
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(tcex_shared::cli_home()?.join("templates")))
    }

    /// Cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache directory for a branch
    pub fn dir(&self, branch: &str) -> PathBuf {
        self.root.join(format!("templates-{}", branch))
    }

    /// Check if the cache is missing or older than the remote branch head
    pub fn is_stale(&self, branch: &str, source: &dyn TemplateSource) -> bool {
        let dir = self.dir(branch);
        if !dir.exists() {
            return true;
        }

        let Some(remote) = source.latest_commit_date(branch) else {
            tracing::warn!(action = "cache-is-stale", branch, "remote date unavailable, using cache");
            return false;
        };
        let remote = match DateTime::parse_from_rfc3339(&remote) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!(action = "cache-is-stale", value = %remote, error = %e, "invalid remote date");
                return false;
            }
        };

        let modified = match fs::metadata(&dir).and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(_) => return true,
        };
        remote > modified
    }

    /// Make sure the cache for `branch` is fresh and return its directory
    pub fn ensure(&self, branch: &str, source: &dyn TemplateSource) -> Result<PathBuf> {
        if self.is_stale(branch, source) {
            self.refresh(branch, source)?;
        }
        Ok(self.dir(branch))
    }

    /// Download the branch zipball and swap it in as the new cache
    pub fn refresh(&self, branch: &str, source: &dyn TemplateSource) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        let zip_file = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".zip")
            .tempfile_in(&self.root)?;
        source.download_zipball(branch, zip_file.path())?;

        let staging = tempfile::Builder::new()
            .prefix(".templates-")
            .tempdir_in(&self.root)?;
        extract_zipball(zip_file.path(), staging.path())?;

        let dir = self.dir(branch);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::rename(staging.into_path(), &dir)?;
        tracing::info!(action = "refresh-cache", branch, path = %dir.display(), "template cache updated");
        Ok(())
    }

    /// Remove the cache for a branch
    pub fn clear(&self, branch: &str) -> Result<()> {
        let dir = self.dir(branch);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!(action = "clear-cache", path = %dir.display(), "cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Extract a GitHub zipball into `dest`, dropping the `{owner}-{repo}-{sha}/` prefix
pub fn extract_zipball(zip_path: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| TcexError::Archive(format!("Invalid zipball: {}", e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| TcexError::Archive(e.to_string()))?;

        let Some(name) = entry.enclosed_name() else {
            return Err(TcexError::Archive(format!(
                "Unsafe path in zipball: {}",
                entry.name()
            )));
        };
        let relative: PathBuf = name
            .components()
            .skip(1)
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&target)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))?;
        }
    }
    Ok(())
}
