//! # tcex Template
//!
//! Project templates from the `tcex-app-templates` repository: the local
//! cache, `template.yaml` parsing, parent inheritance, and the manifest
//! driven planner that updates a project without clobbering local edits.

pub mod cache;
pub mod config;
pub mod manager;
pub mod planner;
pub mod source;

pub use cache::TemplateCache;
pub use config::{TemplateConfig, TemplateType};
pub use manager::{default_app_name, PreparedUpdate, TemplateManager};
pub use planner::{FileMeta, Hasher, Manifest, ManifestStore, Plan, PlanItem, Planner, SafeFileOps};
pub use source::{GitHubSource, TemplateSource};

/// Name of the shared parent template at the repository root
pub const APP_COMMON: &str = "_app_common";

/// Name of the manifest file written into projects
pub const MANIFEST_JSON: &str = "manifest.json";

/// Name of the manifest file used before `manifest.json`
pub const LEGACY_MANIFEST_JSON: &str = ".template_manifest.json";
