//! CLI Commands

pub mod app_input;
pub mod deps;
pub mod init;
pub mod list;
pub mod package;
pub mod run;
pub mod update;
pub mod validate;

pub use app_input::AppInputCommand;
pub use deps::DepsCommand;
pub use init::InitCommand;
pub use list::ListCommand;
pub use package::PackageCommand;
pub use run::RunCommand;
pub use update::UpdateCommand;
pub use validate::ValidateCommand;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tcex_shared::ProxySettings;
use tcex_template::{GitHubSource, TemplateCache, TemplateManager};

/// Default template repository branch
pub const DEFAULT_BRANCH: &str = "v2";

/// Proxy flags shared by commands that reach the network
#[derive(Debug, Clone, Default, Args)]
pub struct ProxyArgs {
    /// Proxy host (falls back to TC_PROXY_HOST)
    #[arg(long)]
    pub proxy_host: Option<String>,

    /// Proxy port (falls back to TC_PROXY_PORT)
    #[arg(long)]
    pub proxy_port: Option<u16>,

    /// Proxy username (falls back to TC_PROXY_USER)
    #[arg(long)]
    pub proxy_user: Option<String>,

    /// Proxy password (falls back to TC_PROXY_PASS)
    #[arg(long)]
    pub proxy_pass: Option<String>,
}

impl ProxyArgs {
    pub fn settings(&self) -> ProxySettings {
        ProxySettings::resolve(
            self.proxy_host.clone(),
            self.proxy_port,
            self.proxy_user.clone(),
            self.proxy_pass.clone(),
        )
    }
}

/// Template manager over the per-user cache and the GitHub source
pub(crate) fn template_manager(proxy: &ProxyArgs) -> anyhow::Result<TemplateManager> {
    let cache = TemplateCache::default_location()?;
    let source = GitHubSource::new(&proxy.settings())?;
    Ok(TemplateManager::new(cache, Box::new(source)))
}

/// Run `f` behind a spinner on stderr
pub(crate) fn with_spinner<T>(message: &str, f: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = f();
    spinner.finish_and_clear();
    result
}

/// Refresh the template cache for `branch`, showing progress
pub(crate) fn ensure_templates(manager: &TemplateManager, branch: &str) -> anyhow::Result<()> {
    with_spinner(&format!("Checking templates ({})...", branch), || {
        manager.ensure_cache(branch)
    })?;
    Ok(())
}
