//! tcex deps command

use super::{with_spinner, ProxyArgs};
use crate::render;
use anyhow::bail;
use clap::Args;
use tcex_deps::DepsInstaller;

#[derive(Debug, Args)]
pub struct DepsCommand {
    /// Running under App Builder (skips the Python version check)
    #[arg(long)]
    pub app_builder: bool,

    /// Deprecated
    #[arg(long, hide = true)]
    pub branch: Option<String>,

    /// Pass --no-cache-dir to pip
    #[arg(long)]
    pub no_cache_dir: bool,

    /// Allow pre-release packages
    #[arg(long)]
    pub pre: bool,

    /// Python interpreter used to run pip
    #[arg(long, default_value = "python3")]
    pub python: String,

    #[command(flatten)]
    pub proxy: ProxyArgs,
}

impl DepsCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        if self.branch.is_some() {
            bail!("The --branch arg is deprecated.");
        }

        let mut installer = DepsInstaller::new(std::env::current_dir()?)
            .with_python(&self.python)
            .with_app_builder(self.app_builder)
            .with_no_cache_dir(self.no_cache_dir)
            .with_pre(self.pre)
            .with_proxy(self.proxy.settings());

        installer.validate_python_version()?;
        installer.configure_proxy();
        with_spinner("Installing dependencies...", || -> tcex_shared::Result<()> {
            installer.install_deps()?;
            installer.install_deps_tests()
        })?;

        print!(
            "{}",
            render::key_value_table("Dependency Summary", installer.output())
        );
        render::success("Success", "Dependencies installed.");
        Ok(())
    }
}
