//! tcex init command

use super::{ensure_templates, template_manager, ProxyArgs, DEFAULT_BRANCH};
use crate::{prompt, render};
use anyhow::bail;
use clap::Args;
use std::path::Path;
use tcex_shared::{TcexJson, TCEX_JSON};
use tcex_template::default_app_name;

#[derive(Debug, Args)]
pub struct InitCommand {
    /// Template type (e.g. playbook, organization)
    #[arg(long = "type", value_name = "TYPE")]
    pub template_type: String,

    /// Template name
    #[arg(long)]
    pub template: String,

    /// Template repository branch
    #[arg(long, default_value = DEFAULT_BRANCH)]
    pub branch: String,

    /// Include App Builder files
    #[arg(long)]
    pub app_builder: bool,

    /// Initialize even if the directory is not empty
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub proxy: ProxyArgs,
}

impl InitCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        let project = std::env::current_dir()?;
        if !self.force && !is_empty_dir(&project)? {
            bail!(
                "The directory {} is not empty. Use --force to initialize anyway.",
                project.display()
            );
        }

        let manager = template_manager(&self.proxy)?;
        ensure_templates(&manager, &self.branch)?;
        let prepared = manager.prepare_update(
            &project,
            &self.branch,
            &self.template,
            &self.template_type,
            true,
            self.app_builder,
        )?;
        print!(
            "{}",
            render::key_value_table("Plan Summary", &prepared.plan.summary())
        );

        let prompter = prompt::prompter();
        manager.apply_update(&prepared, &project, true, prompter.as_ref())?;

        let tcex_json = project.join(TCEX_JSON);
        if tcex_json.is_file() {
            let mut tj = TcexJson::from_file(&tcex_json)?;
            if tj.package.app_name.trim().is_empty() {
                tj.package.app_name = default_app_name(prepared.template_type, &project);
                tj.write(&tcex_json)?;
                tracing::info!(action = "init", app_name = %tj.package.app_name, "set default App name");
            }
        }

        if manager.has_errors() {
            render::warning("Warning", "One or more template.yaml files could not be parsed.");
        }
        render::success(
            "Success",
            &format!(
                "Initialized {} template \"{}\" in {}",
                prepared.template_type.title(),
                self.template,
                project.display()
            ),
        );
        Ok(())
    }
}

/// Empty apart from dotfiles
fn is_empty_dir(dir: &Path) -> anyhow::Result<bool> {
    for entry in std::fs::read_dir(dir)? {
        if !entry?.file_name().to_string_lossy().starts_with('.') {
            return Ok(false);
        }
    }
    Ok(true)
}
