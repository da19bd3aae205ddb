//! tcex update command

use super::{ensure_templates, template_manager, ProxyArgs, DEFAULT_BRANCH};
use crate::{prompt, render};
use anyhow::{anyhow, bail};
use clap::Args;
use tcex_shared::{TcexJson, TCEX_JSON};

#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Template name, when tcex.json does not set one
    #[arg(long)]
    pub template: Option<String>,

    /// Template type, when tcex.json does not set one
    #[arg(long = "type", value_name = "TYPE")]
    pub template_type: Option<String>,

    /// Clear the template cache first
    #[arg(long)]
    pub clear: bool,

    /// Overwrite modified files without asking
    #[arg(long)]
    pub force: bool,

    /// Template repository branch
    #[arg(long, default_value = DEFAULT_BRANCH)]
    pub branch: String,

    #[command(flatten)]
    pub proxy: ProxyArgs,
}

impl UpdateCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        let project = std::env::current_dir()?;
        if !project.join(TCEX_JSON).is_file() {
            bail!("Update requires a tcex.json file in the current directory.");
        }
        let tj = TcexJson::from_dir(&project)?;

        if tj.template_name.is_some() && self.template.is_some() {
            bail!("The --template arg is not allowed when tcex.json sets template_name.");
        }
        if tj.template_type.is_some() && self.template_type.is_some() {
            bail!("The --type arg is not allowed when tcex.json sets template_type.");
        }
        let name = tj
            .template_name
            .clone()
            .or_else(|| self.template.clone())
            .ok_or_else(|| anyhow!("A template name is required (--template)."))?;
        let template_type = tj
            .template_type
            .clone()
            .or_else(|| self.template_type.clone())
            .ok_or_else(|| anyhow!("A template type is required (--type)."))?;

        let manager = template_manager(&self.proxy)?;
        if self.clear {
            manager.clear_cache(&self.branch)?;
        }
        ensure_templates(&manager, &self.branch)?;

        let prepared = manager.prepare_update(
            &project,
            &self.branch,
            &name,
            &template_type,
            self.force,
            false,
        )?;
        print!(
            "{}",
            render::key_value_table("Plan Summary", &prepared.plan.summary())
        );

        let prompter = prompt::prompter();
        manager.apply_update(&prepared, &project, self.force, prompter.as_ref())?;

        print!(
            "{}",
            render::key_value_table(
                "Update Summary",
                &[
                    ("Template Type", template_type.as_str()),
                    ("Template Name", name.as_str()),
                    ("Branch", self.branch.as_str()),
                ],
            )
        );
        Ok(())
    }
}
