//! tcex list command

use super::{ensure_templates, template_manager, ProxyArgs, DEFAULT_BRANCH};
use crate::render;
use clap::Args;

const HEADERS: [&str; 5] = ["Template", "Contributor", "Version", "Summary", "Install Command"];

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only list templates of this type
    #[arg(long = "type", value_name = "TYPE")]
    pub template_type: Option<String>,

    /// Template repository branch
    #[arg(long, default_value = DEFAULT_BRANCH)]
    pub branch: String,

    #[command(flatten)]
    pub proxy: ProxyArgs,
}

impl ListCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        let manager = template_manager(&self.proxy)?;
        ensure_templates(&manager, &self.branch)?;
        let listing = manager.list(&self.branch, self.template_type.as_deref())?;

        for (template_type, configs) in &listing {
            let rows: Vec<Vec<String>> = configs
                .iter()
                .map(|c| {
                    vec![
                        c.name.clone(),
                        c.contributor.clone(),
                        c.version.clone(),
                        c.summary.clone(),
                        c.install_command(),
                    ]
                })
                .collect();
            println!(
                "{}",
                render::table(&format!("{} Templates", template_type.title()), &HEADERS, &rows)
            );
        }

        if manager.has_errors() {
            render::warning("Warning", "One or more template.yaml files could not be parsed.");
        }
        Ok(())
    }
}
