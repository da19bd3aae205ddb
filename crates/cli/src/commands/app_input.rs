//! tcex app-input command

use crate::{prompt, render};
use clap::Args;
use tcex_run::AppInputGenerator;
use tcex_shared::{InstallJson, APP_INPUTS_JSON};

#[derive(Debug, Args)]
pub struct AppInputCommand {
    /// Include optional params without asking
    #[arg(long)]
    pub include_optional: bool,

    /// Overwrite an existing app_inputs.json
    #[arg(long)]
    pub force: bool,
}

impl AppInputCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        let app_dir = std::env::current_dir()?;
        let install_json = InstallJson::from_dir(&app_dir)?;
        let prompter = prompt::prompter();

        let generator =
            AppInputGenerator::new(install_json, self.include_optional, prompter.as_ref());
        let app_inputs = generator.generate()?;
        let path = app_dir.join(APP_INPUTS_JSON);
        generator.write(&app_inputs, &path, self.force)?;

        let inputs: Vec<(String, String)> = app_inputs
            .inputs
            .iter()
            .map(|(k, v)| (k.clone(), display_value(v)))
            .collect();
        print!("{}", render::key_value_table("Inputs", &inputs));
        let staged: Vec<(String, String)> = app_inputs
            .stage
            .kvstore
            .iter()
            .map(|(k, v)| (k.clone(), display_value(v)))
            .collect();
        print!("{}", render::key_value_table("Staged Data", &staged));

        render::success("Success", &format!("Wrote {}", path.display()));
        Ok(())
    }
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
