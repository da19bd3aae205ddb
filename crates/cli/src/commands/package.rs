//! tcex package command

use super::validate::print_report;
use crate::render;
use clap::Args;
use std::path::PathBuf;
use tcex_package::Packager;

#[derive(Debug, Args)]
pub struct PackageCommand {
    /// Extra exclude patterns for the App root
    #[arg(long = "excludes", value_name = "PATTERN")]
    pub excludes: Vec<String>,

    /// Package even when validation fails
    #[arg(long)]
    pub ignore_validation: bool,

    /// Output directory for the .tcx file
    #[arg(long, default_value = "target")]
    pub output_dir: PathBuf,

    /// Print package and validation data as JSON (App Builder)
    #[arg(long)]
    pub json: bool,
}

impl PackageCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        let report = Packager::new(std::env::current_dir()?)
            .with_output_dir(&self.output_dir)
            .with_excludes(self.excludes.clone())
            .ignore_validation(self.ignore_validation)
            .package()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        if let Some(validation) = &report.validation {
            print_report(validation);
        }
        let meta = &report.app_metadata;
        print!(
            "{}",
            render::key_value_table(
                "App Metadata",
                &[
                    ("App Name", meta.name.as_str()),
                    ("Package Name", meta.package_name.as_str()),
                    ("Template Directory", meta.template_directory.as_str()),
                    ("Version", meta.version.as_str()),
                    ("Features", meta.features.as_str()),
                ],
            )
        );
        render::success("Success", &format!("Created {}", meta.package_name));
        Ok(())
    }
}
