//! tcex validate command

use crate::render;
use anyhow::bail;
use clap::Args;
use tcex_package::{ValidationReport, Validator};

#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl ValidateCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        let report = Validator::validate(&std::env::current_dir()?)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        if !report.passed() {
            bail!("Validation failed.");
        }
        if !self.json {
            render::success("Success", "App validation passed.");
        }
        Ok(())
    }
}

/// File syntax table followed by any errors
pub(crate) fn print_report(report: &ValidationReport) {
    let rows: Vec<Vec<String>> = report
        .file_syntax
        .iter()
        .map(|f| vec![f.filename.clone(), f.status.to_string()])
        .collect();
    print!("{}", render::table("File Syntax", &["File", "Status"], &rows));

    if !report.errors.is_empty() {
        let rows: Vec<Vec<String>> = report.errors.iter().map(|e| vec![e.clone()]).collect();
        print!("{}", render::table("Validation Errors", &["Error"], &rows));
    }
}
