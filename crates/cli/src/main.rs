//! tcex - ThreatConnect Exchange App CLI
//!
//! Usage:
//!   tcex init --type playbook --template basic   - Create a project from a template
//!   tcex list [--type organization]              - List available templates
//!   tcex update                                  - Update project files from the template
//!   tcex deps                                    - Install App dependencies
//!   tcex validate                                - Validate App configuration
//!   tcex package                                 - Build the .tcx package
//!   tcex app-input                               - Generate app_inputs.json
//!   tcex run                                     - Run the App locally

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tcex_cli::commands::{
    AppInputCommand, DepsCommand, InitCommand, ListCommand, PackageCommand, RunCommand,
    UpdateCommand, ValidateCommand,
};
use tcex_cli::render;

#[derive(Parser)]
#[command(name = "tcex")]
#[command(about = "tcex - scaffold, validate, package and run ThreatConnect Apps")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new App from a template
    Init(InitCommand),
    /// List available templates
    List(ListCommand),
    /// Update the App with the latest template files
    Update(UpdateCommand),
    /// Install App dependencies
    Deps(DepsCommand),
    /// Validate App configuration files
    Validate(ValidateCommand),
    /// Package the App for installation
    Package(PackageCommand),
    /// Generate app_inputs.json from install.json
    AppInput(AppInputCommand),
    /// Run the App locally
    Run(RunCommand),
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(cmd) => cmd.run().map(|_| 0),
        Commands::List(cmd) => cmd.run().map(|_| 0),
        Commands::Update(cmd) => cmd.run().map(|_| 0),
        Commands::Deps(cmd) => cmd.run().map(|_| 0),
        Commands::Validate(cmd) => cmd.run().map(|_| 0),
        Commands::Package(cmd) => cmd.run().map(|_| 0),
        Commands::AppInput(cmd) => cmd.run().map(|_| 0),
        Commands::Run(cmd) => cmd.run(),
    };

    match result {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            render::failure(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
