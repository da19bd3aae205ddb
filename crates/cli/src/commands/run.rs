//! tcex run command

use crate::render;
use clap::Args;
use std::path::PathBuf;
use tcex_run::{
    ensure_kvstore, kvstore_address, playbook_context, Launcher, MemoryKvStore, RedisKvStore,
};
use tcex_shared::APP_INPUTS_JSON;

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Inputs file, relative to the App directory
    #[arg(long, default_value = APP_INPUTS_JSON)]
    pub config: PathBuf,

    /// Python interpreter used to run the App
    #[arg(long, default_value = "python3")]
    pub python: String,

    /// Never start the fake Redis server
    #[arg(long)]
    pub no_fake_redis: bool,
}

impl RunCommand {
    /// Launch the App and return its exit code
    pub fn run(&self) -> anyhow::Result<i32> {
        let launcher = Launcher::new(std::env::current_dir()?)
            .with_config(&self.config)
            .with_python(&self.python)
            .load()?;

        if !launcher.install_json().is_playbook_app() {
            let inputs = launcher.prepare_inputs(&MemoryKvStore::new())?;
            return Ok(launcher.launch(&inputs)?);
        }

        let (host, port, db) = kvstore_address(&launcher.app_inputs().inputs);
        let _fake_redis = if self.no_fake_redis {
            None
        } else {
            ensure_kvstore(&host, port)
        };
        let store = RedisKvStore::connect(&host, port, db)?;

        let inputs = launcher.prepare_inputs(&store)?;
        let exit_code = launcher.launch(&inputs)?;

        if let Some(context) = playbook_context(&inputs) {
            let output = Launcher::output_data(&store, context)?;
            render::info(
                "Output Data",
                &serde_json::to_string_pretty(&serde_json::Value::Object(output))?,
            );
        }
        Ok(exit_code)
    }
}
