//! # tcex Shared
//!
//! Common types used across all tcex crates: the App configuration files
//! (`install.json`, `tcex.json`, `app_inputs.json`), proxy settings, the
//! error type and the prompt abstraction used by interactive commands.

pub mod app_inputs;
pub mod config;
pub mod error;
pub mod install_json;
pub mod prompt;
pub mod tcex_json;
pub mod version;

// Re-exports
pub use app_inputs::*;
pub use config::*;
pub use error::*;
pub use install_json::*;
pub use prompt::*;
pub use tcex_json::*;
pub use version::is_semver;
