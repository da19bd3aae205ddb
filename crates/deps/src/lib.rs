//! # tcex Deps
//!
//! Installs the App's Python dependencies into `deps/` (and test
//! dependencies into `deps_tests/`) by driving `pip` through a
//! [`CommandRunner`].

pub mod installer;
pub mod runner;

pub use installer::DepsInstaller;
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
