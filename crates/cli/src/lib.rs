//! # tcex CLI
//!
//! Command implementations, terminal rendering and the interactive prompter
//! for the `tcex` binary.

pub mod commands;
pub mod prompt;
pub mod render;
