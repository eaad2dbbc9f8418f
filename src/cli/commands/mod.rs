//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod list;
pub mod serve;
pub mod show_config;
