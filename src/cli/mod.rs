//! CLI module for the vtiles deployment tool.
//!
//! This module provides the command-line interface for publishing layers
//! and composing, fetching and launching deployments.

mod commands;
mod output;

pub use commands::{Cli, Commands, DeployArgs, OutputFormat};
pub use output::OutputFormatter;
