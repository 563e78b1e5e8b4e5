//! CLI module
//!
//! Command-line interface for running poll cycles.
//!
//! # Commands
//!
//! - `connectors` - List built-in variants and their credential fields
//! - `validate` - Check configured credentials offline
//! - `run` - Run one cycle per configured instance
//!
//! Scheduling stays outside: run `auditpull run` from cron, a systemd timer
//! or a job runner.

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
