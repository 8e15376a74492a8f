//! CLI command definitions for the `formspec` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod form;
pub mod surface;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Compile declarative form types and run them interactively.
#[derive(Parser)]
#[command(name = "formspec", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Engine configuration file (defaults to ~/.formspec/config.toml).
    #[arg(long, global = true, env = "FORMSPEC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the forms in the catalog.
    #[command(alias = "ls")]
    List,

    /// Compile a form and show its execution plan.
    Plan {
        /// Form type name.
        form: String,
    },

    /// Compile every form and validate the nested-form graph.
    Check,

    /// Build a form interactively and print the result.
    Run {
        /// Form type name.
        form: String,

        /// Supply a dependency or preset value (`name=value`, value parsed
        /// as JSON when possible). Repeatable.
        #[arg(long = "set", value_name = "NAME=VALUE")]
        sets: Vec<String>,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}
