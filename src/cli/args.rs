//! Command-line arguments and subcommands for `dhall-syntax`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "dhall-syntax",
    version,
    about = "Parse Dhall source into a typed syntax tree."
)]
pub struct DhallArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Compiled grammar artifact (JSON) to use instead of the embedded grammar.
    #[arg(long, global = true, value_name = "ARTIFACT")]
    pub grammar: Option<PathBuf>,

    /// YAML file with parse options.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the maximum expression nesting.
    #[arg(long, global = true, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Reject variables that no enclosing binder introduces.
    #[arg(long, global = true)]
    pub reject_free_variables: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse files and print their syntax trees.
    Parse {
        /// Files or directories; directories are searched for `*.dhall`.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the generic parse tree of a file.
    Tree {
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Report whether each file parses.
    Check {
        /// Files or directories; directories are searched for `*.dhall`.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}
