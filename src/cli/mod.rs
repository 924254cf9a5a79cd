//! CLI for the extraction workflow engine
//!
//! - `run`: execute a workflow against an extracted-data context
//! - `validate`: check a workflow definition without running it

pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};

/// Extraction workflow - runs post-extraction steps over extracted PDF data
#[derive(Parser)]
#[command(name = "extraction-workflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute a workflow and print the result as JSON
    Run(run::RunArgs),

    /// Parse a workflow definition and check its step order
    Validate(validate::ValidateArgs),
}
