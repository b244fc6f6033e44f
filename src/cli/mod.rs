//! CLI module for netform
//!
//! Argument parsing and subcommand dispatch.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// netform - declare the VPC/ALB topology and synthesize CloudFormation templates
#[derive(Parser, Debug, Clone)]
#[command(name = "netform")]
#[command(version)]
#[command(about = "Declare cloud network topology and synthesize CloudFormation templates", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Region the stacks deploy to (overrides configuration)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "NETFORM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Synthesize templates into a cloud assembly directory
    Synth(commands::synth::SynthArgs),

    /// List stacks and their resources
    List(commands::list::ListArgs),

    /// Show the dependency graph of a stack
    Graph(commands::graph::GraphArgs),

    /// Validate every stack
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["netform", "synth"]).unwrap();
        assert!(matches!(cli.command, Commands::Synth(_)));
        assert!(!cli.is_json());
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["netform", "-vvvvv", "list"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "netform",
            "validate",
            "--region",
            "us-east-1",
            "--output",
            "json",
            "--no-color",
        ])
        .unwrap();
        assert_eq!(cli.region.as_deref(), Some("us-east-1"));
        assert!(cli.is_json());
        assert!(cli.no_color);
    }

    #[test]
    fn test_unknown_output_rejected() {
        assert!(Cli::try_parse_from(["netform", "--output", "xml", "list"]).is_err());
    }
}
