//! Subcommands module for the netform CLI

pub mod graph;
pub mod list;
pub mod synth;
pub mod validate;

use crate::cli::output::OutputFormatter;
use anyhow::{Context, Result};
use netform::config::Config;
use netform::stack::{App, Stack};
use netform::topology;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Effective region: `--region`, else the configured one
    pub region: String,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.colors.enabled;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());
        let region = cli
            .region
            .clone()
            .unwrap_or_else(|| config.app.region.clone());

        Self {
            config,
            output,
            region,
        }
    }

    /// Declare the app for the effective region.
    pub fn app(&self) -> Result<App> {
        topology::build_app(&self.region)
            .with_context(|| format!("Failed to declare stacks in region {}", self.region))
    }

    /// Stacks named by `selection`, or every stack.
    pub fn select<'a>(&self, app: &'a App, selection: Option<&str>) -> Result<Vec<&'a Stack>> {
        let stacks = app.select(selection);
        if stacks.is_err() {
            self.output
                .hint(&format!("Available stacks: {}", app.stack_ids().join(", ")));
        }
        Ok(stacks?)
    }
}
