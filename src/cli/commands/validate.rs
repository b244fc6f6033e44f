//! Validate command - check every stack before synthesis

use super::CommandContext;
use crate::cli::output::StackStatus;
use anyhow::Result;
use clap::Parser;

/// Arguments for the validate command
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Only validate this stack
    #[arg(long, short = 's')]
    pub stack: Option<String>,
}

impl ValidateArgs {
    /// Execute the validate command. Exits with 1 when any stack fails.
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let app = ctx.app()?;
        let stacks = ctx.select(&app, self.stack.as_deref())?;

        let mut failures = 0;
        for stack in stacks {
            match stack.validate() {
                Ok(()) => {
                    let count = stack.constructs().count();
                    ctx.output.stack_result(
                        stack.id(),
                        StackStatus::Ok,
                        Some(&format!("{} constructs", count)),
                    );
                }
                Err(e) => {
                    failures += 1;
                    ctx.output
                        .stack_result(stack.id(), StackStatus::Failed, Some(&e.to_string()));
                }
            }
        }

        if failures > 0 {
            ctx.output
                .error(&format!("{} stack(s) failed validation", failures));
            return Ok(1);
        }
        Ok(0)
    }
}
