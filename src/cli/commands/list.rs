//! List command - stacks and their declared resources

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use netform::stack::{resource_logical_id, Stack};
use serde_json::json;

/// Arguments for the list command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// Only list this stack
    #[arg(long, short = 's')]
    pub stack: Option<String>,
}

impl ListArgs {
    /// Execute the list command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let app = ctx.app()?;
        let stacks = ctx.select(&app, self.stack.as_deref())?;

        if ctx.output.is_json() {
            let listing: Vec<_> = stacks.iter().map(|s| stack_json(s)).collect();
            ctx.output.document(&json!({
                "region": app.region(),
                "stacks": listing,
            }));
            return Ok(0);
        }

        for stack in stacks {
            ctx.output
                .section(&format!("{} ({})", stack.id(), stack.region()));
            let rows: Vec<Vec<String>> = stack
                .constructs()
                .map(|(path, kind)| {
                    vec![path.to_string(), kind.to_string(), resource_logical_id(path)]
                })
                .collect();
            ctx.output.table(&["Construct", "Kind", "Logical ID"], &rows);
        }
        Ok(0)
    }
}

fn stack_json(stack: &Stack) -> serde_json::Value {
    let resources: Vec<_> = stack
        .constructs()
        .map(|(path, kind)| {
            json!({
                "path": path,
                "kind": kind,
                "logical_id": resource_logical_id(path),
            })
        })
        .collect();
    json!({
        "id": stack.id(),
        "region": stack.region(),
        "resources": resources,
    })
}
