//! Graph command - dependency graph of a stack
//!
//! Prints the deployment order and edges, or Graphviz DOT with `--dot`.

use super::CommandContext;
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

/// Arguments for the graph command
#[derive(Parser, Debug, Clone)]
pub struct GraphArgs {
    /// Only show this stack
    #[arg(long, short = 's')]
    pub stack: Option<String>,

    /// Emit Graphviz DOT
    #[arg(long)]
    pub dot: bool,
}

impl GraphArgs {
    /// Execute the graph command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let app = ctx.app()?;
        let stacks = ctx.select(&app, self.stack.as_deref())?;

        for stack in stacks {
            let graph = stack
                .dependency_graph()
                .with_context(|| format!("Failed to build dependency graph for {}", stack.id()))?;

            if self.dot {
                println!("{}", graph.to_dot());
                continue;
            }

            let order = graph.deployment_order()?;
            if ctx.output.is_json() {
                let edges: Vec<_> = graph.edges().collect();
                ctx.output.document(&json!({
                    "stack": stack.id(),
                    "order": order,
                    "edges": edges,
                }));
                continue;
            }

            ctx.output.section(&format!(
                "{}: {} constructs, {} dependencies",
                stack.id(),
                graph.node_count(),
                graph.edge_count()
            ));
            let items: Vec<String> = order
                .iter()
                .enumerate()
                .map(|(i, path)| format!("{:>2}. {}", i + 1, path))
                .collect();
            ctx.output.list("Deployment order", &items);

            let rows: Vec<Vec<String>> = graph
                .edges()
                .map(|e| {
                    vec![
                        e.to.clone(),
                        e.from.clone(),
                        format!("{:?}", e.dependency_type).to_lowercase(),
                    ]
                })
                .collect();
            println!();
            ctx.output.table(&["Construct", "Depends on", "Via"], &rows);
        }
        Ok(0)
    }
}
