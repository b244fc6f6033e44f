//! Synth command - render stacks to CloudFormation templates
//!
//! Writes a cloud assembly directory, or prints the templates with `--stdout`.

use super::CommandContext;
use crate::cli::output::format_duration;
use anyhow::{Context, Result};
use clap::Parser;
use netform::synth::{self, CloudAssembly, TemplateFormat};
use std::path::PathBuf;

/// Arguments for the synth command
#[derive(Parser, Debug, Clone)]
pub struct SynthArgs {
    /// Only synthesize this stack
    #[arg(long, short = 's')]
    pub stack: Option<String>,

    /// Cloud assembly directory (defaults to the configured one)
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Template format (defaults to the configured one)
    #[arg(long, short = 'f')]
    pub format: Option<TemplateFormat>,

    /// Print templates instead of writing files
    #[arg(long)]
    pub stdout: bool,
}

impl SynthArgs {
    /// Execute the synth command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let app = ctx.app()?;
        let stacks = ctx.select(&app, self.stack.as_deref())?;
        let format = self.format.unwrap_or(ctx.config.synth.format);

        let mut templates = Vec::with_capacity(stacks.len());
        for stack in stacks {
            ctx.output.info(&format!("Synthesizing {}", stack.id()));
            let template = synth::synthesize(stack)
                .with_context(|| format!("Failed to synthesize stack {}", stack.id()))?;
            templates.push(template);
        }

        if self.stdout {
            for template in &templates {
                let rendered = template.render(format)?;
                if format == TemplateFormat::Yaml && templates.len() > 1 {
                    println!("---");
                }
                println!("{}", rendered.trim_end());
            }
            ctx.output.flush();
            return Ok(0);
        }

        let out = self
            .out
            .clone()
            .unwrap_or_else(|| ctx.config.synth.output_dir.clone());
        let assembly = CloudAssembly::write(&out, &ctx.region, &templates, format)
            .with_context(|| format!("Failed to write cloud assembly to {}", out.display()))?;

        ctx.output.section("Synthesized");
        let rows: Vec<Vec<String>> = templates
            .iter()
            .map(|t| {
                vec![
                    t.stack_id().to_string(),
                    t.resources.len().to_string(),
                    assembly
                        .template_path(t.stack_id())
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                ]
            })
            .collect();
        ctx.output.table(&["Stack", "Resources", "Template"], &rows);
        ctx.output.info(&format!(
            "Cloud assembly written to {} in {}",
            assembly.directory.display(),
            format_duration(ctx.output.elapsed())
        ));
        Ok(0)
    }
}
