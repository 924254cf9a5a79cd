//! Validate command - checks a workflow definition

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::domain::workflow::Workflow;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Workflow definition file (JSON)
    #[arg(long)]
    pub workflow: PathBuf,
}

/// Parse a workflow and describe its steps in execution order
pub fn describe(text: &str) -> anyhow::Result<Vec<String>> {
    let workflow: Workflow = serde_json::from_str(text).context("Invalid workflow definition")?;
    let steps = workflow.ordered_steps()?;

    Ok(steps
        .iter()
        .map(|step| {
            format!(
                "{:>4}  {:<18} {}",
                step.step_order(),
                step.step_type().type_name(),
                step.display_name()
            )
        })
        .collect())
}

pub async fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(&args.workflow)
        .await
        .with_context(|| format!("Failed to read {}", args.workflow.display()))?;

    let lines = describe(&text)?;
    println!("{} is valid ({} steps)", args.workflow.display(), lines.len());
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
