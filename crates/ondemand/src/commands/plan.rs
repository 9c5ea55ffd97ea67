use crate::commands::{StackArgs, compose, load_config, warn_task_size};
use colored::Colorize;
use ondemand_cloud::ActionType;
use std::path::Path;

pub async fn handle(env_file: Option<&Path>, args: &StackArgs) -> anyhow::Result<()> {
    println!("{}", "スタックを組み立て中...".blue());

    let config = load_config(env_file);
    warn_task_size(&config);

    let stack = compose(&config, args).await;
    let plan = stack.plan()?;

    println!();
    println!("{} ({}):", "実行計画".bold(), stack.graph.description());
    for action in &plan.actions {
        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Lookup => "~".yellow(),
        };
        let retained = action
            .details
            .get("removal_policy")
            .and_then(|v| v.as_str())
            .filter(|policy| *policy == "Retain")
            .map(|_| " [retain]".dimmed().to_string())
            .unwrap_or_default();
        println!(
            "  {} {} {}{}",
            marker,
            action.resource_id.cyan(),
            format!("({})", action.resource_type).dimmed(),
            retained
        );
    }

    println!();
    println!("{}", plan.summary().to_string().bold());

    Ok(())
}
