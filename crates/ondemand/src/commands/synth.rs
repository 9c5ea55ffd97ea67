use crate::commands::{StackArgs, compose, load_config, warn_task_size};
use anyhow::Context;
use colored::Colorize;
use ondemand_stack::constants::STACK_NAME;
use std::path::Path;
use tracing::info;

pub async fn handle(env_file: Option<&Path>, args: &StackArgs, out: &Path) -> anyhow::Result<()> {
    let config = load_config(env_file);
    warn_task_size(&config);

    let stack = compose(&config, args).await;
    let template = stack.render()?;

    std::fs::create_dir_all(out)
        .with_context(|| format!("出力ディレクトリを作成できません: {}", out.display()))?;
    let path = out.join(format!("{}.template.json", STACK_NAME));
    let content = serde_json::to_string_pretty(&template)?;
    std::fs::write(&path, content)
        .with_context(|| format!("テンプレートを書き込めません: {}", path.display()))?;

    info!(path = %path.display(), resources = stack.graph.len(), "Template written");
    println!(
        "{} {} ({} リソース)",
        "✓ テンプレートを書き出しました:".green().bold(),
        path.display().to_string().cyan(),
        stack.graph.len()
    );

    Ok(())
}
