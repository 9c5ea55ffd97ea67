use crate::commands::{load_config, warn_task_size};
use colored::Colorize;
use ondemand_stack::{Branches, LoggingBranch, NetworkBranch, NotificationBranch};
use std::path::Path;

pub fn handle(env_file: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let config = load_config(env_file);
    let profile = ondemand_stack::select(config.minecraft_edition);
    let branches = Branches::from_config(&config);

    println!("{}", "✓ 設定は正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  サーバー名: {}", config.server_hostname().cyan());
    println!("  リージョン: {}", config.server_region);
    println!(
        "  エディション: {} ({} {}/{})",
        config.minecraft_edition.to_string().cyan(),
        profile.image,
        profile.port,
        profile.transport
    );
    println!(
        "  タスク: cpu {} / memory {} MiB ({})",
        config.task_cpu,
        config.task_memory,
        branches.capacity.as_str()
    );

    let network = match &branches.network {
        NetworkBranch::CreateIsolated => "新規作成".to_string(),
        NetworkBranch::Existing { vpc_id } => format!("既存 ({})", vpc_id),
    };
    println!("  VPC: {}", network);

    let notification = match &branches.notification {
        NotificationBranch::Disabled => "無効".to_string(),
        NotificationBranch::Email { address } => address.clone(),
    };
    println!("  通知: {}", notification);

    let logging = match branches.logging {
        LoggingBranch::Disabled => "無効".to_string(),
        LoggingBranch::CloudWatch { retention_days } => format!("{}日間保持", retention_days),
    };
    println!("  ログ: {}", logging);
    println!(
        "  起動待ち / 停止まで: {}分 / {}分",
        config.startup_minutes, config.shutdown_minutes
    );

    warn_task_size(&config);

    Ok(())
}
