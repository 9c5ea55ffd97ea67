pub mod plan;
pub mod synth;
pub mod validate;

use crate::docker;
use clap::Args;
use colored::Colorize;
use ondemand_cloud::{ParameterReader, StaticParameters};
use ondemand_cloud_aws::SsmParameterReader;
use ondemand_config::{ConfigError, StackConfig};
use ondemand_stack::constants::{
    DOMAIN_STACK_REGION, HOSTED_ZONE_PARAMETER, LAUNCHER_ROLE_ARN_PARAMETER,
};
use ondemand_stack::{ComposeOptions, ComposedStack, ErrorKind, StackComposer, StackError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// スタックを組み立てるコマンド共通の引数
#[derive(Args, Debug, Clone)]
pub struct StackArgs {
    /// AWS に接続せず、ドメインスタックのパラメータを引数で与える
    #[arg(long)]
    pub offline: bool,

    /// ホストゾーン ID（--offline 時に使用）
    #[arg(long, env = "ONDEMAND_HOSTED_ZONE_ID")]
    pub hosted_zone_id: Option<String>,

    /// ランチャー Lambda のロール ARN（--offline 時に使用）
    #[arg(long, env = "ONDEMAND_LAUNCHER_ROLE_ARN")]
    pub launcher_role_arn: Option<String>,

    /// パラメータストアの読み取りに使う AWS プロファイル
    #[arg(long)]
    pub profile: Option<String>,

    /// datapack (*.zip) を探すディレクトリ
    #[arg(long, default_value = "datapacks")]
    pub datapacks_dir: PathBuf,

    /// watchdog イメージのビルドディレクトリ
    #[arg(long, default_value = "minecraft-ecsfargate-watchdog")]
    pub watchdog_dir: PathBuf,
}

/// 入力を集めて設定を解決する
pub fn resolve_config(env_file: Option<&Path>) -> ondemand_config::Result<StackConfig> {
    let env_file = match env_file {
        Some(path) => Some(path.to_path_buf()),
        None => match ondemand_config::find_env_file() {
            Ok(path) => Some(path),
            Err(ConfigError::EnvFileNotFound) => {
                debug!("No .env file found, using process environment only");
                None
            }
            Err(e) => return Err(e),
        },
    };

    let input = ondemand_config::collect_input(env_file.as_deref())?;
    ondemand_config::resolve(&input)
}

/// 設定を解決する。失敗したらエラーを表示して終了する
pub fn load_config(env_file: Option<&Path>) -> StackConfig {
    match resolve_config(env_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            if let Some(field) = e.field() {
                eprintln!();
                eprintln!("環境変数 {} を確認してください", field.cyan());
            }
            std::process::exit(1);
        }
    }
}

/// cpu/メモリが Fargate の組み合わせ表にない場合は警告する
pub fn warn_task_size(config: &StackConfig) {
    if !ondemand_config::is_valid_task_size(config.task_cpu, config.task_memory) {
        warn!(
            cpu = config.task_cpu,
            memory = config.task_memory,
            "Task size is not a valid Fargate combination"
        );
        eprintln!(
            "{} TASK_CPU={} / TASK_MEMORY={} は Fargate で有効な組み合わせではありません",
            "⚠".yellow(),
            config.task_cpu,
            config.task_memory
        );
    }
}

fn offline_parameters(args: &StackArgs) -> StaticParameters {
    let mut parameters = StaticParameters::new();
    if let Some(id) = &args.hosted_zone_id {
        parameters.insert(DOMAIN_STACK_REGION, HOSTED_ZONE_PARAMETER, id.clone());
    }
    if let Some(arn) = &args.launcher_role_arn {
        parameters.insert(DOMAIN_STACK_REGION, LAUNCHER_ROLE_ARN_PARAMETER, arn.clone());
    }
    parameters
}

/// スタックを組み立てる。失敗したらエラーを表示して終了する
pub async fn compose(config: &StackConfig, args: &StackArgs) -> ComposedStack {
    let reader: Box<dyn ParameterReader> = if args.offline {
        Box::new(offline_parameters(args))
    } else {
        match &args.profile {
            Some(profile) => Box::new(SsmParameterReader::with_profile(profile)),
            None => Box::new(SsmParameterReader::new()),
        }
    };

    let datapacks = match ondemand_stack::assets::discover_datapacks(&args.datapacks_dir) {
        Ok(datapacks) => datapacks,
        Err(e) => report_stack_error(&e),
    };

    let options = ComposeOptions {
        watchdog_image: docker::watchdog_image(&args.watchdog_dir).await,
        datapacks,
        ..Default::default()
    };

    match StackComposer::new(config, reader.as_ref())
        .with_options(options)
        .compose()
        .await
    {
        Ok(stack) => stack,
        Err(e) => report_stack_error(&e),
    }
}

fn report_stack_error(e: &StackError) -> ! {
    let title = match e.kind() {
        ErrorKind::Validation => "✗ 設定エラー",
        ErrorKind::Lookup => "✗ パラメータの取得に失敗しました",
        ErrorKind::ProvisioningConflict => "✗ リソースの競合",
    };
    eprintln!();
    eprintln!("{}", title.red().bold());
    eprintln!("  {}", e);

    if e.kind() == ErrorKind::Lookup {
        eprintln!();
        eprintln!("{}", "解決方法:".yellow());
        eprintln!(
            "  • ドメインスタックを {} に先にデプロイしてください",
            DOMAIN_STACK_REGION.cyan()
        );
        eprintln!("  • AWS 認証情報に ssm:GetParameter の権限があるか確認してください");
        eprintln!("  • AWS に接続しない場合は --offline と --hosted-zone-id / --launcher-role-arn を指定してください");
    }
    std::process::exit(1);
}
