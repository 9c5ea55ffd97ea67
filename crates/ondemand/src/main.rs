mod commands;
mod docker;

use clap::{Parser, Subcommand};
use commands::StackArgs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ondemand")]
#[command(about = "遊ぶときだけ起動する Minecraft サーバーのスタックを組み立てる", long_about = None)]
struct Cli {
    /// .env ファイルのパス（省略時は自動検出）
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// 詳細なログを出力
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 設定を検証
    Validate,
    /// 作成・参照されるリソースを表示
    Plan {
        #[command(flatten)]
        stack: StackArgs,
    },
    /// デプロイ用テンプレートを書き出す
    Synth {
        #[command(flatten)]
        stack: StackArgs,
        /// 出力ディレクトリ
        #[arg(short, long, default_value = "ondemand.out")]
        out: PathBuf,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .init();

    let env_file = cli.env_file.as_deref();

    match cli.command {
        Commands::Validate => commands::validate::handle(env_file)?,
        Commands::Plan { stack } => commands::plan::handle(env_file, &stack).await?,
        Commands::Synth { stack, out } => commands::synth::handle(env_file, &stack, &out).await?,
        Commands::Version => {
            println!("ondemand {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
