mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vpcflow")]
#[command(about = "ネットワークから公開ホストまで、一度で組み上げる。", long_about = None)]
struct Cli {
    /// 設定ファイルのパス (VPCFLOW_CONFIG_PATH 環境変数)
    #[arg(short, long, global = true, env = "VPCFLOW_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// 認証情報ファイルのパス (設定ファイルの credentials を上書き)
    #[arg(long, global = true, env = "VPCFLOW_CREDENTIALS")]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// VPC・サブネット・セキュリティグループを作成し、インスタンスを起動
    /// 割り当てたパブリック IP を標準出力に1行で出力する
    Up,
    /// 実行されるステップを表示（API は呼び出さない）
    Plan,
    /// 設定ファイルと認証情報ファイルを検証
    Validate,
    /// 認証情報とアベイラビリティゾーンを確認
    Check,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdoutはパブリックIPの出力に使うので、ログはstderrに出力
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("vpcflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let loaded = commands::load(cli.config.as_deref(), cli.credentials);

    match cli.command {
        Commands::Up => commands::up::handle(&loaded).await?,
        Commands::Plan => commands::plan::handle(&loaded),
        Commands::Validate => commands::validate::handle(&loaded)?,
        Commands::Check => commands::check::handle(&loaded).await?,
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
