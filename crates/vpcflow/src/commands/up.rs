use super::source_label;
use colored::Colorize;
use vpcflow_cloud::{ProvisionError, Provisioner, load_credentials};
use vpcflow_cloud_aws::Ec2Provider;
use vpcflow_config::LoadedConfig;

// stdoutにはパブリックIPだけを出力する。進捗はすべてstderrへ
pub async fn handle(loaded: &LoadedConfig) -> anyhow::Result<()> {
    let config = &loaded.config;

    if let Err(e) = config.validate() {
        eprintln!("{}", "✗ 設定エラー".red().bold());
        eprintln!("  {}", e);
        std::process::exit(1);
    }

    eprintln!(
        "{}",
        format!("▶ {} に構築を開始します", config.region).green().bold()
    );
    eprintln!("  設定ファイル: {}", source_label(loaded).cyan());
    eprintln!(
        "  タグ: {}",
        format!("{}={}", config.tag.key, config.tag.value).cyan()
    );

    let credentials = match load_credentials(config) {
        Ok(credentials) => credentials,
        Err(e) => report_failure(&e),
    };

    let provider = Ec2Provider::connect(&config.region, &credentials).await;
    let mut stdout = std::io::stdout();

    match Provisioner::new(&provider, config).run(&mut stdout).await {
        Ok(outcome) => {
            eprintln!();
            eprintln!("{}", "✓ 構築完了".green().bold());
            eprintln!("  インスタンス: {}", outcome.instance_id.cyan());
            eprintln!("  インターフェース: {}", outcome.interface_id.cyan());
            eprintln!("  パブリックIP: {}", outcome.public_ip.cyan());
            eprintln!("  作成したリソース: {}個", outcome.resources.len());
            Ok(())
        }
        Err(e) => report_failure(&e),
    }
}

fn report_failure(e: &ProvisionError) -> ! {
    eprintln!();
    eprintln!(
        "{}",
        format!("✗ ステップ '{}' で失敗しました", e.step).red().bold()
    );
    eprintln!();
    eprintln!("{}", "原因:".yellow());
    eprintln!("  {}", e.source);

    if let Some(hint) = e.source.hint() {
        eprintln!();
        eprintln!("{}", "解決方法:".yellow());
        eprintln!("  • {}", hint);
    }

    eprintln!();
    if e.created.is_empty() {
        eprintln!("作成済みのリソースはありません");
    } else {
        eprintln!(
            "{}",
            "作成済みのリソース (削除されていません):".yellow()
        );
        for resource in &e.created {
            eprintln!(
                "  • {} {} ({})",
                resource.kind,
                resource.id.cyan(),
                resource.status
            );
        }
    }

    std::process::exit(1);
}
