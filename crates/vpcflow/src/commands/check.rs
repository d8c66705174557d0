use colored::Colorize;
use vpcflow_cloud::{CloudProvider, load_credentials};
use vpcflow_cloud_aws::Ec2Provider;
use vpcflow_config::LoadedConfig;

pub async fn handle(loaded: &LoadedConfig) -> anyhow::Result<()> {
    let config = &loaded.config;
    println!("{}", "認証情報を確認中...".blue());

    let credentials = match load_credentials(config) {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 認証情報エラー".red().bold());
            eprintln!("  {}", e.source);
            std::process::exit(1);
        }
    };

    let provider = Ec2Provider::connect(&config.region, &credentials).await;
    let auth = provider.check_auth().await?;
    if !auth.authenticated {
        eprintln!();
        eprintln!("{}", "✗ 認証に失敗しました".red().bold());
        eprintln!("  {}", auth.error.unwrap_or_default());
        std::process::exit(1);
    }
    println!(
        "{} {}",
        "✓ 認証OK:".green().bold(),
        auth.account_info.unwrap_or_default()
    );

    let zones = provider.availability_zones().await?;
    let wanted = [
        ("public サブネット", &config.network.public_subnet.availability_zone),
        ("private サブネット", &config.network.private_subnet.availability_zone),
        ("インスタンス", &config.instance.availability_zone),
    ];

    let mut missing = 0;
    for (label, zone) in wanted {
        if zones.iter().any(|z| z == zone) {
            println!("  ✓ {}: {}", label, zone.cyan());
        } else {
            println!(
                "  {} {}: {} はリージョン {} に存在しません",
                "✗".red(),
                label,
                zone,
                config.region
            );
            missing += 1;
        }
    }

    if missing > 0 {
        eprintln!();
        eprintln!(
            "{}",
            format!("✗ {}個のゾーンが見つかりません", missing).red().bold()
        );
        eprintln!("利用可能なゾーン: {}", zones.join(", "));
        std::process::exit(1);
    }

    println!("{}", "✓ 準備完了".green().bold());
    Ok(())
}
