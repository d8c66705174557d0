use super::source_label;
use colored::Colorize;
use vpcflow_config::{Credentials, LoadedConfig};

pub fn handle(loaded: &LoadedConfig) -> anyhow::Result<()> {
    let config = &loaded.config;
    println!("{}", "設定を検証中...".blue());
    println!("設定ファイル: {}", source_label(loaded).cyan());

    if let Err(e) = config.validate() {
        eprintln!();
        eprintln!("{}", "✗ 設定エラー".red().bold());
        eprintln!("  {}", e);
        std::process::exit(1);
    }

    let credentials_path = config.credentials_path();
    if let Err(e) = Credentials::load(&credentials_path) {
        eprintln!();
        eprintln!("{}", "✗ 認証情報エラー".red().bold());
        eprintln!("  {}", e);
        eprintln!();
        eprintln!("--credentials または VPCFLOW_CREDENTIALS で認証情報ファイルを指定できます");
        std::process::exit(1);
    }

    let network = &config.network;
    let security = &config.security;
    let instance = &config.instance;

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  リージョン: {}", config.region.cyan());
    println!("  タグ: {}={}", config.tag.key, config.tag.value);
    println!("  VPC: {}", network.vpc_cidr.cyan());
    println!(
        "    - public  {} ({})",
        network.public_subnet.cidr, network.public_subnet.availability_zone
    );
    println!(
        "    - private {} ({})",
        network.private_subnet.cidr, network.private_subnet.availability_zone
    );
    println!(
        "  セキュリティグループ: {} / {} (tcp/{})",
        security.public_group.name.cyan(),
        security.private_group.name.cyan(),
        security.ssh_port
    );
    println!(
        "  インスタンス: {} {} (key: {})",
        instance.instance_type.cyan(),
        instance.image_id,
        instance.key_name
    );
    println!("  認証情報: {}", credentials_path.display());

    Ok(())
}
