use super::source_label;
use colored::Colorize;
use vpcflow_cloud::Plan;
use vpcflow_config::LoadedConfig;

pub fn handle(loaded: &LoadedConfig) {
    let config = &loaded.config;
    let plan = Plan::for_config(config);

    println!("{}", format!("実行計画 ({})", config.region).blue().bold());
    println!("設定ファイル: {}", source_label(loaded).cyan());
    println!();

    for (index, planned) in plan.steps.iter().enumerate() {
        println!(
            "{:>3}. {} {}",
            index + 1,
            format!("{:<22}", planned.step.to_string()).cyan(),
            planned.description
        );
    }

    println!();
    println!("サマリー: {}", plan.summary());
    println!(
        "{}",
        "作成したリソースは自動では削除されません。再実行すると新しいリソースが作成されます。"
            .dimmed()
    );
}
