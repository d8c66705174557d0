pub mod check;
pub mod plan;
pub mod up;
pub mod validate;

use colored::Colorize;
use std::path::{Path, PathBuf};
use vpcflow_config::LoadedConfig;

/// 設定を読み込み、認証情報ファイルの上書きを反映する
pub fn load(config: Option<&Path>, credentials: Option<PathBuf>) -> LoadedConfig {
    let mut loaded = match vpcflow_config::load_config(config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", "✗ 設定ファイルを読み込めません".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = credentials {
        tracing::debug!(path = %path.display(), "Credentials path overridden");
        loaded.config.credentials = path;
    }

    loaded
}

/// 設定の読み込み元を表示用に整形
pub fn source_label(loaded: &LoadedConfig) -> String {
    match &loaded.source {
        Some(path) => path.display().to_string(),
        None => "(組み込みのデフォルト)".to_string(),
    }
}
