pub mod cidr;
pub mod credentials;
pub mod error;
pub mod model;

pub use cidr::Ipv4Cidr;
pub use credentials::Credentials;
pub use error::*;
pub use model::{
    GroupConfig, InstanceConfig, NetworkConfig, PollSettings, ProvisionConfig, SecurityConfig,
    SubnetConfig, TagConfig, expand_home,
};

use std::path::{Path, PathBuf};

/// Environment variable that points directly at a config file
pub const CONFIG_PATH_ENV: &str = "VPCFLOW_CONFIG_PATH";

const CANDIDATES: [&str; 4] = [
    "vpcflow.local.yaml",
    ".vpcflow.local.yaml",
    "vpcflow.yaml",
    ".vpcflow.yaml",
];

/// 設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 VPCFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: vpcflow.local.yaml, .vpcflow.local.yaml, vpcflow.yaml, .vpcflow.yaml
/// 3. ./.vpcflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/vpcflow/vpcflow.yaml (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.vpcflow/ ディレクトリで検索
    let local_dir = current_dir.join(".vpcflow");
    if local_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = local_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル (~/.config/vpcflow/vpcflow.yaml)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("vpcflow").join("vpcflow.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// A parsed configuration and the file it came from, if any
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ProvisionConfig,
    pub source: Option<PathBuf>,
}

/// Load the effective configuration
///
/// An explicit path must exist. Without one, discovery runs and falls back to
/// the built-in defaults when no file is found.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) if path.exists() => path.to_path_buf(),
        Some(path) => return Err(ConfigError::ExplicitConfigMissing(path.to_path_buf())),
        None => match find_config_file() {
            Ok(path) => path,
            Err(ConfigError::ConfigFileNotFound) => {
                tracing::debug!("No config file found, using built-in defaults");
                return Ok(LoadedConfig {
                    config: ProvisionConfig::default(),
                    source: None,
                });
            }
            Err(e) => return Err(e),
        },
    };

    let config = load_config_file(&path)?;
    tracing::debug!(path = %path.display(), "Loaded config");
    Ok(LoadedConfig {
        config,
        source: Some(path),
    })
}

/// Parse a single config file
pub fn load_config_file(path: &Path) -> Result<ProvisionConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    ProvisionConfig::from_yaml(&content).map_err(|source| ConfigError::ConfigMalformed {
        path: path.to_path_buf(),
        source,
    })
}
