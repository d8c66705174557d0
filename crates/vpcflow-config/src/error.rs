use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: vpcflow.local.yaml, .vpcflow.local.yaml, vpcflow.yaml, .vpcflow.yaml\n\
        - ./.vpcflow/ ディレクトリ\n\
        - ~/.config/vpcflow/vpcflow.yaml\n\
        または VPCFLOW_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ConfigFileNotFound,

    #[error("指定された設定ファイルが存在しません: {}", .0.display())]
    ExplicitConfigMissing(PathBuf),

    #[error("設定ファイル {} を読み込めません: {source}", .path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("設定ファイル {} の形式が不正です: {source}", .path.display())]
    ConfigMalformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("認証情報ファイル {} を読み込めません: {source}", .path.display())]
    CredentialsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("認証情報ファイル {} の形式が不正です: {reason}", .path.display())]
    CredentialsMalformed { path: PathBuf, reason: String },

    #[error("設定値が不正です ({field}): {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
