//! Provider access credentials read from a local YAML file
//!
//! The file is a flat mapping:
//!
//! ```yaml
//! access_key_id: AKIA...
//! secret_access_key: ...
//! session_token: ...   # optional
//! ```

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl Credentials {
    /// Read and parse the credential file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::CredentialsUnreadable {
                path: path.to_path_buf(),
                source,
            })?;

        let credentials = Self::parse(&content).map_err(|reason| {
            ConfigError::CredentialsMalformed {
                path: path.to_path_buf(),
                reason,
            }
        })?;

        tracing::debug!(path = %path.display(), "Loaded credentials");
        Ok(credentials)
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let credentials: Credentials = serde_yaml::from_str(content).map_err(|e| e.to_string())?;

        if credentials.access_key_id.trim().is_empty() {
            return Err("access_key_id が空です".to_string());
        }
        if credentials.secret_access_key.trim().is_empty() {
            return Err("secret_access_key が空です".to_string());
        }
        Ok(credentials)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .finish()
    }
}
