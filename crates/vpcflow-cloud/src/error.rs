//! Cloud provider error types

use crate::plan::Step;
use crate::state::ResourceState;
use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    /// The provider rejected or failed a request
    #[error("API error in {operation}{}: {message}", .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Api {
        operation: &'static str,
        code: Option<String>,
        message: String,
        /// Operator-facing advice for well-known error codes
        hint: Option<&'static str>,
    },

    /// A successful response lacked an identifier we depend on
    #[error("{operation} response did not include {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Timeout: {resource} not ready after {attempts} checks ({elapsed_secs}s)")]
    Timeout {
        resource: String,
        attempts: u32,
        elapsed_secs: u64,
    },

    #[error("{resource} entered unexpected state '{status}'")]
    UnexpectedState { resource: String, status: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] vpcflow_config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CloudError {
    /// Advice attached to an API error, if any
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CloudError::Api { hint, .. } => *hint,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// A failed provisioning run: the step that failed, why, and what already exists
#[derive(Error, Debug)]
#[error("step '{step}' failed: {source}")]
pub struct ProvisionError {
    pub step: Step,
    #[source]
    pub source: CloudError,
    /// Resources created before the failure; they are left in place
    pub created: Vec<ResourceState>,
}

impl ProvisionError {
    pub fn new(step: Step, source: impl Into<CloudError>) -> Self {
        Self {
            step,
            source: source.into(),
            created: Vec::new(),
        }
    }

    pub fn with_created(mut self, created: Vec<ResourceState>) -> Self {
        self.created = created;
        self
    }
}
