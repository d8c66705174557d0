//! Cloud provider trait definition

use crate::error::Result;
use crate::state::ResourceStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Cloud provider abstraction trait
///
/// One method per management API call the provisioner issues. Identifiers are
/// the provider's opaque resource IDs.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "aws-ec2")
    fn name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Availability zone names in the configured region
    async fn availability_zones(&self) -> Result<Vec<String>>;

    async fn create_vpc(&self, cidr: &str) -> Result<String>;

    async fn create_internet_gateway(&self) -> Result<String>;

    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()>;

    /// The route table created implicitly with the network
    async fn main_route_table(&self, vpc_id: &str) -> Result<String>;

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        gateway_id: &str,
    ) -> Result<()>;

    async fn create_subnet(&self, vpc_id: &str, cidr: &str, availability_zone: &str)
    -> Result<String>;

    async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> Result<String>;

    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()>;

    async fn create_network_interface(&self, subnet_id: &str, group_id: &str) -> Result<String>;

    async fn network_interface_status(&self, interface_id: &str) -> Result<ResourceStatus>;

    /// Allocate a VPC-scoped public address
    async fn allocate_address(&self) -> Result<Allocation>;

    /// Returns the association ID
    async fn associate_address(&self, allocation_id: &str, interface_id: &str) -> Result<String>;

    /// Launch exactly one instance; returns its ID
    async fn run_instance(&self, spec: &InstanceSpec) -> Result<String>;

    async fn instance_status(&self, instance_id: &str) -> Result<ResourceStatus>;

    async fn create_tag(&self, resource_id: &str, tag: &Tag) -> Result<()>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/region information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// A key/value resource tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl From<&vpcflow_config::TagConfig> for Tag {
    fn from(config: &vpcflow_config::TagConfig) -> Self {
        Self::new(&config.key, &config.value)
    }
}

/// Where inbound traffic may come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngressSource {
    /// An address range, e.g. `0.0.0.0/0`
    Cidr(String),
    /// Members of another security group
    Group(String),
}

impl std::fmt::Display for IngressSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngressSource::Cidr(cidr) => write!(f, "{}", cidr),
            IngressSource::Group(id) => write!(f, "group {}", id),
        }
    }
}

/// An inbound rule on a single port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: String,
    pub port: u16,
    pub source: IngressSource,
}

impl IngressRule {
    pub fn tcp(port: u16, source: IngressSource) -> Self {
        Self {
            protocol: "tcp".to_string(),
            port,
            source,
        }
    }
}

/// Parameters of the single instance launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub availability_zone: String,
    pub instance_type: String,
    pub image_id: String,
    pub key_name: String,
    /// Pre-created interface attached at device index 0
    pub network_interface_id: String,
}

/// A newly allocated public address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub allocation_id: String,
    pub public_ip: String,
}
