//! In-memory record of the resources created during a run
//!
//! Nothing here is persisted. The ledger exists so that a caller can report
//! what was left behind in the account when a run stops part-way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of a provisioned resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Vpc,
    InternetGateway,
    RouteTable,
    Subnet,
    SecurityGroup,
    NetworkInterface,
    Address,
    Instance,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Vpc => write!(f, "vpc"),
            ResourceKind::InternetGateway => write!(f, "internet-gateway"),
            ResourceKind::RouteTable => write!(f, "route-table"),
            ResourceKind::Subnet => write!(f, "subnet"),
            ResourceKind::SecurityGroup => write!(f, "security-group"),
            ResourceKind::NetworkInterface => write!(f, "network-interface"),
            ResourceKind::Address => write!(f, "address"),
            ResourceKind::Instance => write!(f, "instance"),
        }
    }
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Provider-specific resource ID
    pub id: String,

    pub kind: ResourceKind,

    /// Last observed status
    pub status: ResourceStatus,

    /// Resource attributes (CIDR, zone, IP, ...)
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the resource was recorded
    pub created_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            status: ResourceStatus::Unknown,
            attributes: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Status of a resource as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Resource is being created
    Creating,
    /// Resource exists and can be attached
    Available,
    /// Resource is attached to something else
    InUse,
    /// Resource is running/active
    Running,
    /// Resource is stopping or stopped
    Stopped,
    /// Resource is shutting down or gone
    Terminated,
    /// Status is unknown
    Unknown,
}

impl ResourceStatus {
    /// States a resource cannot leave on its own towards available/running
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResourceStatus::Stopped | ResourceStatus::Terminated)
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Creating => write!(f, "creating"),
            ResourceStatus::Available => write!(f, "available"),
            ResourceStatus::InUse => write!(f, "in-use"),
            ResourceStatus::Running => write!(f, "running"),
            ResourceStatus::Stopped => write!(f, "stopped"),
            ResourceStatus::Terminated => write!(f, "terminated"),
            ResourceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Ordered list of resources created during one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceLedger {
    resources: Vec<ResourceState>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, resource: ResourceState) {
        tracing::debug!(kind = %resource.kind, id = %resource.id, "Recorded resource");
        self.resources.push(resource);
    }

    /// Update the status of a recorded resource
    pub fn set_status(&mut self, id: &str, status: ResourceStatus) {
        if let Some(resource) = self.resources.iter_mut().find(|r| r.id == id) {
            resource.status = status;
        }
    }

    pub fn get(&self, id: &str) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn by_kind(&self, kind: ResourceKind) -> Vec<&ResourceState> {
        self.resources.iter().filter(|r| r.kind == kind).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceState> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn into_vec(self) -> Vec<ResourceState> {
        self.resources
    }
}
