//! Provisioning configuration model
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock layout: one VPC in `ap-southeast-2` with a public and a private
//! subnet, an SSH-only security group pair and a single `t2.micro` host.

use crate::cidr::Ipv4Cidr;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration passed to the provisioner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionConfig {
    /// Path of the credential file (`~/` is expanded)
    pub credentials: PathBuf,

    /// Provider region
    pub region: String,

    /// Classification tag applied to every created resource
    pub tag: TagConfig,

    pub network: NetworkConfig,

    pub security: SecurityConfig,

    pub instance: InstanceConfig,

    /// Status polling bounds for the interface and instance waits
    pub poll: PollSettings,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            credentials: PathBuf::from("~/.aws/cred.yml"),
            region: "ap-southeast-2".to_string(),
            tag: TagConfig::default(),
            network: NetworkConfig::default(),
            security: SecurityConfig::default(),
            instance: InstanceConfig::default(),
            poll: PollSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagConfig {
    pub key: String,
    pub value: String,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            key: "Role".to_string(),
            value: "GenericUnixHost".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub vpc_cidr: String,

    /// Destination of the default route added to the main route table
    pub default_route_cidr: String,

    pub public_subnet: SubnetConfig,

    pub private_subnet: SubnetConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            vpc_cidr: "10.0.0.0/16".to_string(),
            default_route_cidr: "0.0.0.0/0".to_string(),
            public_subnet: SubnetConfig {
                cidr: "10.0.0.0/24".to_string(),
                availability_zone: "ap-southeast-2a".to_string(),
            },
            private_subnet: SubnetConfig {
                cidr: "10.0.1.0/24".to_string(),
                availability_zone: "ap-southeast-2b".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubnetConfig {
    pub cidr: String,
    pub availability_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    pub public_group: GroupConfig,

    pub private_group: GroupConfig,

    /// TCP port opened on both groups
    pub ssh_port: u16,

    /// Source range allowed into the public group
    pub public_ingress_cidr: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            public_group: GroupConfig::named("public"),
            private_group: GroupConfig::named("private"),
            ssh_port: 22,
            public_ingress_cidr: "0.0.0.0/0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub name: String,

    /// Defaults to the group name
    #[serde(default)]
    pub description: Option<String>,
}

impl GroupConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceConfig {
    pub availability_zone: String,
    pub instance_type: String,
    pub image_id: String,
    pub key_name: String,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            availability_zone: "ap-southeast-2a".to_string(),
            instance_type: "t2.micro".to_string(),
            // Amazon Linux 64 bit PV EBS
            image_id: "ami-d9fe9be3".to_string(),
            key_name: "vpcflow".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    /// Fixed delay between status checks
    pub interval_secs: u64,

    /// Upper bound on status checks per wait
    pub max_attempts: u32,

    /// Optional wall-clock deadline per wait
    pub timeout_secs: Option<u64>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: 2,
            max_attempts: 150,
            timeout_secs: None,
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl ProvisionConfig {
    /// Parse a YAML document; missing keys fall back to defaults
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Credential file path with a leading `~/` expanded to the home directory
    pub fn credentials_path(&self) -> PathBuf {
        expand_home(&self.credentials)
    }

    /// Check the layout for values the provider would reject
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::invalid("region", "空にできません"));
        }

        if self.tag.key.trim().is_empty() {
            return Err(ConfigError::invalid("tag.key", "空にできません"));
        }

        let vpc = parse_cidr("network.vpc_cidr", &self.network.vpc_cidr)?;
        parse_cidr(
            "network.default_route_cidr",
            &self.network.default_route_cidr,
        )?;
        parse_cidr(
            "security.public_ingress_cidr",
            &self.security.public_ingress_cidr,
        )?;

        let subnets = [
            ("network.public_subnet", &self.network.public_subnet),
            ("network.private_subnet", &self.network.private_subnet),
        ];
        let mut blocks = Vec::with_capacity(subnets.len());
        for (field, subnet) in subnets {
            let block = parse_cidr(&format!("{field}.cidr"), &subnet.cidr)?;
            if !vpc.contains(&block) {
                return Err(ConfigError::invalid(
                    format!("{field}.cidr"),
                    format!("{} は VPC の範囲 {} に含まれていません", block, vpc),
                ));
            }
            self.check_zone(&format!("{field}.availability_zone"), &subnet.availability_zone)?;
            blocks.push(block);
        }
        if blocks[0].overlaps(&blocks[1]) {
            return Err(ConfigError::invalid(
                "network.private_subnet.cidr",
                format!("{} と {} が重複しています", blocks[0], blocks[1]),
            ));
        }

        let public = &self.security.public_group.name;
        let private = &self.security.private_group.name;
        if public.trim().is_empty() || private.trim().is_empty() {
            return Err(ConfigError::invalid("security", "グループ名は空にできません"));
        }
        if public == private {
            return Err(ConfigError::invalid(
                "security.private_group.name",
                format!("public グループと同じ名前 '{}' は使えません", private),
            ));
        }
        if self.security.ssh_port == 0 {
            return Err(ConfigError::invalid("security.ssh_port", "0 は使えません"));
        }

        self.check_zone("instance.availability_zone", &self.instance.availability_zone)?;
        if self.instance.availability_zone != self.network.public_subnet.availability_zone {
            return Err(ConfigError::invalid(
                "instance.availability_zone",
                format!(
                    "インスタンスは public サブネットのゾーン {} に配置する必要があります",
                    self.network.public_subnet.availability_zone
                ),
            ));
        }
        for (field, value) in [
            ("instance.instance_type", &self.instance.instance_type),
            ("instance.image_id", &self.instance.image_id),
            ("instance.key_name", &self.instance.key_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(field, "空にできません"));
            }
        }

        if self.poll.max_attempts == 0 {
            return Err(ConfigError::invalid("poll.max_attempts", "1 以上を指定してください"));
        }

        Ok(())
    }

    fn check_zone(&self, field: &str, zone: &str) -> Result<()> {
        if !zone.starts_with(&self.region) || zone.len() == self.region.len() {
            return Err(ConfigError::invalid(
                field,
                format!("ゾーン '{}' はリージョン '{}' に属していません", zone, self.region),
            ));
        }
        Ok(())
    }
}

fn parse_cidr(field: &str, value: &str) -> Result<Ipv4Cidr> {
    value
        .parse()
        .map_err(|reason: String| ConfigError::invalid(field, reason))
}

/// Expand a leading `~/` using the current user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
