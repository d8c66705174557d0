//! The fixed provisioning sequence

use serde::{Deserialize, Serialize};
use vpcflow_config::ProvisionConfig;

/// One step of a provisioning run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    LoadCredentials,
    CreateNetwork,
    CreateGateway,
    ConfigureRouteTable,
    CreatePublicSubnet,
    CreatePrivateSubnet,
    CreatePublicGroup,
    CreatePrivateGroup,
    AuthorizeIngress,
    CreateInterface,
    AwaitInterface,
    TagInterface,
    AllocateAddress,
    PrintAddress,
    LaunchInstance,
    AwaitInstance,
}

impl Step {
    pub const ALL: [Step; 16] = [
        Step::LoadCredentials,
        Step::CreateNetwork,
        Step::CreateGateway,
        Step::ConfigureRouteTable,
        Step::CreatePublicSubnet,
        Step::CreatePrivateSubnet,
        Step::CreatePublicGroup,
        Step::CreatePrivateGroup,
        Step::AuthorizeIngress,
        Step::CreateInterface,
        Step::AwaitInterface,
        Step::TagInterface,
        Step::AllocateAddress,
        Step::PrintAddress,
        Step::LaunchInstance,
        Step::AwaitInstance,
    ];

    /// Whether this step creates a new resource in the account
    pub fn creates_resource(&self) -> bool {
        matches!(
            self,
            Step::CreateNetwork
                | Step::CreateGateway
                | Step::CreatePublicSubnet
                | Step::CreatePrivateSubnet
                | Step::CreatePublicGroup
                | Step::CreatePrivateGroup
                | Step::CreateInterface
                | Step::AllocateAddress
                | Step::LaunchInstance
        )
    }

    /// Whether this step applies the classification tag
    pub fn applies_tag(&self) -> bool {
        matches!(
            self,
            Step::CreateNetwork
                | Step::CreateGateway
                | Step::ConfigureRouteTable
                | Step::CreatePublicSubnet
                | Step::CreatePrivateSubnet
                | Step::CreatePublicGroup
                | Step::CreatePrivateGroup
                | Step::TagInterface
                | Step::LaunchInstance
        )
    }

    pub fn is_wait(&self) -> bool {
        matches!(self, Step::AwaitInterface | Step::AwaitInstance)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::LoadCredentials => "load-credentials",
            Step::CreateNetwork => "create-network",
            Step::CreateGateway => "create-gateway",
            Step::ConfigureRouteTable => "configure-route-table",
            Step::CreatePublicSubnet => "create-public-subnet",
            Step::CreatePrivateSubnet => "create-private-subnet",
            Step::CreatePublicGroup => "create-public-group",
            Step::CreatePrivateGroup => "create-private-group",
            Step::AuthorizeIngress => "authorize-ingress",
            Step::CreateInterface => "create-interface",
            Step::AwaitInterface => "await-interface",
            Step::TagInterface => "tag-interface",
            Step::AllocateAddress => "allocate-address",
            Step::PrintAddress => "print-address",
            Step::LaunchInstance => "launch-instance",
            Step::AwaitInstance => "await-instance",
        };
        write!(f, "{}", name)
    }
}

/// A step with a description rendered from the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStep {
    pub step: Step,
    pub description: String,
}

/// Plan containing every step of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlannedStep>,
}

impl Plan {
    pub fn for_config(config: &ProvisionConfig) -> Self {
        let network = &config.network;
        let security = &config.security;
        let instance = &config.instance;
        let tag = format!("{}={}", config.tag.key, config.tag.value);
        let poll = &config.poll;
        let wait_bound = match poll.timeout_secs {
            Some(timeout) => format!(
                "{}秒間隔, 最大{}回 / {}秒",
                poll.interval_secs, poll.max_attempts, timeout
            ),
            None => format!("{}秒間隔, 最大{}回", poll.interval_secs, poll.max_attempts),
        };

        let steps = Step::ALL
            .iter()
            .map(|&step| {
                let description = match step {
                    Step::LoadCredentials => format!(
                        "認証情報を {} から読み込む",
                        config.credentials.display()
                    ),
                    Step::CreateNetwork => format!(
                        "VPC {} を {} に作成してタグ {} を付与",
                        network.vpc_cidr, config.region, tag
                    ),
                    Step::CreateGateway => {
                        format!("インターネットゲートウェイを作成、タグ {} を付与して VPC にアタッチ", tag)
                    }
                    Step::ConfigureRouteTable => format!(
                        "メインルートテーブルにタグを付与し {} → ゲートウェイのルートを追加",
                        network.default_route_cidr
                    ),
                    Step::CreatePublicSubnet => format!(
                        "public サブネット {} ({}) を作成",
                        network.public_subnet.cidr, network.public_subnet.availability_zone
                    ),
                    Step::CreatePrivateSubnet => format!(
                        "private サブネット {} ({}) を作成",
                        network.private_subnet.cidr, network.private_subnet.availability_zone
                    ),
                    Step::CreatePublicGroup => format!(
                        "セキュリティグループ '{}' を作成",
                        security.public_group.name
                    ),
                    Step::CreatePrivateGroup => format!(
                        "セキュリティグループ '{}' を作成",
                        security.private_group.name
                    ),
                    Step::AuthorizeIngress => format!(
                        "'{}' に tcp/{} を {} から許可、'{}' に tcp/{} を '{}' から許可",
                        security.public_group.name,
                        security.ssh_port,
                        security.public_ingress_cidr,
                        security.private_group.name,
                        security.ssh_port,
                        security.public_group.name
                    ),
                    Step::CreateInterface => format!(
                        "public サブネットに '{}' グループのネットワークインターフェースを作成",
                        security.public_group.name
                    ),
                    Step::AwaitInterface => {
                        format!("インターフェースが available になるまで待機 ({})", wait_bound)
                    }
                    Step::TagInterface => "インターフェースにタグを付与".to_string(),
                    Step::AllocateAddress => {
                        "VPC 用パブリック IP を割り当ててインターフェースに関連付け".to_string()
                    }
                    Step::PrintAddress => "割り当てたパブリック IP を出力".to_string(),
                    Step::LaunchInstance => format!(
                        "インスタンス {} ({}, key {}) を {} に起動してタグを付与",
                        instance.instance_type,
                        instance.image_id,
                        instance.key_name,
                        instance.availability_zone
                    ),
                    Step::AwaitInstance => {
                        format!("インスタンスが running になるまで待機 ({})", wait_bound)
                    }
                };
                PlannedStep { step, description }
            })
            .collect();

        Self { steps }
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.steps.iter().filter(|s| s.step.creates_resource()).count(),
            tag: self.steps.iter().filter(|s| s.step.applies_tag()).count(),
            wait: self.steps.iter().filter(|s| s.step.is_wait()).count(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub tag: usize,
    pub wait: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to tag, {} to wait for",
            self.create, self.tag, self.wait
        )
    }
}
