//! The provisioning sequence
//!
//! Steps run strictly in order. The first failing call stops the run; nothing
//! is retried except the two status waits and nothing already created is
//! removed.

use crate::error::{CloudError, ProvisionError, Result};
use crate::plan::Step;
use crate::poll::{PollConfig, PollOutcome, poll_until};
use crate::provider::{CloudProvider, IngressRule, IngressSource, InstanceSpec, Tag};
use crate::state::{ResourceKind, ResourceLedger, ResourceState, ResourceStatus};
use std::future::Future;
use std::io::Write;
use tracing::info;
use vpcflow_config::{Credentials, ProvisionConfig};

/// Read the credential file named by the configuration
pub fn load_credentials(config: &ProvisionConfig) -> std::result::Result<Credentials, ProvisionError> {
    let path = config.credentials_path();
    Credentials::load(&path).map_err(|e| ProvisionError::new(Step::LoadCredentials, e))
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub public_ip: String,
    pub interface_id: String,
    pub instance_id: String,
    pub resources: ResourceLedger,
}

/// Drives a [`CloudProvider`] through the fixed step sequence
pub struct Provisioner<'a, P: CloudProvider + ?Sized> {
    provider: &'a P,
    config: &'a ProvisionConfig,
    tag: Tag,
    poll: PollConfig,
}

impl<'a, P: CloudProvider + ?Sized> Provisioner<'a, P> {
    pub fn new(provider: &'a P, config: &'a ProvisionConfig) -> Self {
        Self {
            provider,
            config,
            tag: Tag::from(&config.tag),
            poll: PollConfig::from(&config.poll),
        }
    }

    /// Override the polling bounds taken from the configuration
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Provision everything, writing the public address to `out` once associated
    pub async fn run<W: Write>(
        &self,
        out: &mut W,
    ) -> std::result::Result<ProvisionOutcome, ProvisionError> {
        info!(
            provider = self.provider.name(),
            region = %self.config.region,
            "Starting provisioning run"
        );

        let mut ledger = ResourceLedger::new();
        match self.execute(&mut ledger, out).await {
            Ok((public_ip, interface_id, instance_id)) => Ok(ProvisionOutcome {
                public_ip,
                interface_id,
                instance_id,
                resources: ledger,
            }),
            Err((step, source)) => Err(ProvisionError {
                step,
                source,
                created: ledger.into_vec(),
            }),
        }
    }

    async fn execute<W: Write>(
        &self,
        ledger: &mut ResourceLedger,
        out: &mut W,
    ) -> std::result::Result<(String, String, String), (Step, CloudError)> {
        let network = &self.config.network;
        let security = &self.config.security;

        // Network
        let vpc_id = self.create_network(ledger).await.at(Step::CreateNetwork)?;

        // Gateway: tag before attaching
        let gateway_id = async {
            let id = self.provider.create_internet_gateway().await?;
            ledger.record(
                ResourceState::new(&id, ResourceKind::InternetGateway)
                    .with_status(ResourceStatus::Available),
            );
            self.tag(&id).await?;
            self.provider.attach_internet_gateway(&id, &vpc_id).await?;
            info!(gateway_id = %id, vpc_id = %vpc_id, "Internet gateway attached");
            Ok::<_, CloudError>(id)
        }
        .await
        .at(Step::CreateGateway)?;

        // Main route table is pre-existing; tag it and add the default route
        async {
            let route_table_id = self.provider.main_route_table(&vpc_id).await?;
            self.tag(&route_table_id).await?;
            self.provider
                .create_route(&route_table_id, &network.default_route_cidr, &gateway_id)
                .await?;
            info!(
                route_table_id = %route_table_id,
                destination = %network.default_route_cidr,
                "Default route added"
            );
            Ok::<_, CloudError>(())
        }
        .await
        .at(Step::ConfigureRouteTable)?;

        let public_subnet_id = self
            .create_subnet(ledger, &vpc_id, &network.public_subnet)
            .await
            .at(Step::CreatePublicSubnet)?;
        self.create_subnet(ledger, &vpc_id, &network.private_subnet)
            .await
            .at(Step::CreatePrivateSubnet)?;

        let public_group_id = self
            .create_group(ledger, &vpc_id, &security.public_group)
            .await
            .at(Step::CreatePublicGroup)?;
        let private_group_id = self
            .create_group(ledger, &vpc_id, &security.private_group)
            .await
            .at(Step::CreatePrivateGroup)?;

        async {
            let public_rule = IngressRule::tcp(
                security.ssh_port,
                IngressSource::Cidr(security.public_ingress_cidr.clone()),
            );
            self.provider
                .authorize_ingress(&public_group_id, &public_rule)
                .await?;

            // Private group only admits members of the public group
            let private_rule =
                IngressRule::tcp(security.ssh_port, IngressSource::Group(public_group_id.clone()));
            self.provider
                .authorize_ingress(&private_group_id, &private_rule)
                .await?;
            info!(port = security.ssh_port, "Ingress rules authorized");
            Ok::<_, CloudError>(())
        }
        .await
        .at(Step::AuthorizeIngress)?;

        let interface_id = async {
            let id = self
                .provider
                .create_network_interface(&public_subnet_id, &public_group_id)
                .await?;
            ledger.record(
                ResourceState::new(&id, ResourceKind::NetworkInterface)
                    .with_status(ResourceStatus::Creating)
                    .with_attribute("subnet_id", serde_json::json!(public_subnet_id)),
            );
            info!(interface_id = %id, "Network interface created");
            Ok::<_, CloudError>(id)
        }
        .await
        .at(Step::CreateInterface)?;

        let attempts = self
            .await_status(
                format!("network interface {}", interface_id),
                ResourceStatus::Available,
                || self.provider.network_interface_status(&interface_id),
            )
            .await
            .at(Step::AwaitInterface)?;
        ledger.set_status(&interface_id, ResourceStatus::Available);
        info!(interface_id = %interface_id, attempts, "Network interface available");

        self.tag(&interface_id).await.at(Step::TagInterface)?;

        let allocation = async {
            let allocation = self.provider.allocate_address().await?;
            ledger.record(
                ResourceState::new(&allocation.allocation_id, ResourceKind::Address)
                    .with_status(ResourceStatus::Available)
                    .with_attribute("public_ip", serde_json::json!(allocation.public_ip)),
            );
            let association_id = self
                .provider
                .associate_address(&allocation.allocation_id, &interface_id)
                .await?;
            ledger.set_status(&allocation.allocation_id, ResourceStatus::InUse);
            info!(
                public_ip = %allocation.public_ip,
                association_id = %association_id,
                "Public address associated"
            );
            Ok::<_, CloudError>(allocation)
        }
        .await
        .at(Step::AllocateAddress)?;

        writeln!(out, "{}", allocation.public_ip)
            .and_then(|()| out.flush())
            .map_err(CloudError::from)
            .at(Step::PrintAddress)?;

        let instance_id = async {
            let instance = &self.config.instance;
            let spec = InstanceSpec {
                availability_zone: instance.availability_zone.clone(),
                instance_type: instance.instance_type.clone(),
                image_id: instance.image_id.clone(),
                key_name: instance.key_name.clone(),
                network_interface_id: interface_id.clone(),
            };
            let id = self.provider.run_instance(&spec).await?;
            ledger.record(
                ResourceState::new(&id, ResourceKind::Instance)
                    .with_status(ResourceStatus::Creating)
                    .with_attribute("instance_type", serde_json::json!(spec.instance_type))
                    .with_attribute("image_id", serde_json::json!(spec.image_id)),
            );
            self.tag(&id).await?;
            info!(instance_id = %id, "Instance launched");
            Ok::<_, CloudError>(id)
        }
        .await
        .at(Step::LaunchInstance)?;

        let attempts = self
            .await_status(
                format!("instance {}", instance_id),
                ResourceStatus::Running,
                || self.provider.instance_status(&instance_id),
            )
            .await
            .at(Step::AwaitInstance)?;
        ledger.set_status(&instance_id, ResourceStatus::Running);
        info!(instance_id = %instance_id, attempts, "Instance running");

        Ok((allocation.public_ip, interface_id, instance_id))
    }

    async fn create_network(&self, ledger: &mut ResourceLedger) -> Result<String> {
        let cidr = &self.config.network.vpc_cidr;
        let id = self.provider.create_vpc(cidr).await?;
        ledger.record(
            ResourceState::new(&id, ResourceKind::Vpc)
                .with_status(ResourceStatus::Available)
                .with_attribute("cidr", serde_json::json!(cidr)),
        );
        self.tag(&id).await?;
        info!(vpc_id = %id, cidr = %cidr, "VPC created");
        Ok(id)
    }

    async fn create_subnet(
        &self,
        ledger: &mut ResourceLedger,
        vpc_id: &str,
        subnet: &vpcflow_config::SubnetConfig,
    ) -> Result<String> {
        let id = self
            .provider
            .create_subnet(vpc_id, &subnet.cidr, &subnet.availability_zone)
            .await?;
        ledger.record(
            ResourceState::new(&id, ResourceKind::Subnet)
                .with_status(ResourceStatus::Available)
                .with_attribute("cidr", serde_json::json!(subnet.cidr))
                .with_attribute("availability_zone", serde_json::json!(subnet.availability_zone)),
        );
        self.tag(&id).await?;
        info!(subnet_id = %id, cidr = %subnet.cidr, zone = %subnet.availability_zone, "Subnet created");
        Ok(id)
    }

    async fn create_group(
        &self,
        ledger: &mut ResourceLedger,
        vpc_id: &str,
        group: &vpcflow_config::GroupConfig,
    ) -> Result<String> {
        let id = self
            .provider
            .create_security_group(&group.name, group.description(), vpc_id)
            .await?;
        ledger.record(
            ResourceState::new(&id, ResourceKind::SecurityGroup)
                .with_status(ResourceStatus::Available)
                .with_attribute("name", serde_json::json!(group.name)),
        );
        self.tag(&id).await?;
        info!(group_id = %id, name = %group.name, "Security group created");
        Ok(id)
    }

    async fn tag(&self, resource_id: &str) -> Result<()> {
        self.provider.create_tag(resource_id, &self.tag).await
    }

    /// Poll `fetch` until it reports `target`; terminal states fail fast
    async fn await_status<F, Fut>(
        &self,
        resource: String,
        target: ResourceStatus,
        mut fetch: F,
    ) -> Result<u32>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ResourceStatus>>,
    {
        let outcome = poll_until(&self.poll, &resource, || {
            let status = fetch();
            let resource = &resource;
            async move {
                let status = status.await?;
                if status == target {
                    return Ok(true);
                }
                if status.is_terminal() {
                    return Err(CloudError::UnexpectedState {
                        resource: resource.clone(),
                        status: status.to_string(),
                    });
                }
                Ok::<_, CloudError>(false)
            }
        })
        .await?;

        match outcome {
            PollOutcome::Ready { attempts } => Ok(attempts),
            PollOutcome::TimedOut { attempts, elapsed } => Err(CloudError::Timeout {
                resource,
                attempts,
                elapsed_secs: elapsed.as_secs(),
            }),
        }
    }
}

/// Attach the failing step to a provider error
trait AtStep<T> {
    fn at(self, step: Step) -> std::result::Result<T, (Step, CloudError)>;
}

impl<T> AtStep<T> for Result<T> {
    fn at(self, step: Step) -> std::result::Result<T, (Step, CloudError)> {
        self.map_err(|e| {
            tracing::warn!(step = %step, error = %e, "Step failed");
            (step, e)
        })
    }
}
