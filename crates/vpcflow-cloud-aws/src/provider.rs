//! EC2 provider implementation

use crate::error::api_error;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::{
    DomainType, Filter, InstanceNetworkInterfaceSpecification, InstanceStateName, InstanceType,
    IpPermission, IpRange, NetworkInterfaceStatus, Placement, Tag as Ec2Tag, UserIdGroupPair,
};
use tracing::{debug, info};
use vpcflow_cloud::{
    Allocation, AuthStatus, CloudError, CloudProvider, IngressRule, IngressSource, InstanceSpec,
    ResourceStatus, Result, Tag,
};
use vpcflow_config::Credentials;

/// Name reported to the credential chain for keys read from the credential file
const CREDENTIALS_SOURCE: &str = "vpcflow-credentials-file";

/// EC2 provider bound to one region
pub struct Ec2Provider {
    client: Client,
    region: String,
}

impl Ec2Provider {
    /// Build a client for `region` that signs with the given keys
    pub async fn connect(region: &str, credentials: &Credentials) -> Self {
        let keys = aws_sdk_ec2::config::Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            credentials.session_token.clone(),
            None,
            CREDENTIALS_SOURCE,
        );
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(keys)
            .load()
            .await;

        debug!(region = %region, "EC2 client configured");
        Self::from_client(Client::new(&config), region)
    }

    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

/// Take an identifier out of a response or fail with `MissingField`
fn required(value: Option<&str>, operation: &'static str, field: &'static str) -> Result<String> {
    value
        .map(str::to_string)
        .ok_or(CloudError::MissingField { operation, field })
}

/// Map an interface status onto the provider-neutral status
pub(crate) fn interface_status(status: Option<&NetworkInterfaceStatus>) -> ResourceStatus {
    match status {
        Some(NetworkInterfaceStatus::Available) => ResourceStatus::Available,
        Some(
            NetworkInterfaceStatus::InUse
            | NetworkInterfaceStatus::Associated
            | NetworkInterfaceStatus::Attaching
            | NetworkInterfaceStatus::Detaching,
        ) => ResourceStatus::InUse,
        None => ResourceStatus::Creating,
        Some(_) => ResourceStatus::Unknown,
    }
}

/// Map an instance state onto the provider-neutral status
pub(crate) fn instance_status(state: Option<&InstanceStateName>) -> ResourceStatus {
    match state {
        Some(InstanceStateName::Pending) | None => ResourceStatus::Creating,
        Some(InstanceStateName::Running) => ResourceStatus::Running,
        Some(InstanceStateName::Stopping | InstanceStateName::Stopped) => ResourceStatus::Stopped,
        Some(InstanceStateName::ShuttingDown | InstanceStateName::Terminated) => {
            ResourceStatus::Terminated
        }
        Some(_) => ResourceStatus::Unknown,
    }
}

fn ingress_permission(rule: &IngressRule) -> IpPermission {
    let port = i32::from(rule.port);
    let builder = IpPermission::builder()
        .ip_protocol(&rule.protocol)
        .from_port(port)
        .to_port(port);

    match &rule.source {
        IngressSource::Cidr(cidr) => builder
            .ip_ranges(IpRange::builder().cidr_ip(cidr).build())
            .build(),
        IngressSource::Group(group_id) => builder
            .user_id_group_pairs(UserIdGroupPair::builder().group_id(group_id).build())
            .build(),
    }
}

#[async_trait]
impl CloudProvider for Ec2Provider {
    fn name(&self) -> &str {
        "aws-ec2"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        match self.availability_zones().await {
            Ok(zones) => Ok(AuthStatus::ok(format!(
                "{} ({} zones)",
                self.region,
                zones.len()
            ))),
            Err(CloudError::AuthenticationFailed(message)) => Ok(AuthStatus::failed(message)),
            Err(e) => Err(e),
        }
    }

    async fn availability_zones(&self) -> Result<Vec<String>> {
        let output = self
            .client
            .describe_availability_zones()
            .send()
            .await
            .map_err(|e| api_error("DescribeAvailabilityZones", e))?;

        Ok(output
            .availability_zones()
            .iter()
            .filter_map(|zone| zone.zone_name().map(str::to_string))
            .collect())
    }

    async fn create_vpc(&self, cidr: &str) -> Result<String> {
        let output = self
            .client
            .create_vpc()
            .cidr_block(cidr)
            .send()
            .await
            .map_err(|e| api_error("CreateVpc", e))?;

        required(
            output.vpc().and_then(|vpc| vpc.vpc_id()),
            "CreateVpc",
            "vpc id",
        )
    }

    async fn create_internet_gateway(&self) -> Result<String> {
        let output = self
            .client
            .create_internet_gateway()
            .send()
            .await
            .map_err(|e| api_error("CreateInternetGateway", e))?;

        required(
            output
                .internet_gateway()
                .and_then(|gateway| gateway.internet_gateway_id()),
            "CreateInternetGateway",
            "internet gateway id",
        )
    }

    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        self.client
            .attach_internet_gateway()
            .internet_gateway_id(gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| api_error("AttachInternetGateway", e))?;
        Ok(())
    }

    async fn main_route_table(&self, vpc_id: &str) -> Result<String> {
        let output = self
            .client
            .describe_route_tables()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .filters(
                Filter::builder()
                    .name("association.main")
                    .values("true")
                    .build(),
            )
            .send()
            .await
            .map_err(|e| api_error("DescribeRouteTables", e))?;

        required(
            output
                .route_tables()
                .first()
                .and_then(|table| table.route_table_id()),
            "DescribeRouteTables",
            "main route table id",
        )
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        gateway_id: &str,
    ) -> Result<()> {
        self.client
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .gateway_id(gateway_id)
            .send()
            .await
            .map_err(|e| api_error("CreateRoute", e))?;
        Ok(())
    }

    async fn create_subnet(
        &self,
        vpc_id: &str,
        cidr: &str,
        availability_zone: &str,
    ) -> Result<String> {
        let output = self
            .client
            .create_subnet()
            .vpc_id(vpc_id)
            .cidr_block(cidr)
            .availability_zone(availability_zone)
            .send()
            .await
            .map_err(|e| api_error("CreateSubnet", e))?;

        required(
            output.subnet().and_then(|subnet| subnet.subnet_id()),
            "CreateSubnet",
            "subnet id",
        )
    }

    async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> Result<String> {
        let output = self
            .client
            .create_security_group()
            .group_name(name)
            .description(description)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| api_error("CreateSecurityGroup", e))?;

        required(output.group_id(), "CreateSecurityGroup", "group id")
    }

    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()> {
        self.client
            .authorize_security_group_ingress()
            .group_id(group_id)
            .ip_permissions(ingress_permission(rule))
            .send()
            .await
            .map_err(|e| api_error("AuthorizeSecurityGroupIngress", e))?;

        debug!(group_id = %group_id, port = rule.port, source = %rule.source, "Ingress authorized");
        Ok(())
    }

    async fn create_network_interface(&self, subnet_id: &str, group_id: &str) -> Result<String> {
        let output = self
            .client
            .create_network_interface()
            .subnet_id(subnet_id)
            .groups(group_id)
            .send()
            .await
            .map_err(|e| api_error("CreateNetworkInterface", e))?;

        required(
            output
                .network_interface()
                .and_then(|iface| iface.network_interface_id()),
            "CreateNetworkInterface",
            "network interface id",
        )
    }

    async fn network_interface_status(&self, interface_id: &str) -> Result<ResourceStatus> {
        let output = match self
            .client
            .describe_network_interfaces()
            .network_interface_ids(interface_id)
            .send()
            .await
        {
            Ok(output) => output,
            // Newly created interfaces can be briefly invisible to describe calls
            Err(e) if e.code() == Some("InvalidNetworkInterfaceID.NotFound") => {
                debug!(interface_id = %interface_id, "Interface not visible yet");
                return Ok(ResourceStatus::Creating);
            }
            Err(e) => return Err(api_error("DescribeNetworkInterfaces", e)),
        };

        Ok(interface_status(
            output
                .network_interfaces()
                .first()
                .and_then(|iface| iface.status()),
        ))
    }

    async fn allocate_address(&self) -> Result<Allocation> {
        let output = self
            .client
            .allocate_address()
            .domain(DomainType::Vpc)
            .send()
            .await
            .map_err(|e| api_error("AllocateAddress", e))?;

        Ok(Allocation {
            allocation_id: required(output.allocation_id(), "AllocateAddress", "allocation id")?,
            public_ip: required(output.public_ip(), "AllocateAddress", "public ip")?,
        })
    }

    async fn associate_address(&self, allocation_id: &str, interface_id: &str) -> Result<String> {
        let output = self
            .client
            .associate_address()
            .allocation_id(allocation_id)
            .network_interface_id(interface_id)
            .send()
            .await
            .map_err(|e| api_error("AssociateAddress", e))?;

        required(output.association_id(), "AssociateAddress", "association id")
    }

    async fn run_instance(&self, spec: &InstanceSpec) -> Result<String> {
        let output = self
            .client
            .run_instances()
            .image_id(&spec.image_id)
            .instance_type(InstanceType::from(spec.instance_type.as_str()))
            .key_name(&spec.key_name)
            .min_count(1)
            .max_count(1)
            .placement(
                Placement::builder()
                    .availability_zone(&spec.availability_zone)
                    .build(),
            )
            .network_interfaces(
                InstanceNetworkInterfaceSpecification::builder()
                    .network_interface_id(&spec.network_interface_id)
                    .device_index(0)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| api_error("RunInstances", e))?;

        let instance_id = required(
            output
                .instances()
                .first()
                .and_then(|instance| instance.instance_id()),
            "RunInstances",
            "instance id",
        )?;
        info!(
            instance_id = %instance_id,
            instance_type = %spec.instance_type,
            image_id = %spec.image_id,
            "RunInstances accepted"
        );
        Ok(instance_id)
    }

    async fn instance_status(&self, instance_id: &str) -> Result<ResourceStatus> {
        let output = match self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.code() == Some("InvalidInstanceID.NotFound") => {
                debug!(instance_id = %instance_id, "Instance not visible yet");
                return Ok(ResourceStatus::Creating);
            }
            Err(e) => return Err(api_error("DescribeInstances", e)),
        };

        let state = output
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .find(|instance| instance.instance_id() == Some(instance_id))
            .and_then(|instance| instance.state())
            .and_then(|state| state.name());
        Ok(instance_status(state))
    }

    async fn create_tag(&self, resource_id: &str, tag: &Tag) -> Result<()> {
        self.client
            .create_tags()
            .resources(resource_id)
            .tags(Ec2Tag::builder().key(&tag.key).value(&tag.value).build())
            .send()
            .await
            .map_err(|e| api_error("CreateTags", e))?;

        debug!(resource_id = %resource_id, key = %tag.key, value = %tag.value, "Tagged");
        Ok(())
    }
}
