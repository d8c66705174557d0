use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vpcflow_cloud::{
    Allocation, AuthStatus, CloudError, CloudProvider, IngressRule, InstanceSpec, PollConfig,
    ResourceStatus, Result, Tag,
};

pub const PUBLIC_IP: &str = "203.0.113.10";

/// Shared, ordered record of provider calls and printed lines
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// In-memory provider that records every call in order
pub struct FakeProvider {
    log: EventLog,
    counters: Mutex<HashMap<&'static str, u32>>,
    seen: Mutex<HashMap<&'static str, u32>>,
    interface_statuses: Mutex<VecDeque<ResourceStatus>>,
    instance_statuses: Mutex<VecDeque<ResourceStatus>>,
    fail_at: Option<(&'static str, u32)>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            counters: Mutex::new(HashMap::new()),
            seen: Mutex::new(HashMap::new()),
            interface_statuses: Mutex::new(VecDeque::new()),
            instance_statuses: Mutex::new(VecDeque::new()),
            fail_at: None,
        }
    }

    /// Fail the `occurrence`-th call (1-based) to `operation`
    pub fn failing_at(mut self, operation: &'static str, occurrence: u32) -> Self {
        self.fail_at = Some((operation, occurrence));
        self
    }

    /// Statuses returned by successive interface checks; "available" once exhausted
    pub fn with_interface_statuses(self, statuses: &[ResourceStatus]) -> Self {
        self.interface_statuses
            .lock()
            .unwrap()
            .extend(statuses.iter().copied());
        self
    }

    /// Statuses returned by successive instance checks; "running" once exhausted
    pub fn with_instance_statuses(self, statuses: &[ResourceStatus]) -> Self {
        self.instance_statuses
            .lock()
            .unwrap()
            .extend(statuses.iter().copied());
        self
    }

    pub fn log(&self) -> EventLog {
        Arc::clone(&self.log)
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Number of recorded calls to `operation`
    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count()
    }

    /// A writer that appends flushed output to this provider's log
    pub fn writer(&self) -> LogWriter {
        LogWriter {
            log: self.log(),
            buffer: Vec::new(),
        }
    }

    fn record(&self, operation: &'static str, detail: String) -> Result<()> {
        let entry = if detail.is_empty() {
            operation.to_string()
        } else {
            format!("{} {}", operation, detail)
        };
        self.log.lock().unwrap().push(entry);

        let mut seen = self.seen.lock().unwrap();
        let count = seen.entry(operation).or_insert(0);
        *count += 1;

        match self.fail_at {
            Some((op, occurrence)) if op == operation && occurrence == *count => {
                Err(CloudError::Api {
                    operation,
                    code: Some("InjectedFailure".to_string()),
                    message: format!("{} call #{} rejected", operation, occurrence),
                    hint: None,
                })
            }
            _ => Ok(()),
        }
    }

    fn next_id(&self, prefix: &'static str) -> String {
        let mut counters = self.counters.lock().unwrap();
        let n = counters.entry(prefix).or_insert(0);
        *n += 1;
        format!("{}-{}", prefix, n)
    }
}

#[async_trait]
impl CloudProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok("fake-region"))
    }

    async fn availability_zones(&self) -> Result<Vec<String>> {
        Ok(vec![
            "ap-southeast-2a".to_string(),
            "ap-southeast-2b".to_string(),
        ])
    }

    async fn create_vpc(&self, cidr: &str) -> Result<String> {
        self.record("create_vpc", cidr.to_string())?;
        Ok(self.next_id("vpc"))
    }

    async fn create_internet_gateway(&self) -> Result<String> {
        self.record("create_internet_gateway", String::new())?;
        Ok(self.next_id("igw"))
    }

    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        self.record(
            "attach_internet_gateway",
            format!("{} {}", gateway_id, vpc_id),
        )
    }

    async fn main_route_table(&self, vpc_id: &str) -> Result<String> {
        self.record("main_route_table", vpc_id.to_string())?;
        Ok(self.next_id("rtb"))
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        gateway_id: &str,
    ) -> Result<()> {
        self.record(
            "create_route",
            format!("{} {} {}", route_table_id, destination_cidr, gateway_id),
        )
    }

    async fn create_subnet(
        &self,
        vpc_id: &str,
        cidr: &str,
        availability_zone: &str,
    ) -> Result<String> {
        self.record(
            "create_subnet",
            format!("{} {} {}", vpc_id, cidr, availability_zone),
        )?;
        Ok(self.next_id("subnet"))
    }

    async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> Result<String> {
        self.record(
            "create_security_group",
            format!("{} '{}' {}", name, description, vpc_id),
        )?;
        Ok(self.next_id("sg"))
    }

    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()> {
        self.record(
            "authorize_ingress",
            format!("{} {}/{} {}", group_id, rule.protocol, rule.port, rule.source),
        )
    }

    async fn create_network_interface(&self, subnet_id: &str, group_id: &str) -> Result<String> {
        self.record(
            "create_network_interface",
            format!("{} {}", subnet_id, group_id),
        )?;
        Ok(self.next_id("eni"))
    }

    async fn network_interface_status(&self, interface_id: &str) -> Result<ResourceStatus> {
        self.record("network_interface_status", interface_id.to_string())?;
        Ok(self
            .interface_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ResourceStatus::Available))
    }

    async fn allocate_address(&self) -> Result<Allocation> {
        self.record("allocate_address", String::new())?;
        Ok(Allocation {
            allocation_id: self.next_id("eipalloc"),
            public_ip: PUBLIC_IP.to_string(),
        })
    }

    async fn associate_address(&self, allocation_id: &str, interface_id: &str) -> Result<String> {
        self.record(
            "associate_address",
            format!("{} {}", allocation_id, interface_id),
        )?;
        Ok(self.next_id("eipassoc"))
    }

    async fn run_instance(&self, spec: &InstanceSpec) -> Result<String> {
        self.record(
            "run_instance",
            format!(
                "{} {} {} {} {}",
                spec.image_id,
                spec.instance_type,
                spec.availability_zone,
                spec.key_name,
                spec.network_interface_id
            ),
        )?;
        Ok(self.next_id("i"))
    }

    async fn instance_status(&self, instance_id: &str) -> Result<ResourceStatus> {
        self.record("instance_status", instance_id.to_string())?;
        Ok(self
            .instance_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ResourceStatus::Running))
    }

    async fn create_tag(&self, resource_id: &str, tag: &Tag) -> Result<()> {
        self.record(
            "create_tag",
            format!("{} {}={}", resource_id, tag.key, tag.value),
        )
    }
}

/// Buffers writes and appends `print <text>` to the log on flush
pub struct LogWriter {
    log: EventLog,
    buffer: Vec<u8>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let text = String::from_utf8_lossy(&self.buffer).into_owned();
            self.log.lock().unwrap().push(format!("print {}", text));
            self.buffer.clear();
        }
        Ok(())
    }
}

/// A writer whose every write fails
pub struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Poll bounds that never sleep
pub fn fast_poll(max_attempts: u32) -> PollConfig {
    PollConfig {
        interval: Duration::ZERO,
        max_attempts,
        deadline: None,
    }
}
