mod common;

use common::{BrokenPipe, FakeProvider, PUBLIC_IP, fast_poll};
use vpcflow_cloud::{
    CloudError, ProvisionError, Provisioner, ResourceKind, ResourceStatus, Step, load_credentials,
};
use vpcflow_config::{ConfigError, ProvisionConfig};

const TAG: &str = "Role=GenericUnixHost";

/// Run with fast polling and return what was printed
async fn run(provider: &FakeProvider, config: &ProvisionConfig) -> Result<String, ProvisionError> {
    let mut out = Vec::new();
    let outcome = Provisioner::new(provider, config)
        .with_poll(fast_poll(5))
        .run(&mut out)
        .await?;
    assert_eq!(outcome.public_ip, PUBLIC_IP);
    Ok(String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_full_run_issues_calls_in_order() {
    let provider = FakeProvider::new();
    let config = ProvisionConfig::default();
    let mut writer = provider.writer();

    let outcome = Provisioner::new(&provider, &config)
        .with_poll(fast_poll(5))
        .run(&mut writer)
        .await
        .unwrap();

    let expected = vec![
        "create_vpc 10.0.0.0/16".to_string(),
        format!("create_tag vpc-1 {}", TAG),
        "create_internet_gateway".to_string(),
        format!("create_tag igw-1 {}", TAG),
        "attach_internet_gateway igw-1 vpc-1".to_string(),
        "main_route_table vpc-1".to_string(),
        format!("create_tag rtb-1 {}", TAG),
        "create_route rtb-1 0.0.0.0/0 igw-1".to_string(),
        "create_subnet vpc-1 10.0.0.0/24 ap-southeast-2a".to_string(),
        format!("create_tag subnet-1 {}", TAG),
        "create_subnet vpc-1 10.0.1.0/24 ap-southeast-2b".to_string(),
        format!("create_tag subnet-2 {}", TAG),
        "create_security_group public 'public' vpc-1".to_string(),
        format!("create_tag sg-1 {}", TAG),
        "create_security_group private 'private' vpc-1".to_string(),
        format!("create_tag sg-2 {}", TAG),
        "authorize_ingress sg-1 tcp/22 0.0.0.0/0".to_string(),
        "authorize_ingress sg-2 tcp/22 group sg-1".to_string(),
        "create_network_interface subnet-1 sg-1".to_string(),
        "network_interface_status eni-1".to_string(),
        format!("create_tag eni-1 {}", TAG),
        "allocate_address".to_string(),
        "associate_address eipalloc-1 eni-1".to_string(),
        format!("print {}\n", PUBLIC_IP),
        "run_instance ami-d9fe9be3 t2.micro ap-southeast-2a vpcflow eni-1".to_string(),
        format!("create_tag i-1 {}", TAG),
        "instance_status i-1".to_string(),
    ];
    assert_eq!(provider.calls(), expected);

    assert_eq!(outcome.public_ip, PUBLIC_IP);
    assert_eq!(outcome.interface_id, "eni-1");
    assert_eq!(outcome.instance_id, "i-1");
}

#[tokio::test]
async fn test_ledger_lists_created_resources() {
    let provider = FakeProvider::new();
    let config = ProvisionConfig::default();
    let mut out = Vec::new();

    let outcome = Provisioner::new(&provider, &config)
        .with_poll(fast_poll(5))
        .run(&mut out)
        .await
        .unwrap();

    let kinds: Vec<ResourceKind> = outcome.resources.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        [
            ResourceKind::Vpc,
            ResourceKind::InternetGateway,
            ResourceKind::Subnet,
            ResourceKind::Subnet,
            ResourceKind::SecurityGroup,
            ResourceKind::SecurityGroup,
            ResourceKind::NetworkInterface,
            ResourceKind::Address,
            ResourceKind::Instance,
        ]
    );

    let resources = &outcome.resources;
    assert_eq!(resources.get("eni-1").unwrap().status, ResourceStatus::Available);
    assert_eq!(resources.get("eipalloc-1").unwrap().status, ResourceStatus::InUse);
    assert_eq!(resources.get("i-1").unwrap().status, ResourceStatus::Running);
    assert_eq!(
        resources
            .get("eipalloc-1")
            .unwrap()
            .get_attribute::<String>("public_ip")
            .as_deref(),
        Some(PUBLIC_IP)
    );
}

#[tokio::test]
async fn test_every_tagged_resource_gets_one_tag_before_next_create() {
    let provider = FakeProvider::new();
    let config = ProvisionConfig::default();
    run(&provider, &config).await.unwrap();

    let calls = provider.calls();
    let tags: Vec<&String> = calls.iter().filter(|c| c.starts_with("create_tag")).collect();
    assert_eq!(tags.len(), 9);
    assert!(tags.iter().all(|t| t.ends_with(TAG)));

    for id in ["vpc-1", "igw-1", "rtb-1", "subnet-1", "subnet-2", "sg-1", "sg-2", "eni-1", "i-1"] {
        let tagged = calls
            .iter()
            .filter(|c| **c == format!("create_tag {} {}", id, TAG))
            .count();
        assert_eq!(tagged, 1, "{} should be tagged exactly once", id);
    }

    // Address is never tagged
    assert!(!calls.iter().any(|c| c.starts_with("create_tag eipalloc")));

    // Each creation is immediately followed by its tag, except the interface
    // which is tagged once it becomes available
    for (index, call) in calls.iter().enumerate() {
        let created = match call.split(' ').next() {
            Some("create_vpc") => "vpc",
            Some("create_internet_gateway") => "igw",
            Some("create_subnet") => "subnet",
            Some("create_security_group") => "sg",
            Some("run_instance") => "i",
            _ => continue,
        };
        let next = &calls[index + 1];
        assert!(
            next.starts_with(&format!("create_tag {}-", created)),
            "{} was followed by {}",
            call,
            next
        );
    }
}

#[tokio::test]
async fn test_custom_tag_is_applied() {
    let provider = FakeProvider::new();
    let mut config = ProvisionConfig::default();
    config.tag.key = "Env".to_string();
    config.tag.value = "staging".to_string();
    run(&provider, &config).await.unwrap();

    let calls = provider.calls();
    assert!(calls.contains(&"create_tag vpc-1 Env=staging".to_string()));
    assert!(!calls.iter().any(|c| c.contains(TAG)));
}

#[tokio::test]
async fn test_ingress_rules_reference_cidr_and_public_group() {
    let provider = FakeProvider::new();
    let mut config = ProvisionConfig::default();
    config.security.ssh_port = 2222;
    config.security.public_ingress_cidr = "198.51.100.0/24".to_string();
    run(&provider, &config).await.unwrap();

    let ingress: Vec<String> = provider
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("authorize_ingress"))
        .collect();
    assert_eq!(
        ingress,
        [
            "authorize_ingress sg-1 tcp/2222 198.51.100.0/24",
            "authorize_ingress sg-2 tcp/2222 group sg-1",
        ]
    );
}

#[tokio::test]
async fn test_interface_wait_checks_until_available() {
    let provider = FakeProvider::new()
        .with_interface_statuses(&[ResourceStatus::Creating, ResourceStatus::Creating]);
    let config = ProvisionConfig::default();
    run(&provider, &config).await.unwrap();

    assert_eq!(provider.count("network_interface_status"), 3);

    let calls = provider.calls();
    let last_check = calls
        .iter()
        .rposition(|c| c.starts_with("network_interface_status"))
        .unwrap();
    assert_eq!(calls[last_check + 1], format!("create_tag eni-1 {}", TAG));
}

#[tokio::test]
async fn test_instance_wait_checks_until_running() {
    let provider = FakeProvider::new().with_instance_statuses(&[
        ResourceStatus::Creating,
        ResourceStatus::Creating,
        ResourceStatus::Creating,
    ]);
    let config = ProvisionConfig::default();
    run(&provider, &config).await.unwrap();

    assert_eq!(provider.count("instance_status"), 4);
    assert_eq!(provider.calls().last().unwrap(), "instance_status i-1");
}

#[tokio::test]
async fn test_output_is_exactly_the_address() {
    let provider = FakeProvider::new();
    let config = ProvisionConfig::default();
    let printed = run(&provider, &config).await.unwrap();
    assert_eq!(printed, format!("{}\n", PUBLIC_IP));
}

#[tokio::test]
async fn test_address_printed_before_launch() {
    let provider = FakeProvider::new();
    let config = ProvisionConfig::default();
    let mut writer = provider.writer();
    Provisioner::new(&provider, &config)
        .with_poll(fast_poll(5))
        .run(&mut writer)
        .await
        .unwrap();

    let calls = provider.calls();
    let printed = calls.iter().position(|c| c.starts_with("print")).unwrap();
    let associated = calls
        .iter()
        .position(|c| c.starts_with("associate_address"))
        .unwrap();
    let launched = calls.iter().position(|c| c.starts_with("run_instance")).unwrap();
    assert!(associated < printed);
    assert!(printed < launched);
}

#[tokio::test]
async fn test_failure_stops_run_and_reports_step() {
    // (operation, occurrence, failing step, resources created before the failure)
    let cases: &[(&str, u32, Step, usize)] = &[
        ("create_vpc", 1, Step::CreateNetwork, 0),
        ("create_tag", 1, Step::CreateNetwork, 1),
        ("create_internet_gateway", 1, Step::CreateGateway, 1),
        ("attach_internet_gateway", 1, Step::CreateGateway, 2),
        ("main_route_table", 1, Step::ConfigureRouteTable, 2),
        ("create_tag", 3, Step::ConfigureRouteTable, 2),
        ("create_route", 1, Step::ConfigureRouteTable, 2),
        ("create_subnet", 1, Step::CreatePublicSubnet, 2),
        ("create_subnet", 2, Step::CreatePrivateSubnet, 3),
        ("create_security_group", 1, Step::CreatePublicGroup, 4),
        ("create_security_group", 2, Step::CreatePrivateGroup, 5),
        ("authorize_ingress", 1, Step::AuthorizeIngress, 6),
        ("authorize_ingress", 2, Step::AuthorizeIngress, 6),
        ("create_network_interface", 1, Step::CreateInterface, 6),
        ("network_interface_status", 1, Step::AwaitInterface, 7),
        ("create_tag", 8, Step::TagInterface, 7),
        ("allocate_address", 1, Step::AllocateAddress, 7),
        ("associate_address", 1, Step::AllocateAddress, 8),
        ("run_instance", 1, Step::LaunchInstance, 8),
        ("create_tag", 9, Step::LaunchInstance, 9),
        ("instance_status", 1, Step::AwaitInstance, 9),
    ];

    for &(operation, occurrence, step, created) in cases {
        let provider = FakeProvider::new().failing_at(operation, occurrence);
        let config = ProvisionConfig::default();

        let err = run(&provider, &config).await.unwrap_err();
        assert_eq!(err.step, step, "failing {} #{}", operation, occurrence);
        assert_eq!(
            err.created.len(),
            created,
            "failing {} #{}: {:?}",
            operation,
            occurrence,
            err.created.iter().map(|r| &r.id).collect::<Vec<_>>()
        );
        assert!(matches!(
            err.source,
            CloudError::Api { code: Some(ref c), .. } if c == "InjectedFailure"
        ));

        // Nothing is attempted after the failing call
        let calls = provider.calls();
        assert!(
            calls.last().unwrap().starts_with(operation),
            "failing {} #{} but last call was {}",
            operation,
            occurrence,
            calls.last().unwrap()
        );
    }
}

#[tokio::test]
async fn test_no_address_printed_when_association_fails() {
    let provider = FakeProvider::new().failing_at("associate_address", 1);
    let config = ProvisionConfig::default();
    let mut writer = provider.writer();

    let err = Provisioner::new(&provider, &config)
        .with_poll(fast_poll(5))
        .run(&mut writer)
        .await
        .unwrap_err();

    assert_eq!(err.step, Step::AllocateAddress);
    assert!(!provider.calls().iter().any(|c| c.starts_with("print")));
}

#[tokio::test]
async fn test_print_failure_stops_before_launch() {
    let provider = FakeProvider::new();
    let config = ProvisionConfig::default();

    let err = Provisioner::new(&provider, &config)
        .with_poll(fast_poll(5))
        .run(&mut BrokenPipe)
        .await
        .unwrap_err();

    assert_eq!(err.step, Step::PrintAddress);
    assert!(matches!(err.source, CloudError::Io(_)));
    assert_eq!(provider.count("run_instance"), 0);
    assert_eq!(err.created.len(), 8);
}

#[tokio::test]
async fn test_interface_wait_times_out() {
    let provider = FakeProvider::new().with_interface_statuses(&[ResourceStatus::Creating; 10]);
    let config = ProvisionConfig::default();
    let mut out = Vec::new();

    let err = Provisioner::new(&provider, &config)
        .with_poll(fast_poll(3))
        .run(&mut out)
        .await
        .unwrap_err();

    assert_eq!(err.step, Step::AwaitInterface);
    match err.source {
        CloudError::Timeout {
            ref resource,
            attempts,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert!(resource.contains("eni-1"));
        }
        ref other => panic!("Expected Timeout, got {:?}", other),
    }
    assert_eq!(provider.count("network_interface_status"), 3);
    assert_eq!(provider.count("allocate_address"), 0);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_instance_wait_times_out_after_address_printed() {
    let provider = FakeProvider::new().with_instance_statuses(&[ResourceStatus::Creating; 10]);
    let config = ProvisionConfig::default();
    let mut out = Vec::new();

    let err = Provisioner::new(&provider, &config)
        .with_poll(fast_poll(4))
        .run(&mut out)
        .await
        .unwrap_err();

    assert_eq!(err.step, Step::AwaitInstance);
    assert!(matches!(err.source, CloudError::Timeout { attempts: 4, .. }));
    assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", PUBLIC_IP));
    assert_eq!(err.created.len(), 9);
}

#[tokio::test]
async fn test_terminated_instance_fails_fast() {
    let provider = FakeProvider::new()
        .with_instance_statuses(&[ResourceStatus::Creating, ResourceStatus::Terminated]);
    let config = ProvisionConfig::default();

    let err = run(&provider, &config).await.unwrap_err();

    assert_eq!(err.step, Step::AwaitInstance);
    match err.source {
        CloudError::UnexpectedState { ref status, .. } => assert_eq!(status, "terminated"),
        ref other => panic!("Expected UnexpectedState, got {:?}", other),
    }
    assert_eq!(provider.count("instance_status"), 2);
}

#[tokio::test]
async fn test_missing_credentials_fail_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ProvisionConfig::default();
    config.credentials = dir.path().join("cred.yml");

    let err = load_credentials(&config).unwrap_err();
    assert_eq!(err.step, Step::LoadCredentials);
    assert!(err.created.is_empty());
    assert!(matches!(
        err.source,
        CloudError::Config(ConfigError::CredentialsUnreadable { .. })
    ));
}

#[tokio::test]
async fn test_credentials_loaded_from_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cred.yml");
    std::fs::write(
        &path,
        "access_key_id: AKIAEXAMPLE\nsecret_access_key: secret\n",
    )
    .unwrap();

    let mut config = ProvisionConfig::default();
    config.credentials = path;

    let credentials = load_credentials(&config).unwrap();
    assert_eq!(credentials.access_key_id, "AKIAEXAMPLE");
    assert!(credentials.session_token.is_none());
}
