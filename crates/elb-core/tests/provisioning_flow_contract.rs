//! Contract Test: Fresh Provisioning Flow
//!
//! This test verifies the create path end to end against recording doubles.
//!
//! Constraints verified:
//! - Internal placement uses private subnets and registers the URL in DNS
//! - Internet-facing HTTPS placement uses only the Akamai security groups
//!   and skips DNS registration
//! - The health check is normalized against the exposed host port
//! - Calls happen in workflow order: create, health check, describe
//!
//! If this test fails, the create path is broken.

mod common;

use common::*;
use elb_core::definition::Protocol;
use elb_core::provisioner::{ProvisionEvent, ProvisionStage};
use elb_core::traits::Scheme;
use elb_core::Tag;

fn stages(events: &[ProvisionEvent]) -> Vec<ProvisionStage> {
    events
        .iter()
        .filter_map(|event| match event {
            ProvisionEvent::Stage { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn internal_service_is_created_and_registered() {
    let api = RecordingControlPlane::new(CreateScript::Created);
    let cert = FixedCertResolver::internal();
    let registrar = RecordingRegistrar::new();
    let (provisioner, mut events) = provisioner(&api, &cert, &registrar);

    let result = provisioner
        .create_load_balancer(&cluster(), &push_definition())
        .await
        .expect("provisioning succeeds");

    assert_eq!(result.container_name, "web");
    assert_eq!(result.container_port, CONTAINER_PORT);
    assert_eq!(result.load_balancer_name, "orders");

    // Protocol unset resolves to HTTPS
    assert_eq!(
        cert.derive_calls(),
        vec![(Protocol::Https, "example.com".to_string(), "orders".to_string())]
    );

    let request = api.create_request().expect("create was called");
    assert_eq!(request.name, "orders");
    assert_eq!(request.scheme, Scheme::Internal);
    assert_eq!(request.subnets, vec!["subnet-private-a", "subnet-private-b"]);
    assert_eq!(request.security_groups, vec!["sg-elb"]);
    assert_eq!(request.listeners.len(), 1);
    assert_eq!(request.listeners[0].load_balancer_port, 443);
    assert_eq!(request.listeners[0].instance_port, HOST_PORT);
    assert_eq!(request.listeners[0].ssl_certificate_id, CERT_ARN);
    assert_eq!(
        request.tags,
        vec![
            Tag::new("Cluster", "prod-cluster"),
            Tag::new("Name", "orders"),
            Tag::new("Team", "payments"),
        ]
    );

    let health_check = api.health_check().expect("health check configured");
    assert_eq!(health_check.target, format!("HTTPS:{}/health", HOST_PORT));
    assert_eq!(health_check.interval, 30);
    assert_eq!(health_check.healthy_threshold, 2);
    assert_eq!(health_check.unhealthy_threshold, 10);
    assert_eq!(health_check.timeout, 10);

    assert_eq!(
        api.operations(),
        vec!["CreateLoadBalancer", "ConfigureHealthCheck", "DescribeLoadBalancers"]
    );

    let registrations = registrar.registrations();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].fqdn, "orders.example.com");
    assert_eq!(registrations[0].endpoint, ELB_DNS);
    assert_eq!(registrations[0].resource_name, "orders");
    assert_eq!(registrations[0].tags, cluster().cluster_stack_tags);

    let events = drain(&mut events);
    assert_eq!(
        stages(&events),
        vec![
            ProvisionStage::Resolving,
            ProvisionStage::Creating,
            ProvisionStage::Created,
            ProvisionStage::HealthCheckConfigured,
            ProvisionStage::Described,
            ProvisionStage::Registered,
            ProvisionStage::Done,
        ]
    );
    assert!(events.contains(&ProvisionEvent::DnsRegistered {
        url: "https://orders.example.com".to_string(),
        endpoint: ELB_DNS.to_string(),
    }));
}

#[tokio::test]
async fn public_https_service_uses_akamai_groups_and_skips_dns() {
    let api = RecordingControlPlane::new(CreateScript::Created);
    let cert = FixedCertResolver::internet_facing();
    let registrar = RecordingRegistrar::new();
    let (provisioner, mut events) = provisioner(&api, &cert, &registrar);

    let mut definition = push_definition();
    definition.service.protocol = Some(Protocol::Https);
    definition.service.elb_source_ports = vec![443, 8443];

    provisioner
        .create_load_balancer(&cluster(), &definition)
        .await
        .expect("provisioning succeeds");

    let request = api.create_request().expect("create was called");
    assert_eq!(request.scheme, Scheme::InternetFacing);
    assert_eq!(request.subnets, vec!["subnet-public-a", "subnet-public-b"]);
    assert_eq!(request.security_groups, vec!["sg-akamai-1", "sg-akamai-2"]);
    let ports: Vec<u16> = request.listeners.iter().map(|l| l.load_balancer_port).collect();
    assert_eq!(ports, vec![443, 8443]);
    assert!(request.listeners.iter().all(|l| l.instance_port == HOST_PORT));

    assert!(registrar.registrations().is_empty());

    let events = drain(&mut events);
    assert!(stages(&events).contains(&ProvisionStage::Skipped));
    assert!(!stages(&events).contains(&ProvisionStage::Registered));
    assert!(events.contains(&ProvisionEvent::CdnEndpoint {
        raw_endpoint: format!("https://{}", ELB_DNS),
        expected_url: "https://orders.example.com".to_string(),
    }));
}

#[tokio::test]
async fn public_http_service_keeps_standard_groups() {
    let api = RecordingControlPlane::new(CreateScript::Created);
    let cert = FixedCertResolver::internet_facing();
    let registrar = RecordingRegistrar::new();
    let (provisioner, _events) = provisioner(&api, &cert, &registrar);

    let mut definition = push_definition();
    definition.service.protocol = Some(Protocol::Http);

    provisioner
        .create_load_balancer(&cluster(), &definition)
        .await
        .expect("provisioning succeeds");

    let request = api.create_request().expect("create was called");
    assert_eq!(request.scheme, Scheme::InternetFacing);
    assert_eq!(request.security_groups, vec!["sg-elb"]);
    assert_eq!(request.listeners[0].protocol, Protocol::Http);
}

#[tokio::test]
async fn elb_scheme_override_forces_public_placement() {
    let api = RecordingControlPlane::new(CreateScript::Created);
    let cert = FixedCertResolver::internal();
    let registrar = RecordingRegistrar::new();
    let (provisioner, _events) = provisioner(&api, &cert, &registrar);

    let mut definition = push_definition();
    definition.service.elb_scheme_override = Some("internet-facing".to_string());

    provisioner
        .create_load_balancer(&cluster(), &definition)
        .await
        .expect("provisioning succeeds");

    let request = api.create_request().expect("create was called");
    assert_eq!(request.scheme, Scheme::InternetFacing);
    assert!(registrar.registrations().is_empty());
}

#[tokio::test]
async fn url_overrides_shape_the_registered_name() {
    let api = RecordingControlPlane::new(CreateScript::Created);
    let cert = FixedCertResolver::internet_facing();
    let registrar = RecordingRegistrar::new();
    let (provisioner, _events) = provisioner(&api, &cert, &registrar);

    let mut definition = push_definition();
    definition.service.url_prefix_override = Some("checkout".to_string());
    definition.service.url_scheme_override = Some("internal".to_string());
    definition.service.health_check.target = "TCP".to_string();

    provisioner
        .create_load_balancer(&cluster(), &definition)
        .await
        .expect("provisioning succeeds");

    assert_eq!(cert.derive_calls()[0].2, "checkout");

    // The URL-scheme override wins over the certificate's zone
    let request = api.create_request().expect("create was called");
    assert_eq!(request.scheme, Scheme::Internal);
    assert_eq!(request.name, "orders");

    let registrations = registrar.registrations();
    assert_eq!(registrations[0].fqdn, "checkout.example.com");

    let health_check = api.health_check().expect("health check configured");
    assert_eq!(health_check.target, format!("TCP:{}", HOST_PORT));
}
