//! Test doubles and common utilities for provisioning contract tests
//!
//! The doubles record every call so tests can assert on ordering and
//! arguments without a real control plane.

#![allow(dead_code)]

use elb_core::cluster::{ClusterMetadata, Tag};
use elb_core::config::ProvisionConfig;
use elb_core::definition::{ContainerDefinition, HealthCheck, PortMapping, PushDefinition, ServiceSpec};
use elb_core::error::{Error, Result};
use elb_core::provisioner::{LoadBalancerProvisioner, ProvisionEvent};
use elb_core::resolvers::FirstExposedPortResolver;
use elb_core::traits::{
    CreateLoadBalancerRequest, CreateOutcome, DnsRegistrar, HealthCheckConfig, Listener,
    LoadBalancerApi, LoadBalancerDescription, Scheme,
};
use elb_core::{CertResolver, Protocol};
use elb_core::traits::CertDecision;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const CERT_ARN: &str = "arn:aws:acm:us-east-1:123456789012:certificate/test";
pub const HOST_PORT: u16 = 32768;
pub const CONTAINER_PORT: u16 = 8080;
pub const ELB_DNS: &str = "internal-orders-1234.us-east-1.elb.amazonaws.com";

/// One call against the recording control plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Create(CreateLoadBalancerRequest),
    DeleteListeners { name: String, ports: Vec<u16> },
    CreateListeners { name: String, listeners: Vec<Listener> },
    ApplySecurityGroups { name: String, groups: Vec<String> },
    AddTags { name: String, tags: Vec<Tag> },
    AttachSubnets { name: String, subnets: Vec<String> },
    ConfigureHealthCheck { name: String, health_check: HealthCheckConfig },
    Describe { name: String },
    CreateStickinessPolicy { name: String, policy_name: String, cookie_name: String },
    SetListenerPolicies { name: String, port: u16, policies: Vec<String> },
}

impl ApiCall {
    /// Control plane operation name
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Create(_) => "CreateLoadBalancer",
            Self::DeleteListeners { .. } => "DeleteLoadBalancerListeners",
            Self::CreateListeners { .. } => "CreateLoadBalancerListeners",
            Self::ApplySecurityGroups { .. } => "ApplySecurityGroupsToLoadBalancer",
            Self::AddTags { .. } => "AddTags",
            Self::AttachSubnets { .. } => "AttachLoadBalancerToSubnets",
            Self::ConfigureHealthCheck { .. } => "ConfigureHealthCheck",
            Self::Describe { .. } => "DescribeLoadBalancers",
            Self::CreateStickinessPolicy { .. } => "CreateAppCookieStickinessPolicy",
            Self::SetListenerPolicies { .. } => "SetLoadBalancerPoliciesOfListener",
        }
    }
}

/// What the create call answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateScript {
    Created,
    AlreadyExists,
    Fail,
}

/// A control plane that records calls and answers from a script
///
/// Clones share the recorded calls.
#[derive(Clone)]
pub struct RecordingControlPlane {
    calls: Arc<Mutex<Vec<ApiCall>>>,
    create: CreateScript,
    failing_operation: Option<&'static str>,
    describe_empty: bool,
}

impl RecordingControlPlane {
    pub fn new(create: CreateScript) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            create,
            failing_operation: None,
            describe_empty: false,
        }
    }

    /// Fail the named operation (after recording it)
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing_operation = Some(operation);
        self
    }

    /// Answer describe with an empty list
    pub fn describing_nothing(mut self) -> Self {
        self.describe_empty = true;
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.calls().iter().map(ApiCall::operation).collect()
    }

    pub fn create_request(&self) -> Option<CreateLoadBalancerRequest> {
        self.calls().into_iter().find_map(|call| match call {
            ApiCall::Create(request) => Some(request),
            _ => None,
        })
    }

    pub fn health_check(&self) -> Option<HealthCheckConfig> {
        self.calls().into_iter().find_map(|call| match call {
            ApiCall::ConfigureHealthCheck { health_check, .. } => Some(health_check),
            _ => None,
        })
    }

    fn record(&self, call: ApiCall) -> Result<()> {
        let operation = call.operation();
        self.calls.lock().unwrap().push(call);
        if self.failing_operation == Some(operation) {
            return Err(Error::http(format!("{} rejected by test control plane", operation)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LoadBalancerApi for RecordingControlPlane {
    async fn create_load_balancer(&self, request: &CreateLoadBalancerRequest) -> Result<CreateOutcome> {
        self.record(ApiCall::Create(request.clone()))?;
        match self.create {
            CreateScript::Created => Ok(CreateOutcome::Created),
            CreateScript::AlreadyExists => Ok(CreateOutcome::AlreadyExists),
            CreateScript::Fail => Err(Error::http("LimitExceeded: too many load balancers")),
        }
    }

    async fn delete_listeners(&self, name: &str, ports: &[u16]) -> Result<()> {
        self.record(ApiCall::DeleteListeners {
            name: name.to_string(),
            ports: ports.to_vec(),
        })
    }

    async fn create_listeners(&self, name: &str, listeners: &[Listener]) -> Result<()> {
        self.record(ApiCall::CreateListeners {
            name: name.to_string(),
            listeners: listeners.to_vec(),
        })
    }

    async fn apply_security_groups(&self, name: &str, security_groups: &[String]) -> Result<()> {
        self.record(ApiCall::ApplySecurityGroups {
            name: name.to_string(),
            groups: security_groups.to_vec(),
        })
    }

    async fn add_tags(&self, name: &str, tags: &[Tag]) -> Result<()> {
        self.record(ApiCall::AddTags {
            name: name.to_string(),
            tags: tags.to_vec(),
        })
    }

    async fn attach_subnets(&self, name: &str, subnets: &[String]) -> Result<()> {
        self.record(ApiCall::AttachSubnets {
            name: name.to_string(),
            subnets: subnets.to_vec(),
        })
    }

    async fn configure_health_check(&self, name: &str, health_check: &HealthCheckConfig) -> Result<()> {
        self.record(ApiCall::ConfigureHealthCheck {
            name: name.to_string(),
            health_check: health_check.clone(),
        })
    }

    async fn describe_load_balancers(&self, name: &str) -> Result<Vec<LoadBalancerDescription>> {
        self.record(ApiCall::Describe {
            name: name.to_string(),
        })?;
        if self.describe_empty {
            return Ok(Vec::new());
        }
        Ok(vec![LoadBalancerDescription {
            name: name.to_string(),
            dns_name: ELB_DNS.to_string(),
            scheme: Some(Scheme::Internal),
            subnets: Vec::new(),
            security_groups: Vec::new(),
            listeners: Vec::new(),
            health_check: None,
            created_time: None,
        }])
    }

    async fn create_app_cookie_stickiness_policy(
        &self,
        name: &str,
        policy_name: &str,
        cookie_name: &str,
    ) -> Result<()> {
        self.record(ApiCall::CreateStickinessPolicy {
            name: name.to_string(),
            policy_name: policy_name.to_string(),
            cookie_name: cookie_name.to_string(),
        })
    }

    async fn set_listener_policies(&self, name: &str, port: u16, policy_names: &[String]) -> Result<()> {
        self.record(ApiCall::SetListenerPolicies {
            name: name.to_string(),
            port,
            policies: policy_names.to_vec(),
        })
    }

    fn api_name(&self) -> &'static str {
        "recording"
    }
}

/// A certificate resolver with a fixed answer
#[derive(Clone)]
pub struct FixedCertResolver {
    internet_facing: bool,
    fail: bool,
    derive_calls: Arc<Mutex<Vec<(Protocol, String, String)>>>,
}

impl FixedCertResolver {
    pub fn internal() -> Self {
        Self::new(false)
    }

    pub fn internet_facing() -> Self {
        Self::new(true)
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(false)
        }
    }

    fn new(internet_facing: bool) -> Self {
        Self {
            internet_facing,
            fail: false,
            derive_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// (protocol, url_suffix, url_prefix) of every derive_cert call
    pub fn derive_calls(&self) -> Vec<(Protocol, String, String)> {
        self.derive_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CertResolver for FixedCertResolver {
    async fn derive_cert(&self, protocol: Protocol, url_suffix: &str, url_prefix: &str) -> Result<CertDecision> {
        self.derive_calls
            .lock()
            .unwrap()
            .push((protocol, url_suffix.to_string(), url_prefix.to_string()));
        if self.fail {
            return Err(Error::resolution(format!("no certificate for {}.{}", url_prefix, url_suffix)));
        }
        Ok(CertDecision {
            certificate_arn: CERT_ARN.to_string(),
            internet_facing: self.internet_facing,
        })
    }

    fn is_internet_facing_url_scheme(&self, decision: &CertDecision, scheme_override: Option<&str>) -> bool {
        match scheme_override {
            Some("internet-facing") => true,
            Some("internal") => false,
            _ => decision.internet_facing,
        }
    }

    fn resolver_name(&self) -> &'static str {
        "fixed"
    }
}

/// One registration seen by the recording registrar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub fqdn: String,
    pub endpoint: String,
    pub resource_name: String,
    pub tags: Vec<Tag>,
}

/// A registrar that records registrations
#[derive(Clone, Default)]
pub struct RecordingRegistrar {
    registrations: Arc<Mutex<Vec<Registration>>>,
    fail: bool,
}

impl RecordingRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.registrations.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsRegistrar for RecordingRegistrar {
    async fn register_dns(
        &self,
        fqdn: &str,
        endpoint_dns_name: &str,
        resource_name: &str,
        tags: &[Tag],
    ) -> Result<()> {
        self.registrations.lock().unwrap().push(Registration {
            fqdn: fqdn.to_string(),
            endpoint: endpoint_dns_name.to_string(),
            resource_name: resource_name.to_string(),
            tags: tags.to_vec(),
        });
        if self.fail {
            return Err(Error::http("registrar unavailable"));
        }
        Ok(())
    }

    fn registrar_name(&self) -> &'static str {
        "recording"
    }
}

/// Cluster with distinct subnets and security groups for each placement
pub fn cluster() -> ClusterMetadata {
    ClusterMetadata {
        public_subnets: vec!["subnet-public-a".to_string(), "subnet-public-b".to_string()],
        elb_subnets: vec!["subnet-private-a".to_string(), "subnet-private-b".to_string()],
        elb_security_groups: vec!["sg-elb".to_string()],
        akamai_security_groups: vec!["sg-akamai-1".to_string(), "sg-akamai-2".to_string()],
        cluster_stack_tags: vec![Tag::new("Name", "prod-cluster"), Tag::new("Team", "payments")],
    }
}

/// Push definition for app "orders" under example.com
pub fn push_definition() -> PushDefinition {
    PushDefinition {
        app_name: "orders".to_string(),
        service: ServiceSpec {
            url_suffix: "example.com".to_string(),
            health_check: HealthCheck::new("/health"),
            ..ServiceSpec::default()
        },
        container_definitions: vec![ContainerDefinition {
            name: "web".to_string(),
            port_mappings: vec![PortMapping {
                container_port: CONTAINER_PORT,
                host_port: HOST_PORT,
            }],
        }],
    }
}

/// Build a provisioner from test doubles
pub fn provisioner(
    api: &RecordingControlPlane,
    cert: &FixedCertResolver,
    registrar: &RecordingRegistrar,
) -> (LoadBalancerProvisioner, mpsc::Receiver<ProvisionEvent>) {
    LoadBalancerProvisioner::new(
        Box::new(api.clone()),
        Box::new(cert.clone()),
        Box::new(FirstExposedPortResolver),
        Box::new(registrar.clone()),
        &ProvisionConfig::default(),
    )
    .expect("provisioner construction succeeds")
}

/// Drain every event currently buffered
pub fn drain(rx: &mut mpsc::Receiver<ProvisionEvent>) -> Vec<ProvisionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
