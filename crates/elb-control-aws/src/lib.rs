// # AWS Classic ELB Control Plane
//
// LoadBalancerApi implementation backed by the Elastic Load Balancing
// Query API (version 2012-06-01).
//
// ## Behavior
//
// - One signed HTTP request per trait call; no retries, no caching
// - A `DuplicateLoadBalancerName` answer to CreateLoadBalancer is reported
//   as `CreateOutcome::AlreadyExists`
// - `LoadBalancerNotFound` from DescribeLoadBalancers yields an empty list
// - Every other service error becomes `Error::ControlPlane` naming the action
//
// ## Security Requirements
//
// - Credentials come from the environment only
// - The secret key and session token NEVER appear in logs
//
// ## API Reference
//
// - Classic ELB API: https://docs.aws.amazon.com/elasticloadbalancing/2012-06-01/APIReference/
// - Signature Version 4: https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_aws-signing.html

mod query;
mod sigv4;
mod xml;

pub use query::{API_VERSION, QueryRequest};
pub use sigv4::{AwsCredentials, FORM_CONTENT_TYPE, Signer};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use elb_core::config::ControlPlaneConfig;
use elb_core::traits::{
    CreateLoadBalancerRequest, CreateOutcome, HealthCheckConfig, Listener, LoadBalancerApi,
    LoadBalancerApiFactory, LoadBalancerDescription, Scheme,
};
use elb_core::{ComponentRegistry, Error, Protocol, Result, Tag};
use std::time::Duration;
use tracing::{debug, info};

/// Signing name of the service
const SERVICE: &str = "elasticloadbalancing";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Error codes meaning the load balancer name is taken
const DUPLICATE_NAME_CODES: &[&str] = &["DuplicateLoadBalancerName", "DuplicateAccessPointName"];

/// Error codes meaning the load balancer does not exist
const NOT_FOUND_CODES: &[&str] = &["LoadBalancerNotFound", "AccessPointNotFound"];

/// Regional endpoint for Classic ELB
pub fn default_endpoint(region: &str) -> String {
    format!("https://{}.{}.amazonaws.com/", SERVICE, region)
}

/// Error returned by the service itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// HTTP status
    pub status: u16,
    /// AWS error code (e.g. "LoadBalancerNotFound")
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ServiceError {
    fn from_response(status: u16, body: &str) -> Self {
        let error = xml::first(body, "Error").unwrap_or(body);
        Self {
            status,
            code: xml::text(error, "Code").unwrap_or_else(|| format!("HTTP{}", status)),
            message: xml::text(error, "Message").unwrap_or_default(),
        }
    }

    fn is_any(&self, codes: &[&str]) -> bool {
        codes.contains(&self.code.as_str())
    }

    fn into_error(self, action: &str) -> Error {
        match self.status {
            401 | 403 => Error::auth(format!(
                "{} rejected: {}: {} (status {})",
                action, self.code, self.message, self.status
            )),
            _ => Error::control_plane(action, format!("{}: {}", self.code, self.message)),
        }
    }
}

/// Classic ELB client
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot. Ordering and error handling across calls is
/// owned by `LoadBalancerProvisioner`.
#[derive(Debug)]
pub struct ClassicElbClient {
    /// Request URL
    endpoint: url::Url,

    /// Host header value, as signed
    host: String,

    /// SigV4 signer for the region
    signer: Signer,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl ClassicElbClient {
    /// Create a client
    ///
    /// # Parameters
    ///
    /// - `region`: AWS region used for signing
    /// - `endpoint`: Endpoint override; the regional endpoint when `None`
    /// - `credentials`: Static credentials
    pub fn new(region: &str, endpoint: Option<&str>, credentials: AwsCredentials) -> Result<Self> {
        let endpoint_str = endpoint
            .map(str::to_string)
            .unwrap_or_else(|| default_endpoint(region));
        let endpoint = url::Url::parse(&endpoint_str)
            .map_err(|e| Error::config(format!("Invalid ELB endpoint {}: {}", endpoint_str, e)))?;

        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(Error::config(format!("ELB endpoint has no host: {}", endpoint_str)));
            }
        };

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            host,
            signer: Signer::new(credentials, region, SERVICE),
            client,
        })
    }

    /// Send one signed request
    ///
    /// The outer result is transport failure; the inner one is the
    /// service's answer.
    async fn send(&self, request: &QueryRequest) -> Result<std::result::Result<String, ServiceError>> {
        let body = request.encode();
        let headers = self
            .signer
            .sign(&self.host, self.endpoint.path(), &body, Utc::now())?;

        debug!("ELB {} -> {}", request.action(), self.endpoint);

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .body(body)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", request.action(), e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());

        if status.is_success() {
            Ok(Ok(text))
        } else {
            Ok(Err(ServiceError::from_response(status.as_u16(), &text)))
        }
    }

    /// Send a request whose every service error is a failure
    async fn call(&self, request: QueryRequest) -> Result<String> {
        let action = request.action();
        self.send(&request)
            .await?
            .map_err(|e| e.into_error(action))
    }
}

#[async_trait]
impl LoadBalancerApi for ClassicElbClient {
    async fn create_load_balancer(&self, request: &CreateLoadBalancerRequest) -> Result<CreateOutcome> {
        let query = QueryRequest::new("CreateLoadBalancer")
            .param("LoadBalancerName", &request.name)
            .listeners(&request.listeners)
            .members("Subnets", &request.subnets)
            .members("SecurityGroups", &request.security_groups)
            .param("Scheme", request.scheme)
            .tags(&request.tags);

        match self.send(&query).await? {
            Ok(body) => {
                if let Some(dns_name) = xml::text(&body, "DNSName") {
                    info!("Created load balancer {} ({})", request.name, dns_name);
                }
                Ok(CreateOutcome::Created)
            }
            Err(e) if e.is_any(DUPLICATE_NAME_CODES) => {
                debug!("{}: {}", e.code, e.message);
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(e.into_error(query.action())),
        }
    }

    async fn delete_listeners(&self, name: &str, ports: &[u16]) -> Result<()> {
        self.call(
            QueryRequest::new("DeleteLoadBalancerListeners")
                .param("LoadBalancerName", name)
                .members("LoadBalancerPorts", ports),
        )
        .await
        .map(drop)
    }

    async fn create_listeners(&self, name: &str, listeners: &[Listener]) -> Result<()> {
        self.call(
            QueryRequest::new("CreateLoadBalancerListeners")
                .param("LoadBalancerName", name)
                .listeners(listeners),
        )
        .await
        .map(drop)
    }

    async fn apply_security_groups(&self, name: &str, security_groups: &[String]) -> Result<()> {
        self.call(
            QueryRequest::new("ApplySecurityGroupsToLoadBalancer")
                .param("LoadBalancerName", name)
                .members("SecurityGroups", security_groups),
        )
        .await
        .map(drop)
    }

    async fn add_tags(&self, name: &str, tags: &[Tag]) -> Result<()> {
        self.call(
            QueryRequest::new("AddTags")
                .members("LoadBalancerNames", &[name])
                .tags(tags),
        )
        .await
        .map(drop)
    }

    async fn attach_subnets(&self, name: &str, subnets: &[String]) -> Result<()> {
        self.call(
            QueryRequest::new("AttachLoadBalancerToSubnets")
                .param("LoadBalancerName", name)
                .members("Subnets", subnets),
        )
        .await
        .map(drop)
    }

    async fn configure_health_check(&self, name: &str, health_check: &HealthCheckConfig) -> Result<()> {
        self.call(
            QueryRequest::new("ConfigureHealthCheck")
                .param("LoadBalancerName", name)
                .health_check(health_check),
        )
        .await
        .map(drop)
    }

    async fn describe_load_balancers(&self, name: &str) -> Result<Vec<LoadBalancerDescription>> {
        let query = QueryRequest::new("DescribeLoadBalancers").members("LoadBalancerNames", &[name]);

        match self.send(&query).await? {
            Ok(body) => parse_descriptions(&body),
            Err(e) if e.is_any(NOT_FOUND_CODES) => Ok(Vec::new()),
            Err(e) => Err(e.into_error(query.action())),
        }
    }

    async fn create_app_cookie_stickiness_policy(
        &self,
        name: &str,
        policy_name: &str,
        cookie_name: &str,
    ) -> Result<()> {
        self.call(
            QueryRequest::new("CreateAppCookieStickinessPolicy")
                .param("LoadBalancerName", name)
                .param("PolicyName", policy_name)
                .param("CookieName", cookie_name),
        )
        .await
        .map(drop)
    }

    async fn set_listener_policies(&self, name: &str, port: u16, policy_names: &[String]) -> Result<()> {
        let mut query = QueryRequest::new("SetLoadBalancerPoliciesOfListener")
            .param("LoadBalancerName", name)
            .param("LoadBalancerPort", port);
        // An empty list clears the listener's policies
        query = if policy_names.is_empty() {
            query.param("PolicyNames", "")
        } else {
            query.members("PolicyNames", policy_names)
        };
        self.call(query).await.map(drop)
    }

    fn api_name(&self) -> &'static str {
        "aws"
    }
}

/// Parse a DescribeLoadBalancers response body
fn parse_descriptions(body: &str) -> Result<Vec<LoadBalancerDescription>> {
    let Some(list) = xml::first(body, "LoadBalancerDescriptions") else {
        return Ok(Vec::new());
    };

    xml::elements(list, "member")
        .into_iter()
        .map(parse_description)
        .collect()
}

fn parse_description(member: &str) -> Result<LoadBalancerDescription> {
    let name = xml::text(member, "LoadBalancerName")
        .ok_or_else(|| Error::control_plane("DescribeLoadBalancers", "LoadBalancerName missing from response"))?;
    let dns_name = xml::text(member, "DNSName").ok_or_else(|| {
        Error::control_plane("DescribeLoadBalancers", format!("DNSName missing for {}", name))
    })?;

    let listeners = xml::first(member, "ListenerDescriptions")
        .map(|list| {
            xml::elements(list, "member")
                .into_iter()
                .filter_map(|d| xml::first(d, "Listener"))
                .filter_map(parse_listener)
                .collect()
        })
        .unwrap_or_default();

    let health_check = xml::first(member, "HealthCheck").and_then(|hc| {
        Some(HealthCheckConfig {
            target: xml::text(hc, "Target")?,
            interval: xml::text(hc, "Interval")?.parse().ok()?,
            healthy_threshold: xml::text(hc, "HealthyThreshold")?.parse().ok()?,
            unhealthy_threshold: xml::text(hc, "UnhealthyThreshold")?.parse().ok()?,
            timeout: xml::text(hc, "Timeout")?.parse().ok()?,
        })
    });

    let created_time = xml::text(member, "CreatedTime")
        .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
        .map(|t| t.with_timezone(&Utc));

    Ok(LoadBalancerDescription {
        scheme: xml::text(member, "Scheme").and_then(|s| Scheme::parse(&s)),
        subnets: xml::member_texts(member, "Subnets"),
        security_groups: xml::member_texts(member, "SecurityGroups"),
        listeners,
        health_check,
        created_time,
        name,
        dns_name,
    })
}

fn parse_listener(listener: &str) -> Option<Listener> {
    Some(Listener {
        load_balancer_port: xml::text(listener, "LoadBalancerPort")?.parse().ok()?,
        instance_port: xml::text(listener, "InstancePort")?.parse().ok()?,
        protocol: Protocol::parse(&xml::text(listener, "Protocol")?)?,
        instance_protocol: Protocol::parse(&xml::text(listener, "InstanceProtocol")?)?,
        ssl_certificate_id: xml::text(listener, "SSLCertificateId").unwrap_or_default(),
    })
}

/// Factory for creating Classic ELB clients
pub struct AwsControlPlaneFactory;

impl LoadBalancerApiFactory for AwsControlPlaneFactory {
    fn create(&self, config: &ControlPlaneConfig) -> Result<Box<dyn LoadBalancerApi>> {
        match config {
            ControlPlaneConfig::Aws { region, endpoint } => {
                let credentials = AwsCredentials::from_env()?;
                Ok(Box::new(ClassicElbClient::new(
                    region,
                    endpoint.as_deref(),
                    credentials,
                )?))
            }
            _ => Err(Error::config("Invalid config for AWS control plane")),
        }
    }
}

/// Register the AWS control plane with a registry
///
/// # Example
///
/// ```rust
/// use elb_core::ComponentRegistry;
///
/// let registry = ComponentRegistry::with_builtins();
/// elb_control_aws::register(&registry);
/// assert!(registry.has_control_plane("aws"));
/// ```
pub fn register(registry: &ComponentRegistry) {
    registry.register_control_plane("aws", Box::new(AwsControlPlaneFactory));
}
