// # Load Balancer Control Plane Trait
//
// Defines the create/update surface of a classic load balancer control plane.
//
// ## Implementations
//
// - AWS Classic ELB: `elb-control-aws` crate
// - In-process: `elb_core::control_plane::MemoryLoadBalancerApi`
//
// ## Usage
//
// ```rust,ignore
// use elb_core::traits::{LoadBalancerApi, CreateOutcome};
//
// match api.create_load_balancer(&request).await? {
//     CreateOutcome::Created => { /* fresh load balancer */ }
//     CreateOutcome::AlreadyExists => { /* reconcile listeners, groups, tags, subnets */ }
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cluster::Tag;
use crate::definition::Protocol;

/// Load balancer scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    /// Reachable from the internet
    InternetFacing,
    /// Reachable only inside the VPC
    Internal,
}

impl Scheme {
    /// Wire name ("internet-facing" or "internal")
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::InternetFacing => "internet-facing",
            Scheme::Internal => "internal",
        }
    }

    /// Parse a wire name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "internet-facing" => Some(Scheme::InternetFacing),
            "internal" => Some(Scheme::Internal),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener mapping one external port to the instance port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    /// Port the load balancer listens on
    pub load_balancer_port: u16,
    /// Port traffic is forwarded to on the instance
    pub instance_port: u16,
    /// Front-end protocol
    pub protocol: Protocol,
    /// Back-end protocol
    pub instance_protocol: Protocol,
    /// Certificate presented by the listener (unused for non-TLS protocols)
    pub ssl_certificate_id: String,
}

/// Normalized health check submitted to the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// `TCP:<port>` or `HTTPS:<port><path>`
    pub target: String,
    /// Seconds between checks
    pub interval: u32,
    /// Consecutive successes before healthy
    pub healthy_threshold: u32,
    /// Consecutive failures before unhealthy
    pub unhealthy_threshold: u32,
    /// Seconds before a check times out
    pub timeout: u32,
}

/// Request to create a load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLoadBalancerRequest {
    /// Load balancer name
    pub name: String,
    /// Subnets to attach
    pub subnets: Vec<String>,
    /// Listeners, in order
    pub listeners: Vec<Listener>,
    /// Scheme
    pub scheme: Scheme,
    /// Security groups
    pub security_groups: Vec<String>,
    /// Tags
    pub tags: Vec<Tag>,
}

impl fmt::Display for CreateLoadBalancerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners: Vec<String> = self
            .listeners
            .iter()
            .map(|l| {
                format!(
                    "{}:{}->{}:{}",
                    l.protocol, l.load_balancer_port, l.instance_protocol, l.instance_port
                )
            })
            .collect();
        let tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| format!("{}={}", t.key, t.value))
            .collect();

        write!(
            f,
            "{{LoadBalancerName: {}, Scheme: {}, Subnets: [{}], SecurityGroups: [{}], Listeners: [{}], Tags: [{}]}}",
            self.name,
            self.scheme,
            self.subnets.join(", "),
            self.security_groups.join(", "),
            listeners.join(", "),
            tags.join(", ")
        )
    }
}

/// Outcome of a create call
///
/// A name collision is an expected outcome on redeploy, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new load balancer was created
    Created,
    /// A load balancer with this name already exists
    AlreadyExists,
}

/// Canonical description of a load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerDescription {
    /// Load balancer name
    pub name: String,
    /// Endpoint DNS name
    pub dns_name: String,
    /// Scheme, when reported
    pub scheme: Option<Scheme>,
    /// Attached subnets
    #[serde(default)]
    pub subnets: Vec<String>,
    /// Applied security groups
    #[serde(default)]
    pub security_groups: Vec<String>,
    /// Listeners
    #[serde(default)]
    pub listeners: Vec<Listener>,
    /// Health check, when configured
    pub health_check: Option<HealthCheckConfig>,
    /// Creation time, when reported
    pub created_time: Option<DateTime<Utc>>,
}

/// Trait for load balancer control plane implementations
///
/// Each method maps to exactly one control plane call. Implementations
/// must not retry or roll back; the provisioner decides what happens
/// after a failure.
///
/// Errors should name the operation (see [`crate::Error::control_plane`]);
/// the provisioner wraps anything that does not.
#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    /// Create a load balancer
    ///
    /// # Returns
    ///
    /// - `Ok(CreateOutcome::Created)`: new load balancer
    /// - `Ok(CreateOutcome::AlreadyExists)`: the name is taken
    /// - `Err(Error)`: any other failure
    async fn create_load_balancer(
        &self,
        request: &CreateLoadBalancerRequest,
    ) -> Result<CreateOutcome, crate::Error>;

    /// Delete the listeners on the given ports
    async fn delete_listeners(&self, name: &str, ports: &[u16]) -> Result<(), crate::Error>;

    /// Create listeners on an existing load balancer
    async fn create_listeners(
        &self,
        name: &str,
        listeners: &[Listener],
    ) -> Result<(), crate::Error>;

    /// Replace the load balancer's security groups
    async fn apply_security_groups(
        &self,
        name: &str,
        security_groups: &[String],
    ) -> Result<(), crate::Error>;

    /// Add (or overwrite by key) tags
    async fn add_tags(&self, name: &str, tags: &[Tag]) -> Result<(), crate::Error>;

    /// Attach subnets in addition to those already attached
    async fn attach_subnets(&self, name: &str, subnets: &[String]) -> Result<(), crate::Error>;

    /// Configure the health check
    async fn configure_health_check(
        &self,
        name: &str,
        health_check: &HealthCheckConfig,
    ) -> Result<(), crate::Error>;

    /// Describe load balancers by name
    async fn describe_load_balancers(
        &self,
        name: &str,
    ) -> Result<Vec<LoadBalancerDescription>, crate::Error>;

    /// Create an application-cookie stickiness policy
    async fn create_app_cookie_stickiness_policy(
        &self,
        name: &str,
        policy_name: &str,
        cookie_name: &str,
    ) -> Result<(), crate::Error>;

    /// Set the policies of the listener on `port`
    async fn set_listener_policies(
        &self,
        name: &str,
        port: u16,
        policy_names: &[String],
    ) -> Result<(), crate::Error>;

    /// Get the control plane name (for logging/debugging)
    fn api_name(&self) -> &'static str;
}

/// Helper trait for constructing control planes from configuration
pub trait LoadBalancerApiFactory: Send + Sync {
    /// Create a LoadBalancerApi instance from configuration
    fn create(
        &self,
        config: &crate::config::ControlPlaneConfig,
    ) -> Result<Box<dyn LoadBalancerApi>, crate::Error>;
}
