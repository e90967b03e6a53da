//! Service push definition
//!
//! Declarative metadata describing the service a load balancer fronts:
//! its protocol, URL naming, listener ports, stickiness and health check,
//! plus the container definitions the exposed port is discovered from.
//!
//! ## File Format
//!
//! ```json
//! {
//!   "appName": "orders-api",
//!   "service": {
//!     "protocol": "HTTPS",
//!     "urlSuffix": "apps.example.com",
//!     "elbSourcePorts": [443],
//!     "healthCheck": { "target": "/health" }
//!   },
//!   "containerDefinitions": [
//!     { "name": "web", "portMappings": [{ "containerPort": 8080, "hostPort": 32768 }] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Listener protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    /// Plain HTTP
    Http,
    /// HTTP over TLS
    #[default]
    Https,
    /// Raw TCP
    Tcp,
}

impl Protocol {
    /// Wire name used by the control plane ("HTTP", "HTTPS", "TCP")
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
            Protocol::Tcp => "TCP",
        }
    }

    /// Parse a wire name, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "HTTP" => Some(Protocol::Http),
            "HTTPS" => Some(Protocol::Https),
            "TCP" => Some(Protocol::Tcp),
            _ => None,
        }
    }

    /// Lowercase form used when printing URLs
    pub fn url_scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health check descriptor as written by the service owner
///
/// `target` is either the literal `"TCP"` or a request path such as
/// `"/health"`. Unset numeric fields are defaulted during normalization
/// (see [`crate::policy::health_check`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    /// `"TCP"` or an HTTP(S) path
    pub target: String,
    /// Seconds between checks
    #[serde(default)]
    pub interval: Option<u32>,
    /// Consecutive successes before an instance is healthy
    #[serde(default)]
    pub healthy_threshold: Option<u32>,
    /// Consecutive failures before an instance is unhealthy
    #[serde(default)]
    pub unhealthy_threshold: Option<u32>,
    /// Seconds before a check is considered failed
    #[serde(default)]
    pub timeout: Option<u32>,
}

impl HealthCheck {
    /// Create a descriptor with only a target set
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }
}

/// Load-balancer-facing service metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Listener protocol; HTTPS when unset
    #[serde(default)]
    pub protocol: Option<Protocol>,

    /// Replaces the application name as the URL's first label
    #[serde(default)]
    pub url_prefix_override: Option<String>,

    /// DNS zone the service URL lives under
    pub url_suffix: String,

    /// "internet-facing" or "internal"
    #[serde(default)]
    pub url_scheme_override: Option<String>,

    /// Forces the load balancer scheme when set to "internet-facing"
    #[serde(default)]
    pub elb_scheme_override: Option<String>,

    /// External listener ports; 443 when empty
    #[serde(default)]
    pub elb_source_ports: Vec<u16>,

    /// Application cookie used for session stickiness
    #[serde(default)]
    pub app_stickiness_cookie: Option<String>,

    /// Health check descriptor
    pub health_check: HealthCheck,
}

impl ServiceSpec {
    /// Protocol in effect for this service
    pub fn effective_protocol(&self) -> Protocol {
        self.protocol.unwrap_or_default()
    }

    /// First label of the service URL: the override if present, else `app_name`
    pub fn url_prefix<'a>(&'a self, app_name: &'a str) -> &'a str {
        self.url_prefix_override.as_deref().unwrap_or(app_name)
    }
}

/// Container to host port mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Port the container listens on
    pub container_port: u16,
    /// Port assigned on the instance
    pub host_port: u16,
}

/// Container within the service's task definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    /// Container name
    pub name: String,
    /// Port mappings, in declaration order
    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,
}

/// Everything the provisioner needs to know about one service push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushDefinition {
    /// Application name; also the load balancer name
    pub app_name: String,
    /// Service metadata
    pub service: ServiceSpec,
    /// Container definitions
    #[serde(default)]
    pub container_definitions: Vec<ContainerDefinition>,
}

impl PushDefinition {
    /// Load a push definition from a JSON file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::config::load_json(path.as_ref()).await
    }

    /// Check the fields the provisioner relies on
    pub fn validate(&self) -> Result<()> {
        if self.app_name.is_empty() {
            return Err(Error::invalid_input("appName cannot be empty"));
        }
        if self.service.url_suffix.is_empty() {
            return Err(Error::invalid_input(format!(
                "service.urlSuffix cannot be empty for {}",
                self.app_name
            )));
        }
        if self.service.health_check.target.is_empty() {
            return Err(Error::invalid_input(format!(
                "service.healthCheck.target cannot be empty for {}",
                self.app_name
            )));
        }
        Ok(())
    }
}
