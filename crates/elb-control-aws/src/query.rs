//! Query API request encoding
//!
//! Classic ELB takes form-encoded parameters. Lists are flattened as
//! `Prefix.member.N` with N starting at 1, and structures in a list as
//! `Prefix.member.N.Field`.

use elb_core::Tag;
use elb_core::traits::{HealthCheckConfig, Listener};

/// Classic ELB API version
pub const API_VERSION: &str = "2012-06-01";

/// One Query API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    action: &'static str,
    params: Vec<(String, String)>,
}

impl QueryRequest {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            params: Vec::new(),
        }
    }

    /// Action name
    pub fn action(&self) -> &'static str {
        self.action
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    /// `prefix.member.N` for each item
    pub fn members<T: ToString>(mut self, prefix: &str, items: &[T]) -> Self {
        for (i, item) in items.iter().enumerate() {
            self.params
                .push((format!("{}.member.{}", prefix, i + 1), item.to_string()));
        }
        self
    }

    pub fn listeners(mut self, listeners: &[Listener]) -> Self {
        for (i, listener) in listeners.iter().enumerate() {
            let prefix = format!("Listeners.member.{}", i + 1);
            self = self
                .param(format!("{}.Protocol", prefix), listener.protocol)
                .param(format!("{}.LoadBalancerPort", prefix), listener.load_balancer_port)
                .param(format!("{}.InstanceProtocol", prefix), listener.instance_protocol)
                .param(format!("{}.InstancePort", prefix), listener.instance_port);
            if !listener.ssl_certificate_id.is_empty() {
                self = self.param(format!("{}.SSLCertificateId", prefix), &listener.ssl_certificate_id);
            }
        }
        self
    }

    pub fn tags(mut self, tags: &[Tag]) -> Self {
        for (i, tag) in tags.iter().enumerate() {
            let prefix = format!("Tags.member.{}", i + 1);
            self = self
                .param(format!("{}.Key", prefix), &tag.key)
                .param(format!("{}.Value", prefix), &tag.value);
        }
        self
    }

    pub fn health_check(self, health_check: &HealthCheckConfig) -> Self {
        self.param("HealthCheck.Target", &health_check.target)
            .param("HealthCheck.Interval", health_check.interval)
            .param("HealthCheck.Timeout", health_check.timeout)
            .param("HealthCheck.UnhealthyThreshold", health_check.unhealthy_threshold)
            .param("HealthCheck.HealthyThreshold", health_check.healthy_threshold)
    }

    /// Form body including `Action` and `Version`
    pub fn encode(&self) -> String {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("Action", self.action);
        form.append_pair("Version", API_VERSION);
        for (name, value) in &self.params {
            form.append_pair(name, value);
        }
        form.finish()
    }
}
