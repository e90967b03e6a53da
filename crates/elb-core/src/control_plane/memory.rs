// # Memory Control Plane
//
// In-memory implementation of LoadBalancerApi.
//
// ## Purpose
//
// Behaves like a classic load balancer control plane without any network
// access. Useful for dry runs of a push definition and for tests.
//
// ## Semantics
//
// - Names are unique: a second create returns `CreateOutcome::AlreadyExists`
// - Listener ports are unique per load balancer (`DuplicateListener`)
// - Security groups are replaced, tags are upserted by key, subnets are unioned
// - Policy names are unique per load balancer (`DuplicatePolicyName`), so a
//   repeated stickiness push fails here the same way it does against AWS
// - Policies can only be bound to an existing listener (`ListenerNotFound`)
// - Every call is appended to an operation journal, successful or not
//
// ## Crash Behavior
//
// - All state is lost when the process exits

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cluster::Tag;
use crate::config::ControlPlaneConfig;
use crate::error::{Error, Result};
use crate::traits::{
    CreateLoadBalancerRequest, CreateOutcome, HealthCheckConfig, Listener, LoadBalancerApi,
    LoadBalancerApiFactory, LoadBalancerDescription, Scheme,
};

/// Stored state of one load balancer
#[derive(Debug, Clone)]
struct LoadBalancerState {
    description: LoadBalancerDescription,
    tags: Vec<Tag>,
    /// Policy name -> cookie name
    policies: HashMap<String, String>,
    /// Listener port -> bound policy names
    listener_policies: HashMap<u16, Vec<String>>,
}

#[derive(Debug, Default)]
struct ControlPlaneState {
    load_balancers: HashMap<String, LoadBalancerState>,
    journal: Vec<String>,
    created: u64,
}

/// In-memory load balancer control plane
///
/// Cloning shares the underlying state.
///
/// # Example
///
/// ```rust,no_run
/// use elb_core::control_plane::MemoryLoadBalancerApi;
/// use elb_core::traits::LoadBalancerApi;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let api = MemoryLoadBalancerApi::new("us-east-1");
///     let found = api.describe_load_balancers("orders").await?;
///     assert!(found.is_empty());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryLoadBalancerApi {
    region: String,
    inner: Arc<RwLock<ControlPlaneState>>,
}

impl MemoryLoadBalancerApi {
    /// Create an empty control plane for `region`
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            inner: Arc::new(RwLock::new(ControlPlaneState::default())),
        }
    }

    /// Operations performed so far, in call order
    pub async fn journal(&self) -> Vec<String> {
        self.inner.read().await.journal.clone()
    }

    /// Tags currently on a load balancer
    pub async fn tags(&self, name: &str) -> Option<Vec<Tag>> {
        let guard = self.inner.read().await;
        guard.load_balancers.get(name).map(|lb| lb.tags.clone())
    }

    /// Policy names bound to the listener on `port`
    pub async fn listener_policies(&self, name: &str, port: u16) -> Vec<String> {
        let guard = self.inner.read().await;
        guard
            .load_balancers
            .get(name)
            .and_then(|lb| lb.listener_policies.get(&port).cloned())
            .unwrap_or_default()
    }

    /// Cookie name of a stickiness policy
    pub async fn stickiness_cookie(&self, name: &str, policy_name: &str) -> Option<String> {
        let guard = self.inner.read().await;
        guard
            .load_balancers
            .get(name)
            .and_then(|lb| lb.policies.get(policy_name).cloned())
    }

    /// Number of load balancers
    pub async fn len(&self) -> usize {
        self.inner.read().await.load_balancers.len()
    }

    /// Check if no load balancer exists
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.load_balancers.is_empty()
    }

    fn dns_name(&self, name: &str, scheme: Scheme, serial: u64) -> String {
        let prefix = match scheme {
            Scheme::Internal => "internal-",
            Scheme::InternetFacing => "",
        };
        format!(
            "{}{}-{}.{}.elb.amazonaws.com",
            prefix,
            name,
            1_000_000_000 + serial,
            self.region
        )
    }
}

impl Default for MemoryLoadBalancerApi {
    fn default() -> Self {
        Self::new("us-east-1")
    }
}

/// Check that listener ports are unique among themselves and `existing`
fn check_listener_ports(operation: &str, existing: &[Listener], new: &[Listener]) -> Result<()> {
    let mut seen: Vec<u16> = existing.iter().map(|l| l.load_balancer_port).collect();
    for listener in new {
        if seen.contains(&listener.load_balancer_port) {
            return Err(Error::control_plane(
                operation,
                format!(
                    "DuplicateListener: a listener already exists on port {}",
                    listener.load_balancer_port
                ),
            ));
        }
        seen.push(listener.load_balancer_port);
    }
    Ok(())
}

fn not_found(operation: &str, name: &str) -> Error {
    Error::control_plane(
        operation,
        format!("LoadBalancerNotFound: There is no ACTIVE Load Balancer named '{}'", name),
    )
}

#[async_trait]
impl LoadBalancerApi for MemoryLoadBalancerApi {
    async fn create_load_balancer(
        &self,
        request: &CreateLoadBalancerRequest,
    ) -> Result<CreateOutcome> {
        const OP: &str = "CreateLoadBalancer";
        let mut guard = self.inner.write().await;
        guard.journal.push(format!("{} {}", OP, request.name));

        if guard.load_balancers.contains_key(&request.name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        if request.listeners.is_empty() {
            return Err(Error::control_plane(OP, "ValidationError: at least one listener is required"));
        }
        check_listener_ports(OP, &[], &request.listeners)?;

        guard.created += 1;
        let dns_name = self.dns_name(&request.name, request.scheme, guard.created);
        let state = LoadBalancerState {
            description: LoadBalancerDescription {
                name: request.name.clone(),
                dns_name,
                scheme: Some(request.scheme),
                subnets: request.subnets.clone(),
                security_groups: request.security_groups.clone(),
                listeners: request.listeners.clone(),
                health_check: None,
                created_time: Some(Utc::now()),
            },
            tags: request.tags.clone(),
            policies: HashMap::new(),
            listener_policies: HashMap::new(),
        };
        guard.load_balancers.insert(request.name.clone(), state);

        Ok(CreateOutcome::Created)
    }

    async fn delete_listeners(&self, name: &str, ports: &[u16]) -> Result<()> {
        const OP: &str = "DeleteLoadBalancerListeners";
        let mut guard = self.inner.write().await;
        guard.journal.push(format!("{} {}", OP, name));

        let lb = guard.load_balancers.get_mut(name).ok_or_else(|| not_found(OP, name))?;
        // Deleting a port without a listener is not an error
        lb.description
            .listeners
            .retain(|l| !ports.contains(&l.load_balancer_port));
        lb.listener_policies.retain(|port, _| !ports.contains(port));
        Ok(())
    }

    async fn create_listeners(&self, name: &str, listeners: &[Listener]) -> Result<()> {
        const OP: &str = "CreateLoadBalancerListeners";
        let mut guard = self.inner.write().await;
        guard.journal.push(format!("{} {}", OP, name));

        let lb = guard.load_balancers.get_mut(name).ok_or_else(|| not_found(OP, name))?;
        check_listener_ports(OP, &lb.description.listeners, listeners)?;
        lb.description.listeners.extend_from_slice(listeners);
        Ok(())
    }

    async fn apply_security_groups(&self, name: &str, security_groups: &[String]) -> Result<()> {
        const OP: &str = "ApplySecurityGroupsToLoadBalancer";
        let mut guard = self.inner.write().await;
        guard.journal.push(format!("{} {}", OP, name));

        let lb = guard.load_balancers.get_mut(name).ok_or_else(|| not_found(OP, name))?;
        lb.description.security_groups = security_groups.to_vec();
        Ok(())
    }

    async fn add_tags(&self, name: &str, tags: &[Tag]) -> Result<()> {
        const OP: &str = "AddTags";
        let mut guard = self.inner.write().await;
        guard.journal.push(format!("{} {}", OP, name));

        let lb = guard.load_balancers.get_mut(name).ok_or_else(|| not_found(OP, name))?;
        for tag in tags {
            match lb.tags.iter_mut().find(|t| t.key == tag.key) {
                Some(existing) => existing.value = tag.value.clone(),
                None => lb.tags.push(tag.clone()),
            }
        }
        Ok(())
    }

    async fn attach_subnets(&self, name: &str, subnets: &[String]) -> Result<()> {
        const OP: &str = "AttachLoadBalancerToSubnets";
        let mut guard = self.inner.write().await;
        guard.journal.push(format!("{} {}", OP, name));

        let lb = guard.load_balancers.get_mut(name).ok_or_else(|| not_found(OP, name))?;
        for subnet in subnets {
            if !lb.description.subnets.contains(subnet) {
                lb.description.subnets.push(subnet.clone());
            }
        }
        Ok(())
    }

    async fn configure_health_check(
        &self,
        name: &str,
        health_check: &HealthCheckConfig,
    ) -> Result<()> {
        const OP: &str = "ConfigureHealthCheck";
        let mut guard = self.inner.write().await;
        guard.journal.push(format!("{} {}", OP, name));

        let lb = guard.load_balancers.get_mut(name).ok_or_else(|| not_found(OP, name))?;
        lb.description.health_check = Some(health_check.clone());
        Ok(())
    }

    async fn describe_load_balancers(&self, name: &str) -> Result<Vec<LoadBalancerDescription>> {
        let mut guard = self.inner.write().await;
        guard.journal.push(format!("DescribeLoadBalancers {}", name));

        Ok(guard
            .load_balancers
            .get(name)
            .map(|lb| vec![lb.description.clone()])
            .unwrap_or_default())
    }

    async fn create_app_cookie_stickiness_policy(
        &self,
        name: &str,
        policy_name: &str,
        cookie_name: &str,
    ) -> Result<()> {
        const OP: &str = "CreateAppCookieStickinessPolicy";
        let mut guard = self.inner.write().await;
        guard.journal.push(format!("{} {}", OP, name));

        let lb = guard.load_balancers.get_mut(name).ok_or_else(|| not_found(OP, name))?;
        if lb.policies.contains_key(policy_name) {
            return Err(Error::control_plane(
                OP,
                format!(
                    "DuplicatePolicyName: Policy '{}' already exists for '{}'",
                    policy_name, name
                ),
            ));
        }
        lb.policies
            .insert(policy_name.to_string(), cookie_name.to_string());
        Ok(())
    }

    async fn set_listener_policies(
        &self,
        name: &str,
        port: u16,
        policy_names: &[String],
    ) -> Result<()> {
        const OP: &str = "SetLoadBalancerPoliciesOfListener";
        let mut guard = self.inner.write().await;
        guard.journal.push(format!("{} {}", OP, name));

        let lb = guard.load_balancers.get_mut(name).ok_or_else(|| not_found(OP, name))?;
        if !lb
            .description
            .listeners
            .iter()
            .any(|l| l.load_balancer_port == port)
        {
            return Err(Error::control_plane(
                OP,
                format!("ListenerNotFound: There is no listener on port {} of '{}'", port, name),
            ));
        }
        if let Some(missing) = policy_names.iter().find(|p| !lb.policies.contains_key(*p)) {
            return Err(Error::control_plane(
                OP,
                format!("PolicyNotFound: There is no policy named '{}'", missing),
            ));
        }
        lb.listener_policies.insert(port, policy_names.to_vec());
        Ok(())
    }

    fn api_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for the in-memory control plane
pub struct MemoryControlPlaneFactory;

impl LoadBalancerApiFactory for MemoryControlPlaneFactory {
    fn create(&self, config: &ControlPlaneConfig) -> Result<Box<dyn LoadBalancerApi>> {
        match config {
            ControlPlaneConfig::Memory => Ok(Box::new(MemoryLoadBalancerApi::default())),
            _ => Err(Error::config("Invalid config for memory control plane")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Protocol;

    fn listener(port: u16) -> Listener {
        Listener {
            load_balancer_port: port,
            instance_port: 32768,
            protocol: Protocol::Https,
            instance_protocol: Protocol::Https,
            ssl_certificate_id: "arn:cert".to_string(),
        }
    }

    fn request(name: &str, scheme: Scheme, ports: &[u16]) -> CreateLoadBalancerRequest {
        CreateLoadBalancerRequest {
            name: name.to_string(),
            subnets: vec!["subnet-a".to_string()],
            listeners: ports.iter().map(|p| listener(*p)).collect(),
            scheme,
            security_groups: vec!["sg-1".to_string()],
            tags: vec![Tag::new("Name", name)],
        }
    }

    #[tokio::test]
    async fn second_create_reports_existing() {
        let api = MemoryLoadBalancerApi::new("eu-west-1");

        let first = api.create_load_balancer(&request("orders", Scheme::Internal, &[443])).await.unwrap();
        let second = api.create_load_balancer(&request("orders", Scheme::Internal, &[443])).await.unwrap();

        assert_eq!(first, CreateOutcome::Created);
        assert_eq!(second, CreateOutcome::AlreadyExists);
        assert_eq!(api.len().await, 1);

        let described = api.describe_load_balancers("orders").await.unwrap();
        assert!(described[0].dns_name.starts_with("internal-orders-"));
        assert!(described[0].dns_name.ends_with(".eu-west-1.elb.amazonaws.com"));
        assert!(described[0].created_time.is_some());
    }

    #[tokio::test]
    async fn duplicate_listener_ports_are_rejected() {
        let api = MemoryLoadBalancerApi::default();

        let err = api
            .create_load_balancer(&request("orders", Scheme::InternetFacing, &[443, 443]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ControlPlane { ref operation, .. } if operation == "CreateLoadBalancer"));
        assert!(api.is_empty().await);
    }

    #[tokio::test]
    async fn listeners_can_be_replaced() {
        let api = MemoryLoadBalancerApi::default();
        api.create_load_balancer(&request("orders", Scheme::Internal, &[443, 8443])).await.unwrap();

        assert!(api.create_listeners("orders", &[listener(443)]).await.is_err());

        api.delete_listeners("orders", &[443]).await.unwrap();
        api.create_listeners("orders", &[listener(443)]).await.unwrap();

        let described = api.describe_load_balancers("orders").await.unwrap();
        let ports: Vec<u16> = described[0].listeners.iter().map(|l| l.load_balancer_port).collect();
        assert_eq!(ports, vec![8443, 443]);
    }

    #[tokio::test]
    async fn groups_replace_tags_upsert_subnets_union() {
        let api = MemoryLoadBalancerApi::default();
        api.create_load_balancer(&request("orders", Scheme::Internal, &[443])).await.unwrap();

        api.apply_security_groups("orders", &["sg-2".to_string()]).await.unwrap();
        api.add_tags("orders", &[Tag::new("Name", "renamed"), Tag::new("Team", "payments")])
            .await
            .unwrap();
        api.attach_subnets("orders", &["subnet-a".to_string(), "subnet-b".to_string()])
            .await
            .unwrap();

        let described = &api.describe_load_balancers("orders").await.unwrap()[0];
        assert_eq!(described.security_groups, vec!["sg-2"]);
        assert_eq!(described.subnets, vec!["subnet-a", "subnet-b"]);
        assert_eq!(
            api.tags("orders").await.unwrap(),
            vec![Tag::new("Name", "renamed"), Tag::new("Team", "payments")]
        );
    }

    #[tokio::test]
    async fn policy_binding_requires_listener() {
        let api = MemoryLoadBalancerApi::default();
        api.create_load_balancer(&request("orders", Scheme::Internal, &[8443])).await.unwrap();
        api.create_app_cookie_stickiness_policy("orders", "Sticky", "JSESSIONID")
            .await
            .unwrap();

        let err = api
            .set_listener_policies("orders", 443, &["Sticky".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ListenerNotFound"));

        api.set_listener_policies("orders", 8443, &["Sticky".to_string()]).await.unwrap();
        assert_eq!(api.listener_policies("orders", 8443).await, vec!["Sticky"]);
        assert_eq!(api.stickiness_cookie("orders", "Sticky").await.as_deref(), Some("JSESSIONID"));
    }

    #[tokio::test]
    async fn policy_names_are_unique() {
        let api = MemoryLoadBalancerApi::default();
        api.create_load_balancer(&request("orders", Scheme::Internal, &[443])).await.unwrap();
        api.create_app_cookie_stickiness_policy("orders", "Sticky", "JSESSIONID")
            .await
            .unwrap();

        let err = api
            .create_app_cookie_stickiness_policy("orders", "Sticky", "SESSION")
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::ControlPlane { ref operation, ref message }
                if operation == "CreateAppCookieStickinessPolicy" && message.starts_with("DuplicatePolicyName")),
            "unexpected error: {}",
            err
        );
        assert_eq!(api.stickiness_cookie("orders", "Sticky").await.as_deref(), Some("JSESSIONID"));
    }

    #[tokio::test]
    async fn journal_records_every_call() {
        let api = MemoryLoadBalancerApi::default();
        let _ = api.add_tags("missing", &[]).await;
        api.describe_load_balancers("missing").await.unwrap();

        assert_eq!(
            api.journal().await,
            vec!["AddTags missing", "DescribeLoadBalancers missing"]
        );
    }
}
