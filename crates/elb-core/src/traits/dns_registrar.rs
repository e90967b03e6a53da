// # DNS Registrar Trait
//
// Publishes the service URL for a load balancer endpoint.
//
// ## Implementations
//
// - Cloudflare: `elb-registrar-cloudflare` crate
// - Disabled: `elb_core::registrar::DisabledRegistrar`
//
// ## Usage
//
// ```rust,ignore
// use elb_core::DnsRegistrar;
//
// registrar
//     .register_dns(
//         "orders.apps.example.com",
//         "internal-orders-123.us-east-1.elb.amazonaws.com",
//         "orders",
//         &cluster.cluster_stack_tags,
//     )
//     .await?;
// ```

use async_trait::async_trait;

use crate::cluster::Tag;

/// Trait for DNS registrar implementations
///
/// Registrars are single-shot: one registration per call, no retries.
/// Failures are returned to the provisioner, which surfaces them.
#[async_trait]
pub trait DnsRegistrar: Send + Sync {
    /// Point `fqdn` at `endpoint_dns_name`
    ///
    /// # Idempotency
    ///
    /// Registering the same name and endpoint twice must be safe.
    ///
    /// # Parameters
    ///
    /// - `fqdn`: Public service URL host (e.g., "orders.apps.example.com")
    /// - `endpoint_dns_name`: Load balancer DNS name
    /// - `resource_name`: Load balancer name (for record annotations)
    /// - `tags`: Cluster tags (for record annotations)
    async fn register_dns(
        &self,
        fqdn: &str,
        endpoint_dns_name: &str,
        resource_name: &str,
        tags: &[Tag],
    ) -> Result<(), crate::Error>;

    /// Get the registrar name (for logging/debugging)
    fn registrar_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS registrars from configuration
pub trait DnsRegistrarFactory: Send + Sync {
    /// Create a DnsRegistrar instance from configuration
    fn create(
        &self,
        config: &crate::config::RegistrarConfig,
    ) -> Result<Box<dyn DnsRegistrar>, crate::Error>;
}
