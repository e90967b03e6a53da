//! Disabled DNS registrar
//!
//! For pipelines whose DNS is managed elsewhere. Registration requests are
//! logged and acknowledged without touching any DNS provider.

use async_trait::async_trait;
use tracing::info;

use crate::cluster::Tag;
use crate::config::RegistrarConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsRegistrar, DnsRegistrarFactory};

/// Registrar that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRegistrar;

#[async_trait]
impl DnsRegistrar for DisabledRegistrar {
    async fn register_dns(
        &self,
        fqdn: &str,
        endpoint_dns_name: &str,
        resource_name: &str,
        _tags: &[Tag],
    ) -> Result<()> {
        info!(
            "DNS registration disabled; {} -> {} ({}) must be managed externally",
            fqdn, endpoint_dns_name, resource_name
        );
        Ok(())
    }

    fn registrar_name(&self) -> &'static str {
        "disabled"
    }
}

/// Factory for the disabled registrar
pub struct DisabledRegistrarFactory;

impl DnsRegistrarFactory for DisabledRegistrarFactory {
    fn create(&self, config: &RegistrarConfig) -> Result<Box<dyn DnsRegistrar>> {
        match config {
            RegistrarConfig::Disabled => Ok(Box::new(DisabledRegistrar)),
            _ => Err(Error::config("Invalid config for disabled registrar")),
        }
    }
}
