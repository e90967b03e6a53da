//! Built-in resolvers
//!
//! Minimal certificate and port resolvers that need nothing beyond
//! configuration and the push definition.

use async_trait::async_trait;
use tracing::debug;

use crate::definition::{Protocol, PushDefinition};
use crate::error::{Error, Result};
use crate::traits::{CertDecision, CertResolver, ExposedContainer, PortResolver};

/// Certificate resolver backed by a single configured certificate
///
/// A URL is internet-facing when its suffix is one of `public_suffixes`,
/// unless the service's URL-scheme override says otherwise.
#[derive(Debug, Clone)]
pub struct StaticCertResolver {
    certificate_arn: String,
    public_suffixes: Vec<String>,
}

impl StaticCertResolver {
    /// Create a resolver for one certificate
    ///
    /// # Parameters
    ///
    /// - `certificate_arn`: Certificate presented by every listener
    /// - `public_suffixes`: DNS zones whose URLs are internet-facing
    pub fn new(certificate_arn: impl Into<String>, public_suffixes: Vec<String>) -> Self {
        Self {
            certificate_arn: certificate_arn.into(),
            public_suffixes,
        }
    }
}

#[async_trait]
impl CertResolver for StaticCertResolver {
    async fn derive_cert(
        &self,
        protocol: Protocol,
        url_suffix: &str,
        url_prefix: &str,
    ) -> Result<CertDecision> {
        if protocol == Protocol::Https && self.certificate_arn.is_empty() {
            return Err(Error::resolution(format!(
                "No certificate configured for https://{}.{}",
                url_prefix, url_suffix
            )));
        }

        let internet_facing = self.public_suffixes.iter().any(|s| s == url_suffix);
        debug!(
            "Certificate for {}.{}: {} (internet-facing zone: {})",
            url_prefix, url_suffix, self.certificate_arn, internet_facing
        );

        Ok(CertDecision {
            certificate_arn: self.certificate_arn.clone(),
            internet_facing,
        })
    }

    fn is_internet_facing_url_scheme(
        &self,
        decision: &CertDecision,
        scheme_override: Option<&str>,
    ) -> bool {
        match scheme_override {
            Some("internet-facing") => true,
            Some("internal") => false,
            _ => decision.internet_facing,
        }
    }

    fn resolver_name(&self) -> &'static str {
        "static"
    }
}

/// Port resolver picking the first container that maps a port
///
/// The first port mapping of that container is the exposed one.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstExposedPortResolver;

impl PortResolver for FirstExposedPortResolver {
    fn find_exposed_container(&self, definition: &PushDefinition) -> Result<ExposedContainer> {
        definition
            .container_definitions
            .iter()
            .find_map(|container| {
                container.port_mappings.first().map(|mapping| ExposedContainer {
                    container_name: container.name.clone(),
                    host_port: mapping.host_port,
                    container_port: mapping.container_port,
                })
            })
            .ok_or_else(|| {
                Error::resolution(format!(
                    "No container in {} exposes a port",
                    definition.app_name
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ContainerDefinition, HealthCheck, PortMapping, ServiceSpec};

    fn definition(containers: Vec<ContainerDefinition>) -> PushDefinition {
        PushDefinition {
            app_name: "orders".to_string(),
            service: ServiceSpec {
                url_suffix: "apps.example.com".to_string(),
                health_check: HealthCheck::new("/health"),
                ..ServiceSpec::default()
            },
            container_definitions: containers,
        }
    }

    #[test]
    fn picks_first_mapped_container() {
        let definition = definition(vec![
            ContainerDefinition {
                name: "sidecar".to_string(),
                port_mappings: Vec::new(),
            },
            ContainerDefinition {
                name: "web".to_string(),
                port_mappings: vec![
                    PortMapping { container_port: 8080, host_port: 32768 },
                    PortMapping { container_port: 9090, host_port: 32769 },
                ],
            },
        ]);

        let exposed = FirstExposedPortResolver.find_exposed_container(&definition).unwrap();

        assert_eq!(exposed.container_name, "web");
        assert_eq!(exposed.host_port, 32768);
        assert_eq!(exposed.container_port, 8080);
    }

    #[test]
    fn no_mapped_port_is_resolution_error() {
        let definition = definition(vec![ContainerDefinition {
            name: "worker".to_string(),
            port_mappings: Vec::new(),
        }]);

        let err = FirstExposedPortResolver.find_exposed_container(&definition).unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[test]
    fn public_suffix_is_internet_facing() {
        let resolver = StaticCertResolver::new("arn:cert", vec!["example.com".to_string()]);

        let decision = tokio_test::block_on(resolver.derive_cert(
            Protocol::Https,
            "example.com",
            "orders",
        ))
        .unwrap();

        assert_eq!(decision.certificate_arn, "arn:cert");
        assert!(decision.internet_facing);
        assert!(resolver.is_internet_facing_url_scheme(&decision, None));
        assert!(!resolver.is_internet_facing_url_scheme(&decision, Some("internal")));
    }

    #[test]
    fn scheme_override_can_make_private_zone_public() {
        let resolver = StaticCertResolver::new("arn:cert", Vec::new());

        let decision = tokio_test::block_on(resolver.derive_cert(
            Protocol::Https,
            "corp.example.com",
            "orders",
        ))
        .unwrap();

        assert!(!decision.internet_facing);
        assert!(resolver.is_internet_facing_url_scheme(&decision, Some("internet-facing")));
    }

    #[test]
    fn https_without_certificate_fails() {
        let resolver = StaticCertResolver::new("", Vec::new());

        let result = tokio_test::block_on(resolver.derive_cert(
            Protocol::Https,
            "example.com",
            "orders",
        ));
        assert!(matches!(result, Err(Error::Resolution(_))));

        let tcp = tokio_test::block_on(resolver.derive_cert(Protocol::Tcp, "example.com", "orders"));
        assert!(tcp.is_ok());
    }
}
