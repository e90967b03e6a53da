// # Certificate Resolver Trait
//
// Selects the certificate a listener presents and decides whether the
// service URL is public.
//
// ## Implementations
//
// - Static ARN: `elb_core::resolvers::StaticCertResolver`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::definition::Protocol;

/// Certificate selected for a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertDecision {
    /// Certificate identifier (ARN)
    pub certificate_arn: String,
    /// Whether the service URL scheme is internet-facing
    pub internet_facing: bool,
}

/// Trait for certificate resolver implementations
#[async_trait]
pub trait CertResolver: Send + Sync {
    /// Derive the certificate for `url_prefix.url_suffix`
    ///
    /// # Parameters
    ///
    /// - `protocol`: Listener protocol
    /// - `url_suffix`: DNS zone of the service URL
    /// - `url_prefix`: First label of the service URL
    async fn derive_cert(
        &self,
        protocol: Protocol,
        url_suffix: &str,
        url_prefix: &str,
    ) -> Result<CertDecision, crate::Error>;

    /// Decide whether the URL scheme is internet-facing
    ///
    /// `scheme_override` is the service's URL-scheme override
    /// ("internet-facing" / "internal"), if any.
    fn is_internet_facing_url_scheme(
        &self,
        decision: &CertDecision,
        scheme_override: Option<&str>,
    ) -> bool;

    /// Get the resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}
