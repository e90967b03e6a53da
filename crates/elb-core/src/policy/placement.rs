//! Network placement policy
//!
//! Decides where a load balancer lives (public or private subnets) and
//! which firewall allow-list fronts it.
//!
//! Public HTTPS traffic arrives through the Akamai edge, so an
//! internet-facing HTTPS load balancer gets the Akamai security groups
//! *instead of* the standard ones. The two sets are never merged.

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterMetadata;
use crate::definition::{Protocol, ServiceSpec};
use crate::traits::{CertDecision, Scheme};

/// Where a load balancer is placed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementDecision {
    /// Load balancer scheme
    pub scheme: Scheme,
    /// Subnets to attach
    pub subnets: Vec<String>,
    /// Security groups to apply
    pub security_groups: Vec<String>,
    /// Private subnets were chosen; the service URL must be registered in DNS
    pub uses_internal_subnets: bool,
}

/// Decide scheme, subnets and security groups for a service
///
/// Internet-facing when the certificate decision says so or the service's
/// ELB-scheme override is exactly `"internet-facing"`; internal otherwise.
pub fn decide_placement(
    service: &ServiceSpec,
    cert: &CertDecision,
    cluster: &ClusterMetadata,
) -> PlacementDecision {
    let elb_scheme_forced = service.elb_scheme_override.as_deref()
        == Some(Scheme::InternetFacing.as_str());

    let (scheme, subnets, uses_internal_subnets) = if cert.internet_facing || elb_scheme_forced {
        (Scheme::InternetFacing, cluster.public_subnets.clone(), false)
    } else {
        (Scheme::Internal, cluster.elb_subnets.clone(), true)
    };

    let security_groups =
        if scheme == Scheme::InternetFacing && service.effective_protocol() == Protocol::Https {
            cluster.akamai_security_groups.clone()
        } else {
            cluster.elb_security_groups.clone()
        };

    PlacementDecision {
        scheme,
        subnets,
        security_groups,
        uses_internal_subnets,
    }
}
