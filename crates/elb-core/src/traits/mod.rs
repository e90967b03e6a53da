//! Core traits for load balancer provisioning
//!
//! This module defines the abstract interfaces the provisioner drives.
//!
//! - [`LoadBalancerApi`]: Create/update calls against the control plane
//! - [`CertResolver`]: Certificate selection
//! - [`PortResolver`]: Exposed container discovery
//! - [`DnsRegistrar`]: DNS registration of the service URL

pub mod load_balancer;
pub mod cert_resolver;
pub mod port_resolver;
pub mod dns_registrar;

pub use load_balancer::{
    CreateLoadBalancerRequest, CreateOutcome, HealthCheckConfig, Listener, LoadBalancerApi,
    LoadBalancerApiFactory, LoadBalancerDescription, Scheme,
};
pub use cert_resolver::{CertDecision, CertResolver};
pub use port_resolver::{ExposedContainer, PortResolver};
pub use dns_registrar::{DnsRegistrar, DnsRegistrarFactory};
