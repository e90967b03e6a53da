// # elb-core
//
// Core library for provisioning classic load balancers in front of
// container services.
//
// ## Architecture Overview
//
// This library provides the provisioning workflow and its seams:
// - **LoadBalancerApi**: Trait for create/update calls against the control plane
// - **CertResolver**: Trait for certificate selection and URL scheme inference
// - **PortResolver**: Trait for finding the container the load balancer fronts
// - **DnsRegistrar**: Trait for registering the service URL in DNS
// - **LoadBalancerProvisioner**: Orchestrates resolve → create/reconcile → describe → register
// - **ComponentRegistry**: Plugin-based registry for control planes and registrars
//
// ## Design Principles
//
// 1. **Pure Policy**: Placement, listeners, tags and health checks are plain functions
// 2. **Create-or-Reconcile**: An existing load balancer is a normal outcome, not an error
// 3. **Plugin-Based**: Control planes and registrars are registered dynamically
// 4. **Library-First**: The binary is a thin wrapper over this crate

pub mod traits;
pub mod policy;
pub mod provisioner;
pub mod control_plane;
pub mod registry;
pub mod config;
pub mod error;
pub mod definition;
pub mod cluster;
pub mod resolvers;
pub mod registrar;

// Re-export core types for convenience
pub use traits::{CertResolver, DnsRegistrar, LoadBalancerApi, PortResolver};
pub use provisioner::{LoadBalancerProvisioner, LoadBalancerResult, ProvisionEvent, ProvisionStage};
pub use registry::ComponentRegistry;
pub use config::{ControlPlaneConfig, ProvisionConfig, RegistrarConfig};
pub use error::{Error, Result};
pub use definition::{Protocol, PushDefinition, ServiceSpec};
pub use cluster::{ClusterMetadata, Tag};
pub use resolvers::{FirstExposedPortResolver, StaticCertResolver};
pub use control_plane::MemoryLoadBalancerApi;
pub use registrar::DisabledRegistrar;
