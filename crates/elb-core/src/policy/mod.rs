//! Pure provisioning policy
//!
//! Everything here is a function of its inputs: no I/O, no control plane
//! access. The provisioner composes these into requests.
//!
//! - [`placement`]: scheme, subnets and security groups
//! - [`listeners`]: listener set for the service's source ports
//! - [`tags`]: load balancer tags from cluster tags
//! - [`health_check`]: health check defaults and target rewriting

pub mod placement;
pub mod listeners;
pub mod tags;
pub mod health_check;

pub use placement::{PlacementDecision, decide_placement};
pub use listeners::{DEFAULT_LISTENER_PORT, build_listeners, listener_ports};
pub use tags::{NAME_TAG_KEY, build_tags};
