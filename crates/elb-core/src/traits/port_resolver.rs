// # Port Resolver Trait
//
// Finds the container the load balancer forwards to.
//
// ## Implementations
//
// - First mapped port: `elb_core::resolvers::FirstExposedPortResolver`

use serde::{Deserialize, Serialize};

use crate::definition::PushDefinition;

/// The externally reachable container of a push definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedContainer {
    /// Container name
    pub container_name: String,
    /// Port assigned on the instance; listeners forward here
    pub host_port: u16,
    /// Port inside the container
    pub container_port: u16,
}

/// Trait for port resolver implementations
///
/// Resolution is a pure lookup over the definition; no I/O.
pub trait PortResolver: Send + Sync {
    /// Find the container exposed through the load balancer
    ///
    /// # Returns
    ///
    /// - `Ok(ExposedContainer)`: the exposed container and its ports
    /// - `Err(Error::Resolution)`: no usable container
    fn find_exposed_container(
        &self,
        definition: &PushDefinition,
    ) -> Result<ExposedContainer, crate::Error>;
}
