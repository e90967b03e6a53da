//! Plugin-based component registry
//!
//! The registry lets control planes and DNS registrars be registered at
//! runtime and created from configuration by type name.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use elb_core::registry::ComponentRegistry;
//!
//! let registry = ComponentRegistry::with_builtins();
//! elb_control_aws::register(&registry);
//! elb_registrar_cloudflare::register(&registry);
//!
//! let api = registry.create_control_plane(&config.control_plane)?;
//! let registrar = registry.create_registrar(&config.registrar)?;
//! ```
//!
//! ## Registration
//!
//! Adapter crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ComponentRegistry) {
//!     registry.register_registrar("cloudflare", Box::new(CloudflareFactory));
//! }
//! ```

use crate::config::{ControlPlaneConfig, RegistrarConfig};
use crate::control_plane::MemoryControlPlaneFactory;
use crate::error::{Error, Result};
use crate::registrar::DisabledRegistrarFactory;
use crate::traits::{DnsRegistrar, DnsRegistrarFactory, LoadBalancerApi, LoadBalancerApiFactory};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry of control plane and registrar factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered control plane factories
    control_planes: RwLock<HashMap<String, Box<dyn LoadBalancerApiFactory>>>,

    /// Registered DNS registrar factories
    registrars: RwLock<HashMap<String, Box<dyn DnsRegistrarFactory>>>,
}

// A panic while holding a registry lock cannot leave a map half-written,
// so a poisoned lock is still safe to use.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the core's own components registered
    ///
    /// - control plane `memory`
    /// - registrar `disabled`
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_control_plane("memory", Box::new(MemoryControlPlaneFactory));
        registry.register_registrar("disabled", Box::new(DisabledRegistrarFactory));
        registry
    }

    /// Register a control plane factory
    ///
    /// # Parameters
    ///
    /// - `name`: Control plane type name (e.g., "aws", "memory")
    /// - `factory`: Factory object for creating control plane instances
    pub fn register_control_plane(
        &self,
        name: impl Into<String>,
        factory: Box<dyn LoadBalancerApiFactory>,
    ) {
        write(&self.control_planes).insert(name.into(), factory);
    }

    /// Register a DNS registrar factory
    ///
    /// # Parameters
    ///
    /// - `name`: Registrar type name (e.g., "cloudflare")
    /// - `factory`: Factory object for creating registrar instances
    pub fn register_registrar(&self, name: impl Into<String>, factory: Box<dyn DnsRegistrarFactory>) {
        write(&self.registrars).insert(name.into(), factory);
    }

    /// Create a control plane from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn LoadBalancerApi>)`: Created control plane
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_control_plane(&self, config: &ControlPlaneConfig) -> Result<Box<dyn LoadBalancerApi>> {
        let control_plane_type = config.type_name();
        let control_planes = read(&self.control_planes);

        let factory = control_planes.get(control_plane_type).ok_or_else(|| {
            Error::config(format!("Unknown control plane type: {}", control_plane_type))
        })?;

        factory.create(config)
    }

    /// Create a DNS registrar from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsRegistrar>)`: Created registrar
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_registrar(&self, config: &RegistrarConfig) -> Result<Box<dyn DnsRegistrar>> {
        let registrar_type = config.type_name();
        let registrars = read(&self.registrars);

        let factory = registrars
            .get(registrar_type)
            .ok_or_else(|| Error::config(format!("Unknown registrar type: {}", registrar_type)))?;

        factory.create(config)
    }

    /// List all registered control plane types
    pub fn list_control_planes(&self) -> Vec<String> {
        read(&self.control_planes).keys().cloned().collect()
    }

    /// List all registered registrar types
    pub fn list_registrars(&self) -> Vec<String> {
        read(&self.registrars).keys().cloned().collect()
    }

    /// Check if a control plane type is registered
    pub fn has_control_plane(&self, name: &str) -> bool {
        read(&self.control_planes).contains_key(name)
    }

    /// Check if a registrar type is registered
    pub fn has_registrar(&self, name: &str) -> bool {
        read(&self.registrars).contains_key(name)
    }
}
