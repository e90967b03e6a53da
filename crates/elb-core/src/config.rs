//! Configuration types for load balancer provisioning
//!
//! This module defines all configuration structures used throughout the crate.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main provisioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Tag key that receives the cluster's "Name" tag value
    #[serde(default = "default_cluster_tag_key")]
    pub cluster_tag_key: String,

    /// Load balancer control plane configuration
    #[serde(default)]
    pub control_plane: ControlPlaneConfig,

    /// DNS registrar configuration
    #[serde(default)]
    pub registrar: RegistrarConfig,

    /// Optional provisioner settings
    #[serde(default)]
    pub provisioner: ProvisionerSettings,
}

impl ProvisionConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            cluster_tag_key: default_cluster_tag_key(),
            control_plane: ControlPlaneConfig::default(),
            registrar: RegistrarConfig::default(),
            provisioner: ProvisionerSettings::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.cluster_tag_key.is_empty() {
            return Err(crate::Error::config("Cluster tag key cannot be empty"));
        }
        if self.cluster_tag_key == crate::policy::tags::NAME_TAG_KEY {
            return Err(crate::Error::config(
                "Cluster tag key cannot be \"Name\"; it would collide with the application name tag",
            ));
        }

        self.control_plane.validate()?;
        self.registrar.validate()?;
        self.provisioner.validate()?;

        Ok(())
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Load balancer control plane configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlPlaneConfig {
    /// AWS Classic Elastic Load Balancing
    Aws {
        /// AWS region (e.g., "us-east-1")
        region: String,
        /// Endpoint override (e.g., a VPC endpoint or a local emulator)
        endpoint: Option<String>,
    },

    /// In-process control plane (dry runs and tests)
    Memory,

    /// Custom control plane
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ControlPlaneConfig {
    /// Validate the control plane configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ControlPlaneConfig::Aws { region, endpoint } => {
                if region.is_empty() {
                    return Err(crate::Error::config("AWS region cannot be empty"));
                }
                if let Some(endpoint) = endpoint
                    && !endpoint.starts_with("https://")
                    && !endpoint.starts_with("http://")
                {
                    return Err(crate::Error::config(format!(
                        "AWS endpoint must use HTTP or HTTPS scheme. Got: {}",
                        endpoint
                    )));
                }
                Ok(())
            }
            ControlPlaneConfig::Custom { factory, config } => {
                validate_custom("control plane", factory, config)
            }
            ControlPlaneConfig::Memory => Ok(()),
        }
    }

    /// Get the control plane type name
    pub fn type_name(&self) -> &str {
        match self {
            ControlPlaneConfig::Aws { .. } => "aws",
            ControlPlaneConfig::Memory => "memory",
            ControlPlaneConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        ControlPlaneConfig::Aws {
            region: default_region(),
            endpoint: None,
        }
    }
}

/// DNS registrar configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistrarConfig {
    /// Cloudflare registrar (CNAME records)
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone ID (optional, can be auto-detected)
        zone_id: Option<String>,
        /// Proxy the record through Cloudflare
        #[serde(default)]
        proxied: bool,
        /// Record TTL in seconds
        #[serde(default = "default_record_ttl")]
        ttl: u32,
    },

    /// DNS is managed outside this system; registration is logged only
    #[default]
    Disabled,

    /// Custom registrar
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl RegistrarConfig {
    /// Validate the registrar configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            RegistrarConfig::Cloudflare { api_token, ttl, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                // 1 means "automatic" to Cloudflare
                if *ttl != 1 && !(60..=86400).contains(ttl) {
                    return Err(crate::Error::config(format!(
                        "Cloudflare record TTL must be 1 (auto) or between 60 and 86400. Got: {}",
                        ttl
                    )));
                }
                Ok(())
            }
            RegistrarConfig::Custom { factory, config } => {
                validate_custom("registrar", factory, config)
            }
            RegistrarConfig::Disabled => Ok(()),
        }
    }

    /// Get the registrar type name
    pub fn type_name(&self) -> &str {
        match self {
            RegistrarConfig::Cloudflare { .. } => "cloudflare",
            RegistrarConfig::Disabled => "disabled",
            RegistrarConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Provisioner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionerSettings {
    /// Capacity of the progress event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ProvisionerSettings {
    /// Validate the provisioner settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for ProvisionerSettings {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn validate_custom(kind: &str, factory: &str, config: &serde_json::Value) -> Result<(), crate::Error> {
    if factory.is_empty() {
        return Err(crate::Error::config(format!(
            "Custom {} factory cannot be empty",
            kind
        )));
    }
    if config.is_null() {
        return Err(crate::Error::config(format!(
            "Custom {} config cannot be null",
            kind
        )));
    }
    Ok(())
}

/// Read and parse a JSON document from disk
///
/// Any failure is reported as a configuration error naming the path.
pub(crate) async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, crate::Error> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        crate::Error::config(format!("Failed to read {}: {}", path.display(), e))
    })?;

    serde_json::from_str(&contents).map_err(|e| {
        crate::Error::config(format!("Failed to parse {}: {}", path.display(), e))
    })
}

fn default_cluster_tag_key() -> String {
    "Cluster".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_record_ttl() -> u32 {
    300
}

fn default_event_channel_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ProvisionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cluster_tag_key, "Cluster");
        assert_eq!(config.control_plane.type_name(), "aws");
        assert_eq!(config.registrar.type_name(), "disabled");
    }

    #[test]
    fn name_is_not_a_valid_cluster_tag_key() {
        let config = ProvisionConfig {
            cluster_tag_key: "Name".to_string(),
            ..ProvisionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn registrar_config_is_internally_tagged() {
        let json = r#"{ "type": "cloudflare", "api_token": "abc", "zone_id": null }"#;
        let config: RegistrarConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config,
            RegistrarConfig::Cloudflare {
                api_token: "abc".to_string(),
                zone_id: None,
                proxied: false,
                ttl: 300,
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_endpoint_and_ttl() {
        let control_plane = ControlPlaneConfig::Aws {
            region: "us-east-1".to_string(),
            endpoint: Some("localhost:4566".to_string()),
        };
        assert!(control_plane.validate().is_err());

        let registrar = RegistrarConfig::Cloudflare {
            api_token: "abc".to_string(),
            zone_id: None,
            proxied: false,
            ttl: 5,
        };
        assert!(registrar.validate().is_err());
    }

    #[test]
    fn custom_config_requires_factory() {
        let config = ControlPlaneConfig::Custom {
            factory: String::new(),
            config: serde_json::json!({}),
        };
        assert!(config.validate().is_err());
    }
}
