//! Cluster metadata
//!
//! Network and tagging facts about the cluster a service is pushed to.
//! Owned by whatever provisioned the cluster; read-only here.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Key/value tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

impl Tag {
    /// Create a new tag
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Cluster-level network placement and tagging
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadata {
    /// Subnets for internet-facing load balancers
    #[serde(default)]
    pub public_subnets: Vec<String>,

    /// Private subnets for internal load balancers
    #[serde(default)]
    pub elb_subnets: Vec<String>,

    /// Standard load balancer security groups
    #[serde(default)]
    pub elb_security_groups: Vec<String>,

    /// Security groups admitting the Akamai CDN edge
    #[serde(default)]
    pub akamai_security_groups: Vec<String>,

    /// Tags from the cluster's stack
    #[serde(default)]
    pub cluster_stack_tags: Vec<Tag>,
}

impl ClusterMetadata {
    /// Load cluster metadata from a JSON file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::config::load_json(path.as_ref()).await
    }
}
