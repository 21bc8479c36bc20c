//! Container cluster and service-discovery namespace descriptors

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Service-discovery namespace created as part of the cluster
///
/// Its ARN and identifiers only exist after synthesis; the outputs module
/// reads them back as late-bound references.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSpec {
    /// Namespace name, e.g. `service.local`
    pub name: String,
}

impl NamespaceSpec {
    /// Create a namespace spec
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Logical grouping for containerized workloads, bound to the network
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Explicit cluster name; the provider generates one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Enable container insights monitoring
    #[serde(default)]
    pub container_insights: bool,

    /// Default service-discovery namespace for services in the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_namespace: Option<NamespaceSpec>,
}

impl ClusterSpec {
    /// Validate the cluster specification
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(crate::Error::validation("cluster name must not be empty"));
            }
        }
        if let Some(ns) = &self.default_namespace {
            if ns.name.trim().is_empty() {
                return Err(crate::Error::validation("namespace name must not be empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: The baseline cluster is anonymous and unmonitored
    ///
    /// Early stack revisions bind a bare cluster to the network; naming,
    /// insights, and the namespace arrive with service discovery.
    #[test]
    fn story_default_cluster_is_bare() {
        let cluster = ClusterSpec::default();
        assert!(cluster.name.is_none());
        assert!(!cluster.container_insights);
        assert!(cluster.default_namespace.is_none());
        assert!(cluster.validate().is_ok());
    }

    /// Story: The service-discovery cluster carries a namespace and insights
    #[test]
    fn story_service_discovery_cluster_shape() {
        let cluster = ClusterSpec {
            name: Some("demo-cluster".to_string()),
            container_insights: true,
            default_namespace: Some(NamespaceSpec::new("service.local")),
        };
        assert!(cluster.validate().is_ok());
        assert_eq!(cluster.default_namespace.unwrap().name, "service.local");
    }

    #[test]
    fn test_empty_cluster_name_fails() {
        let cluster = ClusterSpec {
            name: Some("  ".to_string()),
            ..ClusterSpec::default()
        };
        assert!(cluster.validate().is_err());
    }

    #[test]
    fn test_empty_namespace_name_fails() {
        let cluster = ClusterSpec {
            default_namespace: Some(NamespaceSpec::new("")),
            ..ClusterSpec::default()
        };
        assert!(cluster.validate().is_err());
    }

    #[test]
    fn test_cluster_serde_roundtrip() {
        let cluster = ClusterSpec {
            name: Some("demo-cluster".to_string()),
            container_insights: true,
            default_namespace: Some(NamespaceSpec::new("service.local")),
        };
        let json = serde_json::to_string(&cluster).unwrap();
        let parsed: ClusterSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(cluster, parsed);
    }
}
