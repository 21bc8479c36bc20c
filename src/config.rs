//! Stack configuration and revision presets
//!
//! Four historical revisions of the stack exist; rather than four copies,
//! they are modeled as one parameterized [`StackConfig`] with one named
//! preset per revision:
//!
//! - [`StackConfig::baseline`] - explicit load balancer, plain HTTP, sample image
//! - [`StackConfig::with_tls`] - implicit load balancer, DNS zone + certificate, HTTPS
//! - [`StackConfig::service_discovery`] - named cluster, Cloud Map namespace,
//!   container insights, cross-stack outputs
//! - [`StackConfig::network_only`] - network declarations only

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{BASELINE_IMAGE, DEFAULT_DOMAIN_NAME, PUBLIC_NGINX_IMAGE};

/// Target deployment environment (account + region)
///
/// Supplied once at the top level and threaded down to the stack definition.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Target account identifier
    pub account: String,

    /// Target region identifier
    pub region: String,
}

impl Environment {
    /// Create a new environment
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account, self.region)
    }
}

/// How the service's load balancer is provisioned
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum LoadBalancerMode {
    /// The stack declares the load balancer itself and hands it to the service
    Explicit,
    /// The load-balanced service pattern provisions its own load balancer
    #[default]
    Implicit,
}

impl std::fmt::Display for LoadBalancerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::Implicit => write!(f, "implicit"),
        }
    }
}

/// Parameterized stack options
///
/// Each historical revision of the stack is one preset of this struct. The
/// fields are recognized options, not free-form extension points: everything
/// else about the stack (CIDR, task sizing, scaling bounds) is fixed policy.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StackConfig {
    /// Enable the DNS hosted-zone lookup, certificate, and HTTPS listener
    /// with HTTP to HTTPS redirect
    #[serde(default)]
    pub enable_tls: bool,

    /// Enable the Cloud Map service-discovery namespace and container insights
    #[serde(default)]
    pub enable_service_discovery: bool,

    /// Enable the fixed set of cross-stack outputs
    #[serde(default)]
    pub enable_outputs: bool,

    /// How the load balancer is provisioned
    #[serde(default)]
    pub load_balancer_mode: LoadBalancerMode,

    /// Container image reference, pulled at task-launch time
    #[serde(default = "default_image")]
    pub image: String,

    /// Externally owned hosted zone domain, looked up (never created) when
    /// TLS is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,

    /// Declare only the network, for composition with separately deployed
    /// stacks
    #[serde(default)]
    pub network_only: bool,
}

fn default_image() -> String {
    PUBLIC_NGINX_IMAGE.to_string()
}

impl Default for StackConfig {
    fn default() -> Self {
        Self::with_tls()
    }
}

impl StackConfig {
    /// Revision 1: explicit load balancer, plain HTTP, sample public image,
    /// no DNS/TLS, no outputs
    pub fn baseline() -> Self {
        Self {
            enable_tls: false,
            enable_service_discovery: false,
            enable_outputs: false,
            load_balancer_mode: LoadBalancerMode::Explicit,
            image: BASELINE_IMAGE.to_string(),
            domain_name: None,
            network_only: false,
        }
    }

    /// Revision 2: implicit load balancer, hosted-zone lookup and certificate,
    /// HTTPS with HTTP redirect, public registry image
    pub fn with_tls() -> Self {
        Self {
            enable_tls: true,
            enable_service_discovery: false,
            enable_outputs: false,
            load_balancer_mode: LoadBalancerMode::Implicit,
            image: PUBLIC_NGINX_IMAGE.to_string(),
            domain_name: Some(DEFAULT_DOMAIN_NAME.to_string()),
            network_only: false,
        }
    }

    /// Revision 3: revision 2 plus named cluster, service-discovery
    /// namespace, container insights, and cross-stack outputs
    pub fn service_discovery() -> Self {
        Self {
            enable_service_discovery: true,
            enable_outputs: true,
            ..Self::with_tls()
        }
    }

    /// Revision 4: network declarations only
    ///
    /// The source revision declares nothing past the network. Whether it is an
    /// abandoned refactor or a deliberate network-only stack for cross-stack
    /// composition is unknown, so it is surfaced as its own preset rather than
    /// merged into another one.
    pub fn network_only() -> Self {
        Self {
            enable_tls: false,
            enable_service_discovery: false,
            enable_outputs: false,
            load_balancer_mode: LoadBalancerMode::Implicit,
            image: PUBLIC_NGINX_IMAGE.to_string(),
            domain_name: None,
            network_only: true,
        }
    }

    /// Look up a preset by name
    ///
    /// Recognized names: `baseline`, `tls`, `service-discovery`, `network-only`.
    pub fn preset(name: &str) -> crate::Result<Self> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "tls" => Ok(Self::with_tls()),
            "service-discovery" => Ok(Self::service_discovery()),
            "network-only" => Ok(Self::network_only()),
            other => Err(crate::Error::config(format!(
                "unknown preset: {other}, expected one of: baseline, tls, service-discovery, network-only"
            ))),
        }
    }

    /// Validate internal consistency of the configuration
    ///
    /// TLS needs a domain to issue a certificate for, and the HTTPS listener
    /// with redirect is owned by the service pattern, so TLS also requires the
    /// implicit load balancer mode. A network-only stack has no service to
    /// discover or export outputs from.
    pub fn validate(&self) -> crate::Result<()> {
        if self.enable_tls && self.domain_name.is_none() {
            return Err(crate::Error::validation(
                "enable_tls requires a domain name for the hosted-zone lookup and certificate",
            ));
        }
        if self.enable_tls && self.load_balancer_mode == LoadBalancerMode::Explicit {
            return Err(crate::Error::validation(
                "enable_tls requires the implicit load balancer mode - the service pattern owns the HTTPS listener and redirect",
            ));
        }
        if self.enable_outputs && !self.enable_service_discovery {
            return Err(crate::Error::validation(
                "enable_outputs exports the namespace identity - enable_service_discovery is required",
            ));
        }
        if self.network_only && (self.enable_tls || self.enable_service_discovery || self.enable_outputs)
        {
            return Err(crate::Error::validation(
                "network_only declares no cluster or service - tls, service discovery, and outputs cannot be enabled",
            ));
        }
        if self.image.trim().is_empty() {
            return Err(crate::Error::validation("image reference must not be empty"));
        }
        Ok(())
    }
}
