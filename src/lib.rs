//! Strata - declarative ECS stack definitions compiled to CloudFormation templates
//!
//! Strata models a load-balanced, autoscaled containerized service stack (VPC,
//! load balancer, ECS cluster, Fargate service, DNS/TLS wiring, cross-stack
//! outputs) as a single parameterized [`StackDefinition`](stack::StackDefinition)
//! and synthesizes it into a CloudFormation-shaped deployment template.
//!
//! Nothing here talks to a cloud provider. The output of this crate is a
//! declaration: a validated resource graph rendered as a template. Deployment,
//! rollback, certificate issuance, and DNS propagation all belong to the
//! provider's control plane and are out of scope.
//!
//! # Architecture
//!
//! Construction is linear and fail-fast. The stack builder declares resources
//! in strict dependency order (network, then edge/DNS, then cluster, then
//! service, then autoscaling, then outputs) and every declaration returns an
//! explicit handle that later phases thread as arguments. There is no ambient
//! registration context: a resource that was never declared cannot be
//! referenced.
//!
//! # Modules
//!
//! - [`config`] - Stack configuration and revision presets
//! - [`spec`] - Typed resource descriptors (network, DNS, cluster, service, scaling)
//! - [`graph`] - Resource graph with explicit handles and reference validation
//! - [`stack`] - The stack definition builder
//! - [`synth`] - Template assembly and rendering
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod graph;
pub mod spec;
pub mod stack;
pub mod synth;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Stack Policy Constants
// =============================================================================
// These constants pin the numeric and identifier policy of the stack. They are
// centralized here so presets, spec defaults, and test fixtures agree.

/// Default VPC CIDR block
pub const DEFAULT_CIDR: &str = "10.0.0.0/24";

/// Default maximum number of availability zones
pub const DEFAULT_MAX_AZS: u8 = 2;

/// Default subnet mask for both subnet groups (/26 carves four usable blocks
/// out of a /24: two groups across two AZs)
pub const DEFAULT_SUBNET_MASK: u8 = 26;

/// Name of the public subnet group
pub const PUBLIC_SUBNET_GROUP: &str = "Public-Subnet";

/// Name of the private isolated subnet group
pub const PRIVATE_SUBNET_GROUP: &str = "Private-Subnet";

/// Default Fargate task CPU units
pub const DEFAULT_TASK_CPU: u32 = 512;

/// Default Fargate task memory in MiB
pub const DEFAULT_TASK_MEMORY_MIB: u32 = 1024;

/// Default desired task count
pub const DEFAULT_DESIRED_COUNT: u32 = 1;

/// Default autoscaling floor
pub const DEFAULT_MIN_CAPACITY: u32 = 1;

/// Default autoscaling ceiling
pub const DEFAULT_MAX_CAPACITY: u32 = 20;

/// Default target utilization percentage for both CPU and memory scaling rules
pub const DEFAULT_TARGET_UTILIZATION: u32 = 50;

/// Default service discovery namespace name
pub const DEFAULT_NAMESPACE_NAME: &str = "service.local";

/// Default hosted zone domain used by the TLS presets
pub const DEFAULT_DOMAIN_NAME: &str = "cdkdemo.techmonkey.pro";

/// Container image used by the baseline revision
pub const BASELINE_IMAGE: &str = "amazon/amazon-ecs-sample";

/// Container image used by the TLS and service discovery revisions
pub const PUBLIC_NGINX_IMAGE: &str = "public.ecr.aws/nginx/nginx:latest";
