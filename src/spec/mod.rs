//! Typed resource descriptors
//!
//! These are the declarative entities the stack is composed of. They carry no
//! runtime behavior: each one validates its own shape and is later lowered to
//! template resources by the stack builder.

mod cluster;
mod dns;
mod network;
mod scaling;
mod service;

pub use cluster::{ClusterSpec, NamespaceSpec};
pub use dns::{CertificateSpec, HostedZoneLookup, ValidationMethod};
pub use network::{AllocatedSubnet, NetworkSpec, SubnetSpec, SubnetVisibility};
pub use scaling::AutoscalingSpec;
pub use service::ServiceSpec;
