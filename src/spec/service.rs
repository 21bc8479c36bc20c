//! Load-balanced containerized service descriptor

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::network::NetworkSpec;
use crate::{
    DEFAULT_DESIRED_COUNT, DEFAULT_TASK_CPU, DEFAULT_TASK_MEMORY_MIB, PUBLIC_SUBNET_GROUP,
};

/// A running, load-balanced set of container instances
///
/// Bound to the cluster and a subnet selection; owns the scalable target
/// attached after creation.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Number of task instances to keep running
    pub desired_count: u32,

    /// CPU units per task
    pub cpu: u32,

    /// Memory per task in MiB
    pub memory_mib: u32,

    /// Container image reference, pulled at task-launch time
    pub image: String,

    /// Port the container listens on
    pub container_port: u16,

    /// Subnet group the tasks are placed in
    pub task_subnet_group: String,

    /// Assign public IPs to tasks
    ///
    /// Required for image pulls when the subnet selection has no NAT gateway.
    pub assign_public_ip: bool,

    /// Redirect HTTP to HTTPS on the load balancer
    #[serde(default)]
    pub redirect_http: bool,

    /// Public domain the service is reachable under, when TLS is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
}

impl Default for ServiceSpec {
    /// The fixed task policy of the stack: one 512 CPU / 1024 MiB task in the
    /// public subnet group.
    fn default() -> Self {
        Self {
            desired_count: DEFAULT_DESIRED_COUNT,
            cpu: DEFAULT_TASK_CPU,
            memory_mib: DEFAULT_TASK_MEMORY_MIB,
            image: crate::PUBLIC_NGINX_IMAGE.to_string(),
            container_port: 80,
            task_subnet_group: PUBLIC_SUBNET_GROUP.to_string(),
            assign_public_ip: false,
            redirect_http: false,
            domain_name: None,
        }
    }
}

/// Valid Fargate CPU/memory combinations (CPU units, MiB range inclusive)
const FARGATE_SIZES: &[(u32, u32, u32)] = &[
    (256, 512, 2048),
    (512, 1024, 4096),
    (1024, 2048, 8192),
    (2048, 4096, 16384),
    (4096, 8192, 30720),
];

impl ServiceSpec {
    /// Validate the service specification
    pub fn validate(&self) -> crate::Result<()> {
        if self.desired_count == 0 {
            return Err(crate::Error::validation("desired count must be at least 1"));
        }
        if self.image.trim().is_empty() {
            return Err(crate::Error::validation("image reference must not be empty"));
        }
        if self.task_subnet_group.trim().is_empty() {
            return Err(crate::Error::validation("task subnet group must not be empty"));
        }

        let Some((_, min_mem, max_mem)) =
            FARGATE_SIZES.iter().find(|(cpu, _, _)| *cpu == self.cpu)
        else {
            return Err(crate::Error::validation(format!(
                "cpu {} is not a valid Fargate task size (256, 512, 1024, 2048, 4096)",
                self.cpu
            )));
        };
        if self.memory_mib < *min_mem || self.memory_mib > *max_mem {
            return Err(crate::Error::validation(format!(
                "memory {} MiB is out of range for cpu {}: expected {} to {} MiB",
                self.memory_mib, self.cpu, min_mem, max_mem
            )));
        }
        Ok(())
    }

    /// Validate that tasks in this service can reach the container registry
    ///
    /// Image pulls happen at task-launch time. A task in a subnet group
    /// without a NAT gateway can only reach the registry through a public IP,
    /// so the two settings must never be deployed independently of each other.
    pub fn validate_reachability(&self, network: &NetworkSpec) -> crate::Result<()> {
        if network.group(&self.task_subnet_group).is_none() {
            return Err(crate::Error::validation(format!(
                "task subnet group {} is not declared by the network",
                self.task_subnet_group
            )));
        }
        if !network.group_has_nat(&self.task_subnet_group) && !self.assign_public_ip {
            return Err(crate::Error::validation(format!(
                "subnet group {} has no NAT gateway: tasks must assign public IPs or image pulls will fail",
                self.task_subnet_group
            )));
        }
        Ok(())
    }
}
