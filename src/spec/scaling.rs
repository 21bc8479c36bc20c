//! Autoscaling bounds and utilization rules

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_MAX_CAPACITY, DEFAULT_MIN_CAPACITY, DEFAULT_TARGET_UTILIZATION};

/// Capacity bounds and utilization-based scaling rules for the service
///
/// The CPU and memory rules are independent and can each act; no precedence
/// between them is defined here - arbitration is the provider's behavior, not
/// this declaration's.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingSpec {
    /// Minimum number of task instances
    pub min_capacity: u32,

    /// Maximum number of task instances
    pub max_capacity: u32,

    /// Target average CPU utilization percentage
    pub cpu_target_percent: u32,

    /// Target average memory utilization percentage
    pub memory_target_percent: u32,
}

impl Default for AutoscalingSpec {
    /// The fixed scaling policy of the stack: [1, 20] instances at 50%
    /// utilization for both CPU and memory.
    fn default() -> Self {
        Self {
            min_capacity: DEFAULT_MIN_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
            cpu_target_percent: DEFAULT_TARGET_UTILIZATION,
            memory_target_percent: DEFAULT_TARGET_UTILIZATION,
        }
    }
}

impl AutoscalingSpec {
    /// Validate the scaling bounds and targets
    pub fn validate(&self) -> crate::Result<()> {
        if self.min_capacity == 0 {
            return Err(crate::Error::validation("minimum capacity must be at least 1"));
        }
        if self.min_capacity > self.max_capacity {
            return Err(crate::Error::validation(format!(
                "minimum capacity {} exceeds maximum capacity {}",
                self.min_capacity, self.max_capacity
            )));
        }
        for (name, target) in [
            ("cpu", self.cpu_target_percent),
            ("memory", self.memory_target_percent),
        ] {
            if target == 0 || target > 100 {
                return Err(crate::Error::validation(format!(
                    "{name} target utilization {target}% must be within 1 to 100"
                )));
            }
        }
        Ok(())
    }
}
