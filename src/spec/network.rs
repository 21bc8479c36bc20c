//! Virtual network and subnet group descriptors

use std::net::Ipv4Addr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_CIDR, DEFAULT_MAX_AZS, DEFAULT_SUBNET_MASK, PRIVATE_SUBNET_GROUP, PUBLIC_SUBNET_GROUP,
};

/// Subnet group visibility
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum SubnetVisibility {
    /// Routed to an internet gateway, instances get public addresses on launch
    Public,
    /// No route out of the network at all
    PrivateIsolated,
    /// Outbound-only internet access through a NAT gateway
    PrivateWithNat,
}

impl std::fmt::Display for SubnetVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::PrivateIsolated => write!(f, "private-isolated"),
            Self::PrivateWithNat => write!(f, "private-with-nat"),
        }
    }
}

/// A named partition of the network, stamped out once per availability zone
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSpec {
    /// Subnet group name
    pub name: String,

    /// Visibility of the group
    pub visibility: SubnetVisibility,

    /// Address mask size for each subnet in the group
    pub cidr_mask: u8,
}

/// Isolated address space partitioned into subnet groups across availability
/// zones
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    /// CIDR block for the whole network
    pub cidr: String,

    /// Maximum number of availability zones to span
    pub max_azs: u8,

    /// Enable DNS resolution inside the network
    pub enable_dns_support: bool,

    /// Assign DNS hostnames to instances
    pub enable_dns_hostnames: bool,

    /// Subnet groups, carved out of the CIDR block in order
    pub subnets: Vec<SubnetSpec>,
}

impl Default for NetworkSpec {
    /// The fixed network policy of the stack: `10.0.0.0/24` split into /26
    /// blocks for a public and a private-isolated group across two AZs.
    fn default() -> Self {
        Self {
            cidr: DEFAULT_CIDR.to_string(),
            max_azs: DEFAULT_MAX_AZS,
            enable_dns_support: true,
            enable_dns_hostnames: true,
            subnets: vec![
                SubnetSpec {
                    name: PUBLIC_SUBNET_GROUP.to_string(),
                    visibility: SubnetVisibility::Public,
                    cidr_mask: DEFAULT_SUBNET_MASK,
                },
                SubnetSpec {
                    name: PRIVATE_SUBNET_GROUP.to_string(),
                    visibility: SubnetVisibility::PrivateIsolated,
                    cidr_mask: DEFAULT_SUBNET_MASK,
                },
            ],
        }
    }
}

/// A concrete subnet produced by [`NetworkSpec::allocate`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatedSubnet {
    /// Subnet group this block belongs to
    pub group: String,
    /// Visibility inherited from the group
    pub visibility: SubnetVisibility,
    /// Zero-based availability zone index within the region
    pub az_index: u8,
    /// CIDR block of this subnet
    pub cidr: String,
}

impl NetworkSpec {
    /// Validate the network specification
    pub fn validate(&self) -> crate::Result<()> {
        let (_, prefix) = parse_cidr(&self.cidr)?;

        if self.max_azs == 0 {
            return Err(crate::Error::validation(
                "network must span at least one availability zone",
            ));
        }
        if self.enable_dns_hostnames && !self.enable_dns_support {
            return Err(crate::Error::validation(
                "DNS hostnames require DNS support to be enabled",
            ));
        }
        if self.subnets.is_empty() {
            return Err(crate::Error::validation(
                "network must declare at least one subnet group",
            ));
        }

        let mut seen = Vec::new();
        for subnet in &self.subnets {
            if subnet.name.trim().is_empty() {
                return Err(crate::Error::validation("subnet group name must not be empty"));
            }
            if seen.contains(&subnet.name.as_str()) {
                return Err(crate::Error::validation(format!(
                    "duplicate subnet group name: {}",
                    subnet.name
                )));
            }
            seen.push(subnet.name.as_str());

            if subnet.cidr_mask < prefix || subnet.cidr_mask > 28 {
                return Err(crate::Error::validation(format!(
                    "subnet group {} mask /{} must be within /{} to /28",
                    subnet.name, subnet.cidr_mask, prefix
                )));
            }
        }

        // Allocation is the real capacity check: every group is stamped out
        // once per AZ and all blocks must fit the parent CIDR.
        self.allocate(self.max_azs)?;
        Ok(())
    }

    /// Deterministically carve subnet blocks out of the network CIDR
    ///
    /// Blocks are allocated sequentially, group by group and AZ by AZ, the
    /// same way every time. Fails when the groups do not fit the parent block.
    pub fn allocate(&self, azs: u8) -> crate::Result<Vec<AllocatedSubnet>> {
        let (base, prefix) = parse_cidr(&self.cidr)?;
        let network_size: u64 = 1 << (32 - u32::from(prefix));

        let mut allocated = Vec::new();
        let mut offset: u64 = 0;
        for subnet in &self.subnets {
            let block_size: u64 = 1 << (32 - u32::from(subnet.cidr_mask));
            for az_index in 0..azs {
                if offset + block_size > network_size {
                    return Err(crate::Error::validation(format!(
                        "subnet group {} (AZ {}) does not fit in {}: /{} blocks exhausted the address space",
                        subnet.name, az_index, self.cidr, subnet.cidr_mask
                    )));
                }
                let block_base = Ipv4Addr::from(u32::from(base) + offset as u32);
                allocated.push(AllocatedSubnet {
                    group: subnet.name.clone(),
                    visibility: subnet.visibility,
                    az_index,
                    cidr: format!("{}/{}", block_base, subnet.cidr_mask),
                });
                offset += block_size;
            }
        }
        Ok(allocated)
    }

    /// Find a subnet group by name
    pub fn group(&self, name: &str) -> Option<&SubnetSpec> {
        self.subnets.iter().find(|s| s.name == name)
    }

    /// Whether the named subnet group has a NAT path to the internet
    ///
    /// Tasks placed in a group without NAT cannot pull container images unless
    /// they get a public IP.
    pub fn group_has_nat(&self, name: &str) -> bool {
        self.group(name)
            .map(|s| s.visibility == SubnetVisibility::PrivateWithNat)
            .unwrap_or(false)
    }
}

/// Parse an IPv4 CIDR string into its base address and prefix length
fn parse_cidr(cidr: &str) -> crate::Result<(Ipv4Addr, u8)> {
    let (addr, prefix) = cidr.split_once('/').ok_or_else(|| {
        crate::Error::validation(format!("malformed CIDR {cidr}: expected a.b.c.d/prefix"))
    })?;
    let addr: Ipv4Addr = addr
        .parse()
        .map_err(|_| crate::Error::validation(format!("malformed CIDR {cidr}: invalid address")))?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|_| crate::Error::validation(format!("malformed CIDR {cidr}: invalid prefix")))?;
    if prefix > 32 {
        return Err(crate::Error::validation(format!(
            "malformed CIDR {cidr}: prefix /{prefix} out of range"
        )));
    }
    // Base must sit on its block boundary
    let mask: u32 = if prefix == 0 { 0 } else { u32::MAX << (32 - u32::from(prefix)) };
    if u32::from(addr) & !mask != 0 {
        return Err(crate::Error::validation(format!(
            "malformed CIDR {cidr}: address is not aligned to /{prefix}"
        )));
    }
    Ok((addr, prefix))
}
