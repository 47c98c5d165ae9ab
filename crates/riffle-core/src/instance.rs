//! Cluster instance descriptions and the cluster-information interface.
//!
//! The RPC transport that talks to a live job manager is the caller's
//! concern; the compiler only consumes the [`ClusterInfo`] trait.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

/// Hardware figures reported for one instance type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareDescription {
    pub free_memory_bytes: u64,
    pub num_cores: u32,
}

/// One schedulable instance type with its availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceTypeDescription {
    /// Stable identifier of the instance type.
    pub identifier: String,
    /// Hardware figures; `None` when the cluster has not reported any yet.
    pub hardware: Option<HardwareDescription>,
    /// Maximum number of instances of this type currently available.
    pub max_instances: u32,
}

/// Provider of the instance types available in the target cluster.
///
/// `instance_types` may block; the compiler invokes it from a worker thread
/// and bounds the wait.
pub trait ClusterInfo: Send + Sync {
    fn instance_types(&self) -> Result<BTreeMap<String, InstanceTypeDescription>>;
}

/// Fixed instance map, useful for local setups and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedClusterInfo {
    types: BTreeMap<String, InstanceTypeDescription>,
}

impl FixedClusterInfo {
    pub fn new(types: BTreeMap<String, InstanceTypeDescription>) -> Self {
        Self { types }
    }

    pub fn single(description: InstanceTypeDescription) -> Self {
        let mut types = BTreeMap::new();
        types.insert(description.identifier.clone(), description);
        Self { types }
    }
}

impl ClusterInfo for FixedClusterInfo {
    fn instance_types(&self) -> Result<BTreeMap<String, InstanceTypeDescription>> {
        Ok(self.types.clone())
    }
}
