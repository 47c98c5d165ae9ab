//! Convenient re-exports for downstream crates.

pub use crate::config::CompilerConfig;
pub use crate::contract::{Contract, ContractKind, Plan};
pub use crate::error::{Error, Result};
pub use crate::fields::{Direction, FieldList, FieldSet, KeyOrder};
pub use crate::hints::EstimateHints;
pub use crate::id::ContractId;
pub use crate::instance::{
    ClusterInfo, FixedClusterInfo, HardwareDescription, InstanceTypeDescription,
};
pub use crate::statistics::{BasicStatistics, DataStatistics, SourceStats};
