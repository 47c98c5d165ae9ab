//! Compiler configuration that callers can construct or read from the
//! environment.

use serde::{Deserialize, Serialize};

/// Fraction of an instance's reported free memory the compiler budgets.
/// The remainder accommodates rounding and runtime overheads.
pub const USABLE_MEMORY_FRACTION: f64 = 0.96;

/// Default memory for temp tasks, in MiB.
pub const DEFAULT_TEMP_TASK_MEMORY_MIB: u64 = 4;

/// Default bound on the cluster-information lookup.
pub const DEFAULT_CLUSTER_INFO_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Global cap on the number of machines a job may use; -1 means no cap.
    pub max_machines: i32,

    /// Default degree of parallelism for plans that do not declare one;
    /// values below 1 mean "derive from the machine count".
    pub default_parallelism: i32,

    /// Maximum subtasks that may share one instance; -1 means unlimited.
    /// 0 and values below -1 are invalid and replaced by the default.
    pub max_intra_node_parallelism: i32,

    /// Address of the job manager's RPC service, for cluster-info providers
    /// that talk to a live cluster.
    pub job_manager_address: Option<String>,

    /// Port of the job manager's RPC service.
    pub job_manager_port: u16,

    /// Memory granted to temp tasks, in MiB.
    pub temp_task_memory_mib: u64,

    /// Bound on the cluster-information lookup, in milliseconds.
    pub cluster_info_timeout_ms: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_machines: -1,
            default_parallelism: -1,
            max_intra_node_parallelism: -1,
            job_manager_address: None,
            job_manager_port: 6123,
            temp_task_memory_mib: DEFAULT_TEMP_TASK_MEMORY_MIB,
            cluster_info_timeout_ms: DEFAULT_CLUSTER_INFO_TIMEOUT_MS,
        }
    }
}

impl CompilerConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RIFFLE_MAX_MACHINES`
    /// - `RIFFLE_DEFAULT_PARALLELISM`
    /// - `RIFFLE_MAX_INTRA_NODE_PARALLELISM`
    /// - `RIFFLE_JOB_MANAGER_ADDRESS`
    /// - `RIFFLE_JOB_MANAGER_PORT`
    /// - `RIFFLE_TEMP_TASK_MEMORY_MIB`
    /// - `RIFFLE_CLUSTER_INFO_TIMEOUT_MS`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("RIFFLE_MAX_MACHINES") {
            if let Ok(v) = s.parse::<i32>() {
                cfg.max_machines = v;
            }
        }

        if let Ok(s) = std::env::var("RIFFLE_DEFAULT_PARALLELISM") {
            if let Ok(v) = s.parse::<i32>() {
                cfg.default_parallelism = v;
            }
        }

        if let Ok(s) = std::env::var("RIFFLE_MAX_INTRA_NODE_PARALLELISM") {
            if let Ok(v) = s.parse::<i32>() {
                cfg.max_intra_node_parallelism = v;
            }
        }

        if let Ok(s) = std::env::var("RIFFLE_JOB_MANAGER_ADDRESS") {
            if !s.is_empty() {
                cfg.job_manager_address = Some(s);
            }
        }

        if let Ok(s) = std::env::var("RIFFLE_JOB_MANAGER_PORT") {
            if let Ok(v) = s.parse::<u16>() {
                cfg.job_manager_port = v;
            }
        }

        if let Ok(s) = std::env::var("RIFFLE_TEMP_TASK_MEMORY_MIB") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.temp_task_memory_mib = v;
            }
        }

        if let Ok(s) = std::env::var("RIFFLE_CLUSTER_INFO_TIMEOUT_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.cluster_info_timeout_ms = v;
            }
        }

        cfg
    }

    /// Replace invalid knob values by their defaults, logging each
    /// replacement. Invalid intra-node parallelism is a recoverable mistake;
    /// everything fatal is checked by the compiler constructor instead.
    pub fn normalized(mut self) -> Self {
        if self.max_intra_node_parallelism == 0 || self.max_intra_node_parallelism < -1 {
            tracing::warn!(
                value = self.max_intra_node_parallelism,
                "invalid maximum intra-node parallelism, ignoring parameter"
            );
            self.max_intra_node_parallelism = -1;
        }
        self
    }

    pub fn cluster_info_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.cluster_info_timeout_ms)
    }
}
