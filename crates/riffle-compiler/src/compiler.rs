//! The compiler driver.
//!
//! [`PlanCompiler`] owns the configuration and the collaborators and runs
//! the phases in order: graph creation (with estimates), sink joining,
//! memory pre-budgeting, interesting-property descent, branch tracking,
//! alternative enumeration, finalization, post-pass. The compiler's fields
//! are read-only after construction, so one instance may serve any number
//! of compilations; each call carries its own traversal state.

use std::sync::Arc;

use riffle_core::config::{CompilerConfig, USABLE_MEMORY_FRACTION};
use riffle_core::contract::Plan;
use riffle_core::error::{Error, Result};
use riffle_core::instance::{ClusterInfo, InstanceTypeDescription};
use riffle_core::statistics::DataStatistics;

use crate::cluster;
use crate::costs::{CostEstimator, DefaultCostEstimator};
use crate::enumerate::Enumerator;
use crate::finalize::{finalize_plan, OptimizedPlan};
use crate::graph::{branches, budget, interesting, OptimizerGraph};
use crate::postpass::{DefaultPostPass, PostPass};

pub struct PlanCompiler {
    config: CompilerConfig,
    statistics: Option<Arc<dyn DataStatistics>>,
    estimator: Arc<dyn CostEstimator>,
    cluster: Option<Arc<dyn ClusterInfo>>,
}

impl PlanCompiler {
    /// Create a compiler with the default cost estimator and no statistics.
    /// Without statistics, optimization runs with unknown sizes and falls
    /// back to the most robust strategies.
    pub fn new(config: CompilerConfig) -> Result<Self> {
        if let Some(address) = &config.job_manager_address {
            if address.is_empty() {
                return Err(Error::Config(
                    "job manager address must not be empty".to_string(),
                ));
            }
        }
        if config.job_manager_port == 0 {
            return Err(Error::Config(
                "job manager port must not be zero".to_string(),
            ));
        }
        Ok(Self {
            config: config.normalized(),
            statistics: None,
            estimator: Arc::new(DefaultCostEstimator),
            cluster: None,
        })
    }

    pub fn with_statistics(mut self, statistics: Arc<dyn DataStatistics>) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn CostEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_cluster_info(mut self, cluster: Arc<dyn ClusterInfo>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile using the configured cluster-information provider and the
    /// default post-pass.
    pub fn compile(&self, plan: &Plan) -> Result<OptimizedPlan> {
        self.compile_with(plan, &DefaultPostPass)
    }

    /// Compile using the configured cluster-information provider and an
    /// explicit post-pass.
    pub fn compile_with(&self, plan: &Plan, post_pass: &dyn PostPass) -> Result<OptimizedPlan> {
        let provider = self.cluster.clone().ok_or_else(|| {
            Error::Config(
                "no cluster information provider configured; \
                 use compile_on or configure one"
                    .to_string(),
            )
        })?;
        let types = cluster::fetch_instance_types(provider, self.config.cluster_info_timeout())?;
        let instance = cluster::pick_instance_type(&types)?;
        self.compile_on(plan, &instance, post_pass)
    }

    /// Compile for an explicitly supplied instance type, skipping the
    /// cluster lookup.
    pub fn compile_on(
        &self,
        plan: &Plan,
        instance: &InstanceTypeDescription,
        post_pass: &dyn PostPass,
    ) -> Result<OptimizedPlan> {
        tracing::debug!(job = plan.job_name(), "beginning plan compilation");

        let hardware = instance.hardware.as_ref().ok_or_else(|| {
            Error::ClusterInfo(format!(
                "instance type '{}' reports no hardware description",
                instance.identifier
            ))
        })?;
        let memory_per_instance =
            (hardware.free_memory_bytes as f64 * USABLE_MEMORY_FRACTION) as u64;
        let num_instances = instance.max_instances as i32;

        let max_machines = self.reconcile_max_machines(plan, num_instances);
        let default_parallelism = self.reconcile_default_parallelism(plan, max_machines);

        tracing::debug!(
            default_parallelism,
            max_machines,
            max_intra_node_parallelism = self.config.max_intra_node_parallelism,
            memory_per_instance,
            "resolved compilation parameters"
        );

        let mut graph = OptimizerGraph::build(
            plan,
            self.statistics.as_deref(),
            max_machines,
            default_parallelism as u32,
            true,
        )?;

        budget::distribute_minimum_memory(&mut graph, memory_per_instance);
        interesting::propagate_interesting_properties(&mut graph, self.estimator.as_ref());
        branches::compute_branch_stacks(&mut graph);

        let (space, root) = Enumerator::new(&graph, self.estimator.as_ref()).run()?;

        let mut optimized = finalize_plan(
            &space,
            root,
            plan.job_name(),
            &instance.identifier,
            memory_per_instance,
        )?;

        post_pass.post_pass(&mut optimized)?;
        Ok(optimized)
    }

    /// Per-job machine limit, clamped by the global config and by the
    /// actually available instances.
    fn reconcile_max_machines(&self, plan: &Plan, num_instances: i32) -> i32 {
        let mut max_machines = plan.max_machines();

        if max_machines < 1 {
            max_machines = self.config.max_machines;
        } else if self.config.max_machines >= 1 {
            if max_machines > self.config.max_machines {
                tracing::warn!(
                    requested = max_machines,
                    configured = self.config.max_machines,
                    "plan requests more machines than the configuration allows, using the configured value"
                );
            }
            max_machines = max_machines.min(self.config.max_machines);
        }

        if max_machines < 1 {
            max_machines = num_instances;
        } else if max_machines > num_instances {
            max_machines = num_instances;
            tracing::info!(
                max_machines,
                "machine limit decreased because no more instances are available"
            );
        }
        max_machines
    }

    /// Per-job parallelism if declared, else the configured default, capped
    /// by what the machines can host.
    fn reconcile_default_parallelism(&self, plan: &Plan, max_machines: i32) -> i32 {
        let mut parallelism = if plan.default_parallelism() > 0 {
            plan.default_parallelism()
        } else {
            self.config.default_parallelism
        };

        let intra = self.config.max_intra_node_parallelism;
        if intra > 0 {
            let cap = max_machines * intra;
            if parallelism < 1 {
                parallelism = cap;
            } else if parallelism > cap {
                tracing::info!(
                    from = parallelism,
                    to = cap,
                    max_machines,
                    intra_node = intra,
                    "decreasing default parallelism to fit the available machines"
                );
                parallelism = cap;
            }
        } else if parallelism < 1 {
            parallelism = max_machines;
            tracing::info!(
                parallelism,
                "no default parallelism specified, using one task per instance"
            );
        }
        parallelism
    }
}
