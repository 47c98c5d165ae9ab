//! The cost model.
//!
//! Costs are vectors of network traffic, disk I/O, and CPU work (all in
//! byte-equivalents), reduced to a scalar through a fixed weighting for
//! comparisons. The [`CostEstimator`] is pluggable; the
//! [`DefaultCostEstimator`] uses coarse volume-based formulas: rows and
//! bytes in, a handful of constants, robust choices when statistics are
//! missing.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::candidate::{PlanId, PlanSpace};
use crate::graph::{Estimates, NodeKind, OptimizerGraph};
use crate::strategies::{LocalStrategy, ShipStrategy};

const NETWORK_WEIGHT: f64 = 1.5;
const DISK_WEIGHT: f64 = 1.0;
const CPU_WEIGHT: f64 = 0.2;

/// Substitute volume when a producer's output size is unknown. Large enough
/// that any strategy touching an unknown side looks expensive.
const UNKNOWN_BYTES: u64 = 1 << 40;

/// Surcharge on hash-table builds whose build side has unknown size; keeps
/// strategy selection on the robust sort-based path without statistics.
const UNKNOWN_BUILD_SURCHARGE: f64 = 4.0;

/// Bytes of the outer side a nested-loop pass holds resident at once.
const NESTED_LOOP_BLOCK_BYTES: f64 = 64.0 * 1024.0 * 1024.0;

/// Cost vector of a candidate or channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cost {
    pub network: f64,
    pub disk: f64,
    pub cpu: f64,
}

impl Cost {
    pub const ZERO: Cost = Cost {
        network: 0.0,
        disk: 0.0,
        cpu: 0.0,
    };

    pub fn new(network: f64, disk: f64, cpu: f64) -> Self {
        Self { network, disk, cpu }
    }

    pub fn weighted_total(&self) -> f64 {
        self.network * NETWORK_WEIGHT + self.disk * DISK_WEIGHT + self.cpu * CPU_WEIGHT
    }

    /// Total order over costs: by weighted total, then by the components so
    /// that equal totals still compare deterministically.
    pub fn total_order(&self, other: &Cost) -> Ordering {
        self.weighted_total()
            .total_cmp(&other.weighted_total())
            .then(self.network.total_cmp(&other.network))
            .then(self.disk.total_cmp(&other.disk))
            .then(self.cpu.total_cmp(&other.cpu))
    }
}

impl std::ops::Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost {
            network: self.network + rhs.network,
            disk: self.disk + rhs.disk,
            cpu: self.cpu + rhs.cpu,
        }
    }
}

impl std::ops::AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Cost {
    type Output = Cost;

    fn sub(self, rhs: Cost) -> Cost {
        Cost {
            network: self.network - rhs.network,
            disk: self.disk - rhs.disk,
            cpu: self.cpu - rhs.cpu,
        }
    }
}

/// Pluggable cost model.
pub trait CostEstimator: Send + Sync {
    /// Cost of the candidate itself: its input channels plus its local
    /// strategy. Input subplan costs are accumulated by the enumerator.
    fn cost(&self, graph: &OptimizerGraph, space: &PlanSpace, plan: PlanId) -> Cost;

    /// Upper bound on what establishing an interesting property early could
    /// save a consumer of a node with the given output estimates: one full
    /// repartition plus one sort of that output.
    fn maximal_property_cost(&self, estimates: &Estimates, target_dop: u32) -> Cost {
        let _ = target_dop;
        let bytes = estimates.output_bytes.unwrap_or(UNKNOWN_BYTES) as f64;
        Cost::new(bytes, 2.0 * bytes, bytes)
    }
}

/// Conservative volume-based default cost model.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCostEstimator;

impl DefaultCostEstimator {
    fn shipped_bytes(&self, graph: &OptimizerGraph, space: &PlanSpace, plan: PlanId) -> Vec<f64> {
        let cand = space.plan(plan);
        cand.inputs
            .iter()
            .map(|&ch| {
                let source = space.plan(space.channel(ch).source);
                graph.node(source.node).estimates.output_bytes.unwrap_or(UNKNOWN_BYTES) as f64
            })
            .collect()
    }

    fn input_known(&self, graph: &OptimizerGraph, space: &PlanSpace, plan: PlanId, i: usize) -> bool {
        let cand = space.plan(plan);
        let source = space.plan(space.channel(cand.inputs[i]).source);
        graph.node(source.node).estimates.output_bytes.is_some()
    }

    /// Bytes the local strategy sees for input `i`: a broadcast side is
    /// processed once per consumer subtask.
    fn local_bytes(&self, space: &PlanSpace, plan: PlanId, shipped: &[f64], i: usize) -> f64 {
        let cand = space.plan(plan);
        match space.channel(cand.inputs[i]).ship {
            ShipStrategy::Broadcast => shipped[i] * cand.dop as f64,
            _ => shipped[i],
        }
    }

    /// Whether the channel of input `i` already delivers the ordering the
    /// node's key fields ask for, making a sort on that side a no-op.
    fn input_presorted(&self, space: &PlanSpace, plan: PlanId, i: usize) -> bool {
        let cand = space.plan(plan);
        let keys = match (&cand.kind, i) {
            (NodeKind::Reduce { keys, .. }, _) => keys,
            (NodeKind::Match { keys_first, .. }, 0)
            | (NodeKind::CoGroup { keys_first, .. }, 0) => keys_first,
            (NodeKind::Match { keys_second, .. }, 1)
            | (NodeKind::CoGroup { keys_second, .. }, 1) => keys_second,
            _ => return false,
        };
        let order = riffle_core::fields::KeyOrder::ascending(keys);
        space.channel(cand.inputs[i]).local.is_ordered_on(&order)
    }
}

impl CostEstimator for DefaultCostEstimator {
    fn cost(&self, graph: &OptimizerGraph, space: &PlanSpace, plan: PlanId) -> Cost {
        let cand = space.plan(plan);
        let shipped = self.shipped_bytes(graph, space, plan);
        let mut cost = Cost::ZERO;

        for (i, &ch) in cand.inputs.iter().enumerate() {
            match &space.channel(ch).ship {
                ShipStrategy::Forward => {}
                ShipStrategy::PartitionHash(_) => cost.network += shipped[i],
                // range partitioning samples the data for the histogram
                ShipStrategy::PartitionRange(_) => {
                    cost.network += shipped[i] * 1.5;
                    cost.cpu += shipped[i] * 0.1;
                }
                ShipStrategy::Broadcast => cost.network += shipped[i] * cand.dop as f64,
            }
        }

        let sort = |bytes: f64, presorted: bool| -> Cost {
            if presorted {
                // streaming through the sorter still touches every record
                Cost::new(0.0, 0.0, 0.1 * bytes)
            } else {
                // spill once, read once
                Cost::new(0.0, 2.0 * bytes, bytes)
            }
        };

        match cand.local_strategy {
            LocalStrategy::None | LocalStrategy::Merge => {}
            LocalStrategy::Sort => {
                cost += sort(
                    self.local_bytes(space, plan, &shipped, 0),
                    self.input_presorted(space, plan, 0),
                );
            }
            LocalStrategy::CombiningSort => {
                // the combiner shrinks the spill volume
                let bytes = self.local_bytes(space, plan, &shipped, 0);
                if self.input_presorted(space, plan, 0) {
                    cost += Cost::new(0.0, 0.0, 0.1 * bytes);
                } else {
                    cost += Cost::new(0.0, bytes, bytes);
                }
            }
            LocalStrategy::SortBothMerge => {
                cost += sort(
                    self.local_bytes(space, plan, &shipped, 0),
                    self.input_presorted(space, plan, 0),
                );
                cost += sort(
                    self.local_bytes(space, plan, &shipped, 1),
                    self.input_presorted(space, plan, 1),
                );
            }
            LocalStrategy::SortFirstMerge => {
                cost += sort(
                    self.local_bytes(space, plan, &shipped, 0),
                    self.input_presorted(space, plan, 0),
                );
            }
            LocalStrategy::SortSecondMerge => {
                cost += sort(
                    self.local_bytes(space, plan, &shipped, 1),
                    self.input_presorted(space, plan, 1),
                );
            }
            LocalStrategy::HashBuildFirst | LocalStrategy::HashBuildSecond => {
                let build = if cand.local_strategy == LocalStrategy::HashBuildFirst {
                    0
                } else {
                    1
                };
                let probe = 1 - build;
                let mut build_bytes = self.local_bytes(space, plan, &shipped, build);
                if !self.input_known(graph, space, plan, build) {
                    build_bytes *= UNKNOWN_BUILD_SURCHARGE;
                }
                // hybrid hash: the build side may spill once
                cost += Cost::new(
                    0.0,
                    build_bytes,
                    build_bytes + self.local_bytes(space, plan, &shipped, probe),
                );
            }
            LocalStrategy::NestedLoopStreamedOuterFirst
            | LocalStrategy::NestedLoopStreamedOuterSecond
            | LocalStrategy::NestedLoopBlockedOuterFirst
            | LocalStrategy::NestedLoopBlockedOuterSecond => {
                let outer = match cand.local_strategy {
                    LocalStrategy::NestedLoopStreamedOuterFirst
                    | LocalStrategy::NestedLoopBlockedOuterFirst => 0,
                    _ => 1,
                };
                let inner = 1 - outer;
                let outer_bytes = self.local_bytes(space, plan, &shipped, outer);
                let inner_bytes = self.local_bytes(space, plan, &shipped, inner);
                let blocked = matches!(
                    cand.local_strategy,
                    LocalStrategy::NestedLoopBlockedOuterFirst
                        | LocalStrategy::NestedLoopBlockedOuterSecond
                );
                // the inner side is re-read once per resident block of the
                // outer side; the streamed variants keep a smaller window
                let window = if blocked {
                    NESTED_LOOP_BLOCK_BYTES
                } else {
                    NESTED_LOOP_BLOCK_BYTES / 4.0
                };
                let passes = (outer_bytes / window).ceil().max(1.0);
                let mut c = Cost::new(0.0, inner_bytes * passes, outer_bytes + inner_bytes);
                if blocked {
                    // blocking materializes the outer side once
                    c.disk += outer_bytes;
                }
                cost += c;
            }
        }

        cost
    }
}
