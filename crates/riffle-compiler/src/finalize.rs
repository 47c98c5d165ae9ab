//! Plan finalization: winner extraction, topology wiring, and memory
//! assignment.
//!
//! The finalizer walks the winning root candidate, extracts the contained
//! sinks (a sink-joiner root contributes the sinks of its joiner chain and
//! is itself discarded), compacts the reachable candidates and channels
//! into a fresh arena, and wires the topology: every input channel learns
//! its target and is registered as outgoing at its source. Memory-consuming
//! nodes then split the instance memory in proportion to their weights.
//! Finalizing an already-finalized plan is a no-op.

use serde::Serialize;
use std::collections::BTreeMap;

use riffle_core::error::{Error, Result};
use riffle_core::hash::{hash_serde, Hash256};

use crate::candidate::{ChannelId, PlanCandidate, PlanId, PlanSpace};
use crate::graph::NodeKind;

/// The finished physical plan.
#[derive(Debug, Serialize)]
pub struct OptimizedPlan {
    pub job_name: String,
    /// Identifier of the instance type the plan is budgeted for.
    pub instance_type: String,
    pub memory_per_instance: u64,
    space: PlanSpace,
    pub sources: Vec<PlanId>,
    pub sinks: Vec<PlanId>,
    /// All plan nodes, ordered by their stable optimizer-node id.
    pub nodes: Vec<PlanId>,
}

impl OptimizedPlan {
    pub fn plan_node(&self, id: PlanId) -> &PlanCandidate {
        self.space.plan(id)
    }

    pub fn plan_node_mut(&mut self, id: PlanId) -> &mut PlanCandidate {
        self.space.plan_mut(id)
    }

    pub fn channel(&self, id: ChannelId) -> &crate::candidate::Channel {
        self.space.channel(id)
    }

    pub fn plan_nodes(&self) -> impl Iterator<Item = &PlanCandidate> {
        self.nodes.iter().map(|&id| self.space.plan(id))
    }

    /// Stable content hash of the plan; identical compilations produce
    /// identical fingerprints.
    pub fn fingerprint(&self) -> Result<Hash256> {
        hash_serde(self)
    }

    /// Wire the topology and assign memory. Idempotent: already-wired
    /// channels are left alone and memory assignment recomputes the same
    /// figures.
    pub fn finalize(&mut self) {
        for &node_id in &self.nodes {
            let inputs = self.space.plan(node_id).inputs.clone();
            for ch_id in inputs {
                if self.space.channel(ch_id).target.is_some() {
                    continue;
                }
                self.space.channel_mut(ch_id).target = Some(node_id);
                let source = self.space.channel(ch_id).source;
                self.space.plan_mut(source).outgoing.push(ch_id);
            }
        }

        let total_weight: u64 = self
            .nodes
            .iter()
            .map(|&id| self.space.plan(id).memory_consumer_weight as u64)
            .sum();
        if total_weight == 0 {
            return;
        }
        let memory_per_weight = self.memory_per_instance / total_weight;
        for &node_id in &self.nodes {
            let candidate = self.space.plan_mut(node_id);
            if candidate.memory_consumer_weight > 0 {
                let memory = memory_per_weight * candidate.memory_consumer_weight as u64
                    / candidate.subtasks_per_instance.max(1) as u64;
                candidate.memory_per_subtask = memory;
                tracing::debug!(
                    node = %candidate.name,
                    memory_mib = memory >> 20,
                    "assigned subtask memory"
                );
            }
        }
    }
}

/// Extract the winning plan rooted at `root` from the enumeration arena and
/// finalize it.
pub fn finalize_plan(
    space: &PlanSpace,
    root: PlanId,
    job_name: &str,
    instance_type: &str,
    memory_per_instance: u64,
) -> Result<OptimizedPlan> {
    let sinks = collect_sinks(space, root)?;

    // deterministic pre-order over the winning subgraph, sinks first
    let mut order: Vec<PlanId> = Vec::new();
    let mut seen: BTreeMap<PlanId, ()> = BTreeMap::new();
    let mut stack: Vec<PlanId> = sinks.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        if seen.insert(id, ()).is_some() {
            continue;
        }
        order.push(id);
        let candidate = space.plan(id);
        for &ch in candidate.inputs.iter().rev() {
            stack.push(space.channel(ch).source);
        }
    }

    // compact winners into a fresh arena
    let mut compact = PlanSpace::new();
    let mut plan_map: BTreeMap<PlanId, PlanId> = BTreeMap::new();
    for &old in &order {
        let mut candidate = space.plan(old).clone();
        candidate.inputs = Vec::with_capacity(space.plan(old).inputs.len());
        candidate.outgoing.clear();
        candidate.branch_choices.clear();
        let new = compact.add_plan(candidate);
        plan_map.insert(old, new);
    }
    for &old in &order {
        let input_channels = space.plan(old).inputs.clone();
        for ch_id in input_channels {
            let channel = space.channel(ch_id);
            let mut copied = channel.clone();
            copied.source = plan_map[&channel.source];
            copied.target = None;
            let new_ch = compact.add_channel(copied);
            compact.plan_mut(plan_map[&old]).inputs.push(new_ch);
        }
    }

    let mut nodes: Vec<PlanId> = plan_map.values().copied().collect();
    nodes.sort_by_key(|&id| compact.plan(id).node_id);

    let sources = nodes
        .iter()
        .copied()
        .filter(|&id| matches!(compact.plan(id).kind, NodeKind::Source { .. }))
        .collect();
    let sinks = nodes
        .iter()
        .copied()
        .filter(|&id| matches!(compact.plan(id).kind, NodeKind::Sink))
        .collect();

    let mut plan = OptimizedPlan {
        job_name: job_name.to_string(),
        instance_type: instance_type.to_string(),
        memory_per_instance,
        space: compact,
        sources,
        sinks,
        nodes,
    };
    plan.finalize();
    Ok(plan)
}

/// The sinks contained in the winning root: the root itself for a
/// single-sink plan, or the sinks gathered from a sink-joiner chain.
fn collect_sinks(space: &PlanSpace, root: PlanId) -> Result<Vec<PlanId>> {
    let mut sinks = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let candidate = space.plan(id);
        match candidate.kind {
            NodeKind::Sink => sinks.push(id),
            NodeKind::SinkJoiner => {
                for &ch in candidate.inputs.iter().rev() {
                    stack.push(space.channel(ch).source);
                }
            }
            _ => {
                return Err(Error::Inconsistency(format!(
                    "winning root candidate is a {}, expected a sink or sink joiner",
                    candidate.kind.label()
                )))
            }
        }
    }
    if sinks.is_empty() {
        return Err(Error::Inconsistency(
            "winning plan contains no sinks".to_string(),
        ));
    }
    Ok(sinks)
}
