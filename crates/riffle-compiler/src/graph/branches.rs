//! Branch tracking for DAG reconvergence.
//!
//! A node with fan-out greater than one opens a *branch*; the branch closes
//! at the node where all of its out-edges have reconverged. Every node
//! carries the stack of branches it participates in that are still open
//! above it. During enumeration, a node combining two inputs may only pair
//! subplans that agree on the chosen candidate of every shared open branch.

use serde::Serialize;
use std::collections::BTreeMap;

use super::{NodeHandle, OptimizerGraph};

/// One open branch: the branching node and the set of its out-edges (as a
/// bitmask) that have merged into the current subtree so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnclosedBranch {
    pub branching_node: NodeHandle,
    pub joined_outputs: u64,
}

/// Compute the unclosed-branch stack of every node, producers before
/// consumers.
pub fn compute_branch_stacks(graph: &mut OptimizerGraph) {
    for handle in graph.post_order() {
        let node = graph.node(handle);
        let inputs = node.inputs.clone();
        let out_edges = node.input_out_edge.clone();

        let mut merged: BTreeMap<NodeHandle, u64> = BTreeMap::new();
        for (i, &input) in inputs.iter().enumerate() {
            let producer = graph.node(input);
            for branch in &producer.open_branches {
                *merged.entry(branch.branching_node).or_insert(0) |= branch.joined_outputs;
            }
            // a producer with several consumers opens a branch itself
            if producer.outputs.len() > 1 {
                *merged.entry(input).or_insert(0) |= 1 << out_edges[i];
            }
        }

        let mut open: Vec<UnclosedBranch> = merged
            .into_iter()
            .filter(|(branching, joined)| {
                let fan_out = graph.node(*branching).outputs.len() as u32;
                *joined != full_mask(fan_out)
            })
            .map(|(branching_node, joined_outputs)| UnclosedBranch {
                branching_node,
                joined_outputs,
            })
            .collect();

        // stack order: the most recently opened branch (highest id) first
        open.sort_by(|a, b| {
            graph
                .node(b.branching_node)
                .id
                .cmp(&graph.node(a.branching_node).id)
        });

        graph.node_mut(handle).open_branches = open;
    }
}

fn full_mask(fan_out: u32) -> u64 {
    debug_assert!(fan_out <= 64, "fan-out beyond 64 consumers is unsupported");
    if fan_out >= 64 {
        u64::MAX
    } else {
        (1u64 << fan_out) - 1
    }
}
