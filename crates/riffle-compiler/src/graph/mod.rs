//! The optimizer graph: logical-plan nodes in an arena.
//!
//! Contracts are translated into [`OptimizerNode`]s held in an
//! [`OptimizerGraph`] arena; edges are [`NodeHandle`]s into the arena, never
//! owning references, which keeps the DAG free of ownership cycles and makes
//! branch tracking a matter of handle sets.

pub mod branches;
pub mod budget;
pub mod build;
pub mod estimates;
pub mod interesting;

use riffle_core::fields::FieldList;
use riffle_core::hints::{LocalStrategyHint, ShipStrategyHint};
use riffle_core::id::ContractId;
use serde::Serialize;
use std::fmt;

use crate::props::InterestingProperties;

pub use branches::UnclosedBranch;

/// Index of a node in the [`OptimizerGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeHandle(u32);

impl NodeHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Operator kind of an optimizer node, mirroring the contract kinds plus
/// the synthetic [`SinkJoiner`](NodeKind::SinkJoiner).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    Source { source_id: String },
    Sink,
    Map,
    Reduce { keys: FieldList, combinable: bool },
    Match { keys_first: FieldList, keys_second: FieldList },
    CoGroup { keys_first: FieldList, keys_second: FieldList },
    Cross,
    /// Virtual binary node that unifies multiple sinks under one root for
    /// enumeration. It has no runtime existence and never appears in the
    /// final plan.
    SinkJoiner,
}

impl NodeKind {
    /// Whether subtasks of this kind need working memory (sorts, hash
    /// tables, materialized loop sides).
    pub fn is_memory_consumer(&self) -> bool {
        matches!(
            self,
            NodeKind::Reduce { .. } | NodeKind::Match { .. } | NodeKind::CoGroup { .. } | NodeKind::Cross
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Source { .. } => "Source",
            NodeKind::Sink => "Sink",
            NodeKind::Map => "Map",
            NodeKind::Reduce { .. } => "Reduce",
            NodeKind::Match { .. } => "Match",
            NodeKind::CoGroup { .. } => "CoGroup",
            NodeKind::Cross => "Cross",
            NodeKind::SinkJoiner => "SinkJoiner",
        }
    }
}

/// Output size estimates of a node. Any figure may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Estimates {
    pub num_records: Option<u64>,
    pub avg_record_bytes: Option<f64>,
    pub output_bytes: Option<u64>,
}

/// One logical operator in the optimizer's internal representation.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizerNode {
    /// Stable id, assigned in post-order of the first visit; 0 until then.
    pub id: u32,
    pub contract: ContractId,
    pub name: String,
    pub kind: NodeKind,
    /// Producers, in channel order.
    pub inputs: Vec<NodeHandle>,
    /// For each input, the index of the corresponding out-edge at the
    /// producer (distinguishes the two edges of a self-join).
    pub input_out_edge: Vec<u32>,
    /// Consumers, in the order their edges were wired.
    pub outputs: Vec<NodeHandle>,
    pub dop: u32,
    pub subtasks_per_instance: u32,
    /// Parsed shipping-strategy hints, one slot per input.
    pub ship_hints: Vec<Option<ShipStrategyHint>>,
    pub local_hint: Option<LocalStrategyHint>,
    pub estimates: Estimates,
    pub memory_consumer_weight: u32,
    /// Minimal guaranteed memory per subtask, set by the pre-budget pass.
    pub min_memory_per_subtask: Option<u64>,
    /// Set by the interesting-property descent.
    pub interesting: Option<InterestingProperties>,
    /// Set by the branch-tracking ascent.
    pub open_branches: Vec<UnclosedBranch>,
}

impl OptimizerNode {
    pub fn keys(&self) -> Option<&FieldList> {
        match &self.kind {
            NodeKind::Reduce { keys, .. } => Some(keys),
            NodeKind::Match { keys_first, .. } | NodeKind::CoGroup { keys_first, .. } => {
                Some(keys_first)
            }
            _ => None,
        }
    }
}

/// Arena of optimizer nodes with the designated root.
#[derive(Debug, Serialize)]
pub struct OptimizerGraph {
    nodes: Vec<OptimizerNode>,
    pub sources: Vec<NodeHandle>,
    pub sinks: Vec<NodeHandle>,
    pub root: NodeHandle,
}

impl OptimizerGraph {
    pub fn node(&self, handle: NodeHandle) -> &OptimizerNode {
        &self.nodes[handle.index()]
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> &mut OptimizerNode {
        &mut self.nodes[handle.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = NodeHandle> {
        (0..self.nodes.len()).map(NodeHandle::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &OptimizerNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeHandle::new(i), n))
    }

    /// Post-order over inputs starting at the root; every node exactly once,
    /// producers before their consumers.
    pub fn post_order(&self) -> Vec<NodeHandle> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut state = vec![0u8; self.nodes.len()]; // 0 unseen, 1 on stack, 2 done
        let mut stack = vec![self.root];
        while let Some(&h) = stack.last() {
            match state[h.index()] {
                0 => {
                    state[h.index()] = 1;
                    for &input in self.node(h).inputs.iter().rev() {
                        if state[input.index()] == 0 {
                            stack.push(input);
                        }
                    }
                }
                1 => {
                    state[h.index()] = 2;
                    order.push(h);
                    stack.pop();
                }
                _ => {
                    stack.pop();
                }
            }
        }
        order
    }
}
