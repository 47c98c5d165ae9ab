//! Physical plan candidates and channels.
//!
//! Enumeration produces [`PlanCandidate`]s and [`Channel`]s in a
//! [`PlanSpace`] arena addressed by [`PlanId`]/[`ChannelId`]. Candidates are
//! self-describing (they copy id, name, kind and parallelism from their
//! optimizer node) so the final plan serializes without the graph. Dropped
//! candidates simply stay unreferenced; the finalizer compacts the winners
//! into a fresh arena.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::costs::Cost;
use crate::graph::{NodeHandle, NodeKind};
use crate::props::{GlobalProperties, LocalProperties};
use crate::strategies::{LocalStrategy, ShipStrategy};

/// Index of a candidate in a [`PlanSpace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PlanId(u32);

impl PlanId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plan#{}", self.0)
    }
}

/// Index of a channel in a [`PlanSpace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelId(u32);

impl ChannelId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A candidate edge: one producer candidate feeding one consumer.
#[derive(Debug, Clone, Serialize)]
pub struct Channel {
    pub source: PlanId,
    /// Consumer; set by the finalizer when the winning plan is wired.
    pub target: Option<PlanId>,
    pub ship: ShipStrategy,
    /// Properties delivered at the receiving end.
    pub global: GlobalProperties,
    pub local: LocalProperties,
}

/// One physical realization of an optimizer node.
#[derive(Debug, Clone, Serialize)]
pub struct PlanCandidate {
    pub node: NodeHandle,
    /// The optimizer node's stable id.
    pub node_id: u32,
    pub name: String,
    pub kind: NodeKind,
    pub dop: u32,
    pub subtasks_per_instance: u32,
    pub memory_consumer_weight: u32,
    pub local_strategy: LocalStrategy,
    pub inputs: Vec<ChannelId>,
    /// Outgoing channels; wired by the finalizer.
    pub outgoing: Vec<ChannelId>,
    /// Properties this candidate's output delivers.
    pub global: GlobalProperties,
    pub local: LocalProperties,
    /// Cost of this node and its input channels alone.
    pub node_cost: Cost,
    /// Cost of the whole subplan rooted here.
    pub cumulative_cost: Cost,
    /// For every still-open branch below: the candidate of the branching
    /// node this subplan is committed to, keyed by the branching node's id.
    pub branch_choices: BTreeMap<u32, PlanId>,
    /// Memory budget per subtask; assigned by the finalizer.
    pub memory_per_subtask: u64,
    /// Opaque metadata attached by the post-pass (serializers, comparators).
    pub annotations: BTreeMap<String, String>,
}

/// Arena of candidates and channels produced by one enumeration.
#[derive(Debug, Default, Serialize)]
pub struct PlanSpace {
    plans: Vec<PlanCandidate>,
    channels: Vec<Channel>,
}

impl PlanSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&self, id: PlanId) -> &PlanCandidate {
        &self.plans[id.index()]
    }

    pub fn plan_mut(&mut self, id: PlanId) -> &mut PlanCandidate {
        &mut self.plans[id.index()]
    }

    pub fn channel(&self, id: ChannelId) -> &Channel {
        &self.channels[id.index()]
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> &mut Channel {
        &mut self.channels[id.index()]
    }

    pub fn add_plan(&mut self, plan: PlanCandidate) -> PlanId {
        let id = PlanId::new(self.plans.len());
        self.plans.push(plan);
        id
    }

    pub fn add_channel(&mut self, channel: Channel) -> ChannelId {
        let id = ChannelId::new(self.channels.len());
        self.channels.push(channel);
        id
    }

    pub fn num_plans(&self) -> usize {
        self.plans.len()
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }
}
