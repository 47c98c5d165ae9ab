//! Bottom-up enumeration of plan alternatives.
//!
//! Starting at the root, every node recursively obtains the alternatives of
//! its inputs (each node enumerated once, results memoized — essential for
//! DAGs), wraps them in candidate channels for every admissible shipping
//! strategy, instantiates a candidate per admissible local strategy, costs
//! the result, and prunes the candidate set against cost and the node's
//! interesting properties. Candidates with conflicting branch pinnings are
//! never combined and never compared.

use std::collections::{BTreeMap, BTreeSet};

use riffle_core::error::{Error, Result};
use riffle_core::fields::{FieldSet, KeyOrder};

use crate::candidate::{Channel, ChannelId, PlanCandidate, PlanId, PlanSpace};
use crate::costs::{Cost, CostEstimator};
use crate::graph::{NodeHandle, NodeKind, OptimizerGraph};
use crate::props::{GlobalProperties, InterestingProperties, LocalProperties, Partitioning};
use crate::strategies::{apply_local_hint, apply_ship_hint, LocalStrategy, ShipStrategy};

pub struct Enumerator<'a> {
    graph: &'a OptimizerGraph,
    estimator: &'a dyn CostEstimator,
    space: PlanSpace,
    memo: Vec<Option<Vec<PlanId>>>,
}

impl<'a> Enumerator<'a> {
    pub fn new(graph: &'a OptimizerGraph, estimator: &'a dyn CostEstimator) -> Self {
        Self {
            graph,
            estimator,
            space: PlanSpace::new(),
            memo: vec![None; graph.len()],
        }
    }

    /// Enumerate the whole graph and return the single winning root
    /// candidate together with the candidate arena.
    pub fn run(mut self) -> Result<(PlanSpace, PlanId)> {
        let roots = self.alternatives(self.graph.root)?;
        if roots.len() != 1 {
            return Err(Error::Inconsistency(format!(
                "enumeration produced {} root candidates instead of exactly one",
                roots.len()
            )));
        }
        Ok((self.space, roots[0]))
    }

    fn alternatives(&mut self, handle: NodeHandle) -> Result<Vec<PlanId>> {
        if let Some(cached) = &self.memo[handle.index()] {
            return Ok(cached.clone());
        }

        let kind = self.graph.node(handle).kind.clone();
        let raw = match &kind {
            NodeKind::Source { .. } => self.enumerate_source(handle),
            NodeKind::Sink | NodeKind::Map => self.enumerate_pass_through(handle)?,
            NodeKind::Reduce { .. } => self.enumerate_reduce(handle)?,
            NodeKind::Match { .. } => self.enumerate_match(handle)?,
            NodeKind::CoGroup { .. } => self.enumerate_co_group(handle)?,
            NodeKind::Cross => self.enumerate_cross(handle)?,
            NodeKind::SinkJoiner => self.enumerate_sink_joiner(handle)?,
        };

        if raw.is_empty() {
            return Err(Error::Inconsistency(format!(
                "no admissible physical alternative for node '{}' ({})",
                self.graph.node(handle).name,
                kind.label()
            )));
        }

        let pruned = self.prune(handle, raw);
        tracing::debug!(
            node = %self.graph.node(handle).name,
            alternatives = pruned.len(),
            "enumerated node"
        );
        self.memo[handle.index()] = Some(pruned.clone());
        Ok(pruned)
    }

    // ---- per-kind candidate generation -----------------------------------

    fn enumerate_source(&mut self, handle: NodeHandle) -> Vec<PlanId> {
        let dop = self.graph.node(handle).dop;
        let global = if dop <= 1 {
            GlobalProperties::singleton()
        } else {
            GlobalProperties::any()
        };
        vec![self.add_candidate(
            handle,
            LocalStrategy::None,
            Vec::new(),
            global,
            LocalProperties::none(),
        )]
    }

    /// Map and Sink: a forward channel per input alternative, no local
    /// strategy, properties passed through.
    fn enumerate_pass_through(&mut self, handle: NodeHandle) -> Result<Vec<PlanId>> {
        let node = self.graph.node(handle);
        let dop = node.dop;
        let input = node.inputs[0];
        let alternatives = self.alternatives(input)?;

        let mut out = Vec::with_capacity(alternatives.len());
        for &alt in &alternatives {
            let (global, local) = self.deliver(alt, &ShipStrategy::Forward, dop);
            let channel = self.push_channel(alt, ShipStrategy::Forward, global.clone(), local.clone());
            out.push(self.add_candidate(handle, LocalStrategy::None, vec![channel], global, local));
        }
        Ok(out)
    }

    fn enumerate_reduce(&mut self, handle: NodeHandle) -> Result<Vec<PlanId>> {
        let node = self.graph.node(handle);
        let NodeKind::Reduce { keys, combinable } = node.kind.clone() else {
            unreachable!("enumerate_reduce on non-reduce node");
        };
        let dop = node.dop;
        let ship_hint = node.ship_hints[0];
        let local_hint = node.local_hint;
        let input = node.inputs[0];

        let key_set = keys.to_set();
        let order = KeyOrder::ascending(&keys);
        let alternatives = self.alternatives(input)?;

        let mut locals = vec![LocalStrategy::Sort];
        if combinable {
            locals.push(LocalStrategy::CombiningSort);
        }
        let locals = apply_local_hint(locals, local_hint);

        let mut out = Vec::new();
        for &alt in &alternatives {
            let ships = apply_ship_hint(
                vec![
                    ShipStrategy::Forward,
                    ShipStrategy::PartitionHash(keys.clone()),
                    ShipStrategy::PartitionRange(order.clone()),
                ],
                ship_hint,
            );
            for ship in ships {
                let (global, local) = self.deliver(alt, &ship, dop);
                // equal keys must be co-located before grouping
                if !global.is_partitioned_on(&key_set) {
                    continue;
                }
                let channel = self.push_channel(alt, ship, global.clone(), local);
                for &ls in &locals {
                    out.push(self.add_candidate(
                        handle,
                        ls,
                        vec![channel],
                        global.clone(),
                        LocalProperties::ordered(order.clone()),
                    ));
                }
            }
        }
        Ok(out)
    }

    fn enumerate_match(&mut self, handle: NodeHandle) -> Result<Vec<PlanId>> {
        let node = self.graph.node(handle);
        let NodeKind::Match {
            keys_first,
            keys_second,
        } = node.kind.clone()
        else {
            unreachable!("enumerate_match on non-match node");
        };
        let dop = node.dop;
        let hints = (node.ship_hints[0], node.ship_hints[1]);
        let local_hint = node.local_hint;
        let (in1, in2) = (node.inputs[0], node.inputs[1]);

        let set1 = keys_first.to_set();
        let set2 = keys_second.to_set();
        let order1 = KeyOrder::ascending(&keys_first);
        let order2 = KeyOrder::ascending(&keys_second);

        let alts1 = self.alternatives(in1)?;
        let alts2 = self.alternatives(in2)?;

        let locals = apply_local_hint(
            vec![
                LocalStrategy::SortBothMerge,
                LocalStrategy::SortFirstMerge,
                LocalStrategy::SortSecondMerge,
                LocalStrategy::Merge,
                LocalStrategy::HashBuildFirst,
                LocalStrategy::HashBuildSecond,
            ],
            local_hint,
        );

        let mut out = Vec::new();
        for &a1 in &alts1 {
            for &a2 in &alts2 {
                if !self.compatible(a1, a2) {
                    continue;
                }
                let pairs = filter_ship_pairs(
                    vec![
                        (
                            ShipStrategy::PartitionHash(keys_first.clone()),
                            ShipStrategy::PartitionHash(keys_second.clone()),
                        ),
                        (ShipStrategy::Forward, ShipStrategy::Broadcast),
                        (ShipStrategy::Broadcast, ShipStrategy::Forward),
                        (ShipStrategy::Forward, ShipStrategy::Forward),
                    ],
                    hints,
                );
                for (s1, s2) in pairs {
                    let (g1, l1) = self.deliver(a1, &s1, dop);
                    let (g2, l2) = self.deliver(a2, &s2, dop);
                    if !dual_partitioning_ok(&g1, &g2, &set1, &set2) {
                        continue;
                    }
                    let global = join_output_global(&g1, &g2, &set1, &set2);
                    let ch1 = self.push_channel(a1, s1, g1, l1.clone());
                    let ch2 = self.push_channel(a2, s2, g2, l2.clone());
                    for &ls in &locals {
                        if !dual_local_valid(ls, &l1, &l2, &order1, &order2) {
                            continue;
                        }
                        let local = if ls.is_sort_based() || ls == LocalStrategy::Merge {
                            LocalProperties::ordered(order1.clone())
                        } else {
                            LocalProperties::none()
                        };
                        out.push(self.add_candidate(
                            handle,
                            ls,
                            vec![ch1, ch2],
                            global.clone(),
                            local,
                        ));
                    }
                }
            }
        }
        Ok(out)
    }

    fn enumerate_co_group(&mut self, handle: NodeHandle) -> Result<Vec<PlanId>> {
        let node = self.graph.node(handle);
        let NodeKind::CoGroup {
            keys_first,
            keys_second,
        } = node.kind.clone()
        else {
            unreachable!("enumerate_co_group on non-cogroup node");
        };
        let dop = node.dop;
        let hints = (node.ship_hints[0], node.ship_hints[1]);
        let local_hint = node.local_hint;
        let (in1, in2) = (node.inputs[0], node.inputs[1]);

        let set1 = keys_first.to_set();
        let set2 = keys_second.to_set();
        let order1 = KeyOrder::ascending(&keys_first);
        let order2 = KeyOrder::ascending(&keys_second);

        let alts1 = self.alternatives(in1)?;
        let alts2 = self.alternatives(in2)?;

        let locals = apply_local_hint(
            vec![
                LocalStrategy::SortBothMerge,
                LocalStrategy::SortFirstMerge,
                LocalStrategy::SortSecondMerge,
                LocalStrategy::Merge,
            ],
            local_hint,
        );

        let mut out = Vec::new();
        for &a1 in &alts1 {
            for &a2 in &alts2 {
                if !self.compatible(a1, a2) {
                    continue;
                }
                // both sides must group complete keys; replication would
                // duplicate groups, so only true co-partitioning qualifies
                let pairs = filter_ship_pairs(
                    vec![
                        (
                            ShipStrategy::PartitionHash(keys_first.clone()),
                            ShipStrategy::PartitionHash(keys_second.clone()),
                        ),
                        (
                            ShipStrategy::PartitionRange(order1.clone()),
                            ShipStrategy::PartitionRange(order2.clone()),
                        ),
                        (ShipStrategy::Forward, ShipStrategy::Forward),
                    ],
                    hints,
                );
                for (s1, s2) in pairs {
                    let (g1, l1) = self.deliver(a1, &s1, dop);
                    let (g2, l2) = self.deliver(a2, &s2, dop);
                    if !(g1.is_partitioned_on(&set1)
                        && g2.is_partitioned_on(&set2)
                        && co_partitioned(&g1, &g2))
                    {
                        continue;
                    }
                    let global = join_output_global(&g1, &g2, &set1, &set2);
                    let ch1 = self.push_channel(a1, s1, g1, l1.clone());
                    let ch2 = self.push_channel(a2, s2, g2, l2.clone());
                    for &ls in &locals {
                        if !dual_local_valid(ls, &l1, &l2, &order1, &order2) {
                            continue;
                        }
                        out.push(self.add_candidate(
                            handle,
                            ls,
                            vec![ch1, ch2],
                            global.clone(),
                            LocalProperties::ordered(order1.clone()),
                        ));
                    }
                }
            }
        }
        Ok(out)
    }

    fn enumerate_cross(&mut self, handle: NodeHandle) -> Result<Vec<PlanId>> {
        let node = self.graph.node(handle);
        let dop = node.dop;
        let hints = (node.ship_hints[0], node.ship_hints[1]);
        let local_hint = node.local_hint;
        let (in1, in2) = (node.inputs[0], node.inputs[1]);

        let alts1 = self.alternatives(in1)?;
        let alts2 = self.alternatives(in2)?;

        let locals = apply_local_hint(
            vec![
                LocalStrategy::NestedLoopStreamedOuterFirst,
                LocalStrategy::NestedLoopStreamedOuterSecond,
                LocalStrategy::NestedLoopBlockedOuterFirst,
                LocalStrategy::NestedLoopBlockedOuterSecond,
            ],
            local_hint,
        );

        let mut out = Vec::new();
        for &a1 in &alts1 {
            for &a2 in &alts2 {
                if !self.compatible(a1, a2) {
                    continue;
                }
                let pairs = filter_ship_pairs(
                    vec![
                        (ShipStrategy::Broadcast, ShipStrategy::Forward),
                        (ShipStrategy::Forward, ShipStrategy::Broadcast),
                    ],
                    hints,
                );
                for (s1, s2) in pairs {
                    let (g1, l1) = self.deliver(a1, &s1, dop);
                    let (g2, l2) = self.deliver(a2, &s2, dop);
                    let pairable = g1.is_fully_replicated()
                        || g2.is_fully_replicated()
                        || (g1.is_singleton() && g2.is_singleton());
                    if !pairable {
                        continue;
                    }
                    // the non-replicated side determines the distribution
                    let global = if g1.is_fully_replicated() {
                        g2.clone()
                    } else {
                        g1.clone()
                    };
                    let ch1 = self.push_channel(a1, s1, g1, l1);
                    let ch2 = self.push_channel(a2, s2, g2, l2);
                    for &ls in &locals {
                        out.push(self.add_candidate(
                            handle,
                            ls,
                            vec![ch1, ch2],
                            global.clone(),
                            LocalProperties::none(),
                        ));
                    }
                }
            }
        }
        Ok(out)
    }

    /// The sink joiner concatenates its inputs; it exists only to give the
    /// enumeration a single root.
    fn enumerate_sink_joiner(&mut self, handle: NodeHandle) -> Result<Vec<PlanId>> {
        let node = self.graph.node(handle);
        let dop = node.dop;
        let (in1, in2) = (node.inputs[0], node.inputs[1]);
        let alts1 = self.alternatives(in1)?;
        let alts2 = self.alternatives(in2)?;

        let mut out = Vec::new();
        for &a1 in &alts1 {
            for &a2 in &alts2 {
                if !self.compatible(a1, a2) {
                    continue;
                }
                let (g1, l1) = self.deliver(a1, &ShipStrategy::Forward, dop);
                let (g2, l2) = self.deliver(a2, &ShipStrategy::Forward, dop);
                let ch1 = self.push_channel(a1, ShipStrategy::Forward, g1, l1);
                let ch2 = self.push_channel(a2, ShipStrategy::Forward, g2, l2);
                out.push(self.add_candidate(
                    handle,
                    LocalStrategy::None,
                    vec![ch1, ch2],
                    GlobalProperties::any(),
                    LocalProperties::none(),
                ));
            }
        }
        Ok(out)
    }

    // ---- candidate construction ------------------------------------------

    fn deliver(
        &self,
        source: PlanId,
        ship: &ShipStrategy,
        target_dop: u32,
    ) -> (GlobalProperties, LocalProperties) {
        let sp = self.space.plan(source);
        ship.deliver(&sp.global, &sp.local, sp.dop, target_dop)
    }

    fn push_channel(
        &mut self,
        source: PlanId,
        ship: ShipStrategy,
        global: GlobalProperties,
        local: LocalProperties,
    ) -> ChannelId {
        self.space.add_channel(Channel {
            source,
            target: None,
            ship,
            global,
            local,
        })
    }

    /// Branch pinnings of a subplan, including the subplan's own root when
    /// that root is itself a branching node.
    fn effective_choices(&self, plan: PlanId) -> BTreeMap<u32, PlanId> {
        let candidate = self.space.plan(plan);
        let mut choices = candidate.branch_choices.clone();
        let node = self.graph.node(candidate.node);
        if node.outputs.len() > 1 {
            choices.insert(node.id, plan);
        }
        choices
    }

    /// Whether two subplans agree on every branch both have pinned.
    fn compatible(&self, a: PlanId, b: PlanId) -> bool {
        let ca = self.effective_choices(a);
        let cb = self.effective_choices(b);
        ca.iter()
            .all(|(branch, choice)| cb.get(branch).map_or(true, |c| c == choice))
    }

    fn add_candidate(
        &mut self,
        handle: NodeHandle,
        local_strategy: LocalStrategy,
        inputs: Vec<ChannelId>,
        global: GlobalProperties,
        local: LocalProperties,
    ) -> PlanId {
        let node = self.graph.node(handle);
        let sources: Vec<PlanId> = inputs
            .iter()
            .map(|&ch| self.space.channel(ch).source)
            .collect();
        let effective: Vec<BTreeMap<u32, PlanId>> = sources
            .iter()
            .map(|&s| self.effective_choices(s))
            .collect();

        let mut cumulative = Cost::ZERO;
        for &s in &sources {
            cumulative += self.space.plan(s).cumulative_cost;
        }
        if let [first, second] = effective.as_slice() {
            // a subplan reachable through both inputs was summed twice
            for (branch, choice) in first {
                if second.get(branch) == Some(choice) {
                    cumulative = cumulative - self.space.plan(*choice).cumulative_cost;
                }
            }
        }

        let mut branch_choices = BTreeMap::new();
        for map in effective {
            branch_choices.extend(map);
        }
        // pinnings matter only while their branch is still open here
        let open_ids: BTreeSet<u32> = node
            .open_branches
            .iter()
            .map(|b| self.graph.node(b.branching_node).id)
            .collect();
        branch_choices.retain(|id, _| open_ids.contains(id));

        let id = self.space.add_plan(PlanCandidate {
            node: handle,
            node_id: node.id,
            name: node.name.clone(),
            kind: node.kind.clone(),
            dop: node.dop,
            subtasks_per_instance: node.subtasks_per_instance,
            memory_consumer_weight: node.memory_consumer_weight,
            local_strategy,
            inputs,
            outgoing: Vec::new(),
            global,
            local,
            node_cost: Cost::ZERO,
            cumulative_cost: Cost::ZERO,
            branch_choices,
            memory_per_subtask: 0,
            annotations: BTreeMap::new(),
        });

        let node_cost = self.estimator.cost(self.graph, &self.space, id);
        let candidate = self.space.plan_mut(id);
        candidate.node_cost = node_cost;
        candidate.cumulative_cost = cumulative + node_cost;
        id
    }

    // ---- pruning ---------------------------------------------------------

    /// Keep, per branch-choice signature, the Pareto-minimal candidates over
    /// (cost, delivered interesting properties): the cheapest overall plus
    /// every candidate that fulfills interesting properties no cheaper
    /// candidate fulfills — as long as its extra cost stays below what those
    /// properties could save downstream.
    fn prune(&mut self, handle: NodeHandle, raw: Vec<PlanId>) -> Vec<PlanId> {
        let interesting = self
            .graph
            .node(handle)
            .interesting
            .clone()
            .unwrap_or_default();

        let mut groups: BTreeMap<Vec<(u32, PlanId)>, Vec<PlanId>> = BTreeMap::new();
        for id in raw {
            let signature: Vec<(u32, PlanId)> = self
                .space
                .plan(id)
                .branch_choices
                .iter()
                .map(|(&k, &v)| (k, v))
                .collect();
            groups.entry(signature).or_default().push(id);
        }

        let mut kept = Vec::new();
        for group in groups.into_values() {
            kept.extend(self.prune_group(&interesting, group));
        }
        kept.sort_unstable();
        kept
    }

    fn prune_group(
        &self,
        interesting: &InterestingProperties,
        mut group: Vec<PlanId>,
    ) -> Vec<PlanId> {
        group.sort_by(|&a, &b| self.candidate_order(a, b));

        let mask_of = |id: PlanId| {
            let p = self.space.plan(id);
            interesting.fulfillment_mask(&p.global, &p.local)
        };
        let cheapest_cost = self.space.plan(group[0]).cumulative_cost.weighted_total();
        let cheapest_mask = mask_of(group[0]);

        let mut survivors: Vec<PlanId> = Vec::new();
        'candidates: for (i, &candidate) in group.iter().enumerate() {
            let mask = mask_of(candidate);
            // dominated: an at-most-as-expensive candidate covers a superset
            for &earlier in &group[..i] {
                if mask_of(earlier) & mask == mask {
                    continue 'candidates;
                }
            }
            let extra_cost =
                self.space.plan(candidate).cumulative_cost.weighted_total() - cheapest_cost;
            let extra_props = mask & !cheapest_mask;
            if extra_cost > 0.0 && extra_cost > interesting.savings_for_mask(extra_props) {
                continue;
            }
            survivors.push(candidate);
        }
        survivors
    }

    /// Deterministic total order among candidates: cheaper first; ties break
    /// by fewer partitioning channels, then by strategy enum order, then by
    /// creation order.
    fn candidate_order(&self, a: PlanId, b: PlanId) -> std::cmp::Ordering {
        let pa = self.space.plan(a);
        let pb = self.space.plan(b);
        let partition_ops = |p: &PlanCandidate| -> u32 {
            p.inputs
                .iter()
                .map(|&ch| self.space.channel(ch).ship.partition_ops())
                .sum()
        };
        let ships = |p: &PlanCandidate| -> Vec<&ShipStrategy> {
            p.inputs
                .iter()
                .map(|&ch| &self.space.channel(ch).ship)
                .collect()
        };
        pa.cumulative_cost
            .total_order(&pb.cumulative_cost)
            .then_with(|| partition_ops(pa).cmp(&partition_ops(pb)))
            .then_with(|| pa.local_strategy.cmp(&pb.local_strategy))
            .then_with(|| ships(pa).cmp(&ships(pb)))
            .then_with(|| a.cmp(&b))
    }
}

// ---- free helpers --------------------------------------------------------

/// Filter ship-strategy pairs by the per-input hints, falling back to the
/// unfiltered set when the hints match nothing.
fn filter_ship_pairs(
    pairs: Vec<(ShipStrategy, ShipStrategy)>,
    hints: (
        Option<riffle_core::hints::ShipStrategyHint>,
        Option<riffle_core::hints::ShipStrategyHint>,
    ),
) -> Vec<(ShipStrategy, ShipStrategy)> {
    if hints.0.is_none() && hints.1.is_none() {
        return pairs;
    }
    let filtered: Vec<_> = pairs
        .iter()
        .filter(|(s1, s2)| {
            hints.0.map_or(true, |h| s1.matches_hint(h))
                && hints.1.map_or(true, |h| s2.matches_hint(h))
        })
        .cloned()
        .collect();
    if filtered.is_empty() {
        pairs
    } else {
        filtered
    }
}

/// Whether the two delivered global properties use compatible partitioning
/// schemes, so that equal join keys land in the same partition pair.
fn co_partitioned(g1: &GlobalProperties, g2: &GlobalProperties) -> bool {
    matches!(
        (g1.partitioning(), g2.partitioning()),
        (Partitioning::Hash(_), Partitioning::Hash(_))
            | (Partitioning::Range(_), Partitioning::Range(_))
            | (Partitioning::Singleton, Partitioning::Singleton)
    )
}

/// Admissibility of a dual-input key operation: one side replicated, or both
/// sides co-partitioned on their key fields.
fn dual_partitioning_ok(
    g1: &GlobalProperties,
    g2: &GlobalProperties,
    set1: &FieldSet,
    set2: &FieldSet,
) -> bool {
    if g1.is_fully_replicated() && g2.is_fully_replicated() {
        return false;
    }
    if g1.is_fully_replicated() || g2.is_fully_replicated() {
        return true;
    }
    g1.is_partitioned_on(set1) && g2.is_partitioned_on(set2) && co_partitioned(g1, g2)
}

/// Delivered global properties of a keyed dual-input operation, expressed on
/// the first input's key fields.
fn join_output_global(
    g1: &GlobalProperties,
    g2: &GlobalProperties,
    set1: &FieldSet,
    set2: &FieldSet,
) -> GlobalProperties {
    if g1.is_singleton() && g2.is_singleton() {
        return GlobalProperties::singleton();
    }
    let key_partitioned = if g2.is_fully_replicated() {
        g1.is_partitioned_on(set1)
    } else if g1.is_fully_replicated() {
        g2.is_partitioned_on(set2)
    } else {
        true
    };
    if key_partitioned {
        GlobalProperties::hash_partitioned(set1.clone())
    } else {
        GlobalProperties::any()
    }
}

/// Whether a dual-input local strategy is applicable given the orderings the
/// channels already deliver.
fn dual_local_valid(
    strategy: LocalStrategy,
    l1: &LocalProperties,
    l2: &LocalProperties,
    order1: &KeyOrder,
    order2: &KeyOrder,
) -> bool {
    match strategy {
        LocalStrategy::Merge => l1.is_ordered_on(order1) && l2.is_ordered_on(order2),
        LocalStrategy::SortFirstMerge => l2.is_ordered_on(order2),
        LocalStrategy::SortSecondMerge => l1.is_ordered_on(order1),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costs::DefaultCostEstimator;
    use crate::graph::{branches, interesting};
    use riffle_core::contract::Plan;
    use riffle_core::statistics::{BasicStatistics, SourceStats};

    fn enumerate(plan: &Plan, stats: Option<&BasicStatistics>) -> (PlanSpace, PlanId) {
        let estimator = DefaultCostEstimator;
        let mut graph = OptimizerGraph::build(
            plan,
            stats.map(|s| s as &dyn riffle_core::statistics::DataStatistics),
            -1,
            4,
            true,
        )
        .unwrap();
        interesting::propagate_interesting_properties(&mut graph, &estimator);
        branches::compute_branch_stacks(&mut graph);
        Enumerator::new(&graph, &estimator).run().unwrap()
    }

    fn stats_for(entries: &[(&str, u64)]) -> BasicStatistics {
        let mut stats = BasicStatistics::new();
        for (id, bytes) in entries {
            stats.cache(
                *id,
                SourceStats {
                    num_records: Some(bytes / 10),
                    avg_record_bytes: Some(10.0),
                    num_bytes: Some(*bytes),
                },
            );
        }
        stats
    }

    #[test]
    fn linear_plan_has_single_winner() {
        let mut plan = Plan::new("p");
        let src = plan.source("src", "s");
        let red = plan.reduce("red", src, vec![0]);
        plan.sink("out", red);

        let stats = stats_for(&[("s", 10_000)]);
        let (space, root) = enumerate(&plan, Some(&stats));

        let root_candidate = space.plan(root);
        assert!(matches!(root_candidate.kind, NodeKind::Sink));
        // reduce below: partitioned by hash, sorted (not combinable)
        let reduce = space.plan(space.channel(root_candidate.inputs[0]).source);
        assert_eq!(reduce.local_strategy, LocalStrategy::Sort);
        assert!(matches!(
            space.channel(reduce.inputs[0]).ship,
            ShipStrategy::PartitionHash(_)
        ));
    }

    #[test]
    fn forced_impossible_plans_surface_as_inconsistency() {
        // a reduce whose only ship option is forward from an unpartitioned
        // source cannot co-locate its keys
        let mut plan = Plan::new("p");
        let src = plan.source("src", "s");
        let red = plan.reduce("red", src, vec![0]);
        plan.set_parameter(red, riffle_core::hints::HINT_SHIP_STRATEGY, "SHIP_FORWARD");
        plan.sink("out", red);

        let estimator = DefaultCostEstimator;
        let mut graph = OptimizerGraph::build(&plan, None, -1, 4, true).unwrap();
        interesting::propagate_interesting_properties(&mut graph, &estimator);
        branches::compute_branch_stacks(&mut graph);
        let err = Enumerator::new(&graph, &estimator).run().unwrap_err();
        assert!(err.to_string().contains("no admissible physical alternative"));
    }

    #[test]
    fn reconverging_inputs_pin_the_same_shared_candidate() {
        let mut plan = Plan::new("diamond");
        let src = plan.source("src", "s");
        let a = plan.map("a", src);
        let b = plan.map("b", src);
        let join = plan.match_join("join", a, b, vec![0], vec![0]);
        plan.sink("out", join);

        let stats = stats_for(&[("s", 10_000)]);
        let (space, root) = enumerate(&plan, Some(&stats));

        // walk the winning plan and collect all reachable candidates
        let mut stack = vec![root];
        let mut seen = std::collections::BTreeSet::new();
        while let Some(p) = stack.pop() {
            if !seen.insert(p) {
                continue;
            }
            for &ch in &space.plan(p).inputs {
                stack.push(space.channel(ch).source);
            }
        }
        let source_candidates: Vec<_> = seen
            .iter()
            .filter(|&&p| matches!(space.plan(p).kind, NodeKind::Source { .. }))
            .collect();
        assert_eq!(source_candidates.len(), 1);
    }

    #[test]
    fn shared_subplan_cost_is_counted_once() {
        let mut plan = Plan::new("diamond");
        let src = plan.source("src", "s");
        let a = plan.map("a", src);
        let b = plan.map("b", src);
        let join = plan.match_join("join", a, b, vec![0], vec![0]);
        plan.sink("out", join);

        let stats = stats_for(&[("s", 10_000)]);
        let (space, root) = enumerate(&plan, Some(&stats));

        // the root's cumulative cost must be below twice the join's own
        // network volume: the source subplan is free and shared
        let root_cost = space.plan(root).cumulative_cost;
        assert!(root_cost.weighted_total() > 0.0);
        // hash-hash join of 10k + 10k bytes; anything >= 60k total would
        // indicate the shared subplan was double counted via a broadcast win
        assert!(root_cost.network <= 40_000.0, "{root_cost:?}");
    }
}
