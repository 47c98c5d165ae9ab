//! Structural invariants of compiled plans.

mod common;

use common::*;
use riffle::graph::{NodeKind, OptimizerGraph};
use riffle::prelude::*;
use riffle::strategies::LocalStrategy;
use riffle::{DefaultPostPass, OptimizedPlan};

fn compile(plan: &Plan, statistics: BasicStatistics) -> OptimizedPlan {
    compiler_with(statistics)
        .compile_on(plan, &default_instance(), &DefaultPostPass)
        .unwrap()
}

fn diamond_plan() -> (Plan, BasicStatistics) {
    let mut plan = Plan::new("diamond");
    let src = plan.source("src", "s");
    let a = plan.map("a", src);
    let b = plan.map("b", src);
    let join = plan.match_join("join", a, b, vec![0], vec![0]);
    plan.sink("out", join);
    (plan, stats(&[("s", 10_000, 1_000_000)]))
}

#[test]
fn node_ids_are_dense_and_unique() {
    for (plan, _) in [word_count(), co_partitioned_join(), diamond_plan()] {
        let graph = OptimizerGraph::build(&plan, None, -1, 4, false).unwrap();
        let mut ids: Vec<u32> = graph.iter().map(|(_, n)| n.id).collect();
        ids.sort_unstable();
        let expected: Vec<u32> = (1..=graph.len() as u32).collect();
        assert_eq!(ids, expected, "{}", plan.job_name());
    }
}

#[test]
fn sink_joining_leaves_exactly_one_root() {
    let mut plan = Plan::new("three sinks");
    let src = plan.source("src", "s");
    let map = plan.map("map", src);
    plan.sink("out1", map);
    plan.sink("out2", map);
    plan.sink("out3", map);

    let graph = OptimizerGraph::build(&plan, None, -1, 4, false).unwrap();
    let roots: Vec<_> = graph
        .iter()
        .filter(|(_, n)| n.outputs.is_empty())
        .collect();
    assert_eq!(roots.len(), 1);
    assert!(matches!(
        graph.node(graph.root).kind,
        NodeKind::SinkJoiner
    ));
}

#[test]
fn every_keyed_node_has_a_local_strategy() {
    let (plan, statistics) = co_partitioned_join();
    let optimized = compile(&plan, statistics);

    for node in optimized.plan_nodes() {
        match node.kind {
            NodeKind::Reduce { .. }
            | NodeKind::Match { .. }
            | NodeKind::CoGroup { .. }
            | NodeKind::Cross => {
                assert_ne!(node.local_strategy, LocalStrategy::None, "{}", node.name)
            }
            _ => assert_eq!(node.local_strategy, LocalStrategy::None, "{}", node.name),
        }
    }
}

#[test]
fn delivered_channel_properties_satisfy_consumer_requirements() {
    let plans = [word_count(), co_partitioned_join(), diamond_plan()];
    for (plan, statistics) in plans {
        let optimized = compile(&plan, statistics);
        for node in optimized.plan_nodes() {
            match &node.kind {
                NodeKind::Reduce { keys, .. } => {
                    let channel = optimized.channel(node.inputs[0]);
                    assert!(
                        channel.global.is_partitioned_on(&keys.to_set()),
                        "{}: reduce input not co-located",
                        node.name
                    );
                }
                NodeKind::Match {
                    keys_first,
                    keys_second,
                }
                | NodeKind::CoGroup {
                    keys_first,
                    keys_second,
                } => {
                    let first = optimized.channel(node.inputs[0]);
                    let second = optimized.channel(node.inputs[1]);
                    let replicated = first.global.is_fully_replicated()
                        || second.global.is_fully_replicated();
                    let co_located = first.global.is_partitioned_on(&keys_first.to_set())
                        && second.global.is_partitioned_on(&keys_second.to_set());
                    assert!(
                        replicated || co_located,
                        "{}: join inputs neither replicated nor co-partitioned",
                        node.name
                    );
                    if node.local_strategy == LocalStrategy::Merge {
                        let order1 = KeyOrder::ascending(keys_first);
                        let order2 = KeyOrder::ascending(keys_second);
                        assert!(first.local.is_ordered_on(&order1));
                        assert!(second.local.is_ordered_on(&order2));
                    }
                }
                _ => {}
            }
        }
    }
}

#[test]
fn assigned_memory_never_exceeds_the_instance_budget() {
    let plans = [word_count(), co_partitioned_join(), diamond_plan()];
    for (plan, statistics) in plans {
        let optimized = compile(&plan, statistics);
        let total: u64 = optimized
            .plan_nodes()
            .map(|n| n.memory_per_subtask * n.subtasks_per_instance as u64)
            .sum();
        assert!(
            total <= optimized.memory_per_instance,
            "{}: {} > {}",
            optimized.job_name,
            total,
            optimized.memory_per_instance
        );
        // consumers did receive memory
        assert!(optimized
            .plan_nodes()
            .filter(|n| n.memory_consumer_weight > 0)
            .all(|n| n.memory_per_subtask > 0));
        // non-consumers did not
        assert!(optimized
            .plan_nodes()
            .filter(|n| n.memory_consumer_weight == 0)
            .all(|n| n.memory_per_subtask == 0));
    }
}

#[test]
fn compilation_is_deterministic() {
    for (plan, statistics) in [word_count(), co_partitioned_join(), diamond_plan()] {
        let first = compile(&plan, statistics.clone());
        let second = compile(&plan, statistics);
        assert_eq!(
            first.fingerprint().unwrap(),
            second.fingerprint().unwrap(),
            "{}",
            plan.job_name()
        );
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}

#[test]
fn reconverging_paths_agree_on_shared_candidates() {
    let (plan, statistics) = diamond_plan();
    let optimized = compile(&plan, statistics);

    // the shared source appears exactly once in the winning plan
    assert_eq!(optimized.nodes.len(), 5);
    assert_eq!(optimized.sources.len(), 1);
    let mut ids: Vec<u32> = optimized.plan_nodes().map(|n| n.node_id).collect();
    ids.dedup();
    assert_eq!(ids.len(), optimized.nodes.len());

    // both join inputs lead back to the same source candidate
    let join = optimized.plan_nodes().find(|n| n.name == "join").unwrap();
    let trace_to_source = |mut id: riffle::candidate::PlanId| {
        loop {
            let node = optimized.plan_node(id);
            if matches!(node.kind, NodeKind::Source { .. }) {
                return id;
            }
            id = optimized.channel(node.inputs[0]).source;
        }
    };
    let left = trace_to_source(optimized.channel(join.inputs[0]).source);
    let right = trace_to_source(optimized.channel(join.inputs[1]).source);
    assert_eq!(left, right);
}

#[test]
fn finalizing_twice_changes_nothing() {
    let (plan, statistics) = word_count();
    let mut optimized = compile(&plan, statistics);
    let before = optimized.fingerprint().unwrap();
    optimized.finalize();
    optimized.finalize();
    assert_eq!(optimized.fingerprint().unwrap(), before);
}

#[test]
fn post_pass_annotations_are_attached() {
    let (plan, statistics) = word_count();
    let optimized = compile(&plan, statistics);
    for node in optimized.plan_nodes() {
        assert_eq!(node.annotations.get("serializer").unwrap(), "record");
    }
    let reduce = optimized.plan_nodes().find(|n| n.name == "count").unwrap();
    assert_eq!(reduce.annotations.get("comparator").unwrap(), "0");
}
