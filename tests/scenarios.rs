//! End-to-end compilation scenarios.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::*;
use riffle::candidate::PlanCandidate;
use riffle::graph::NodeKind;
use riffle::hints::{HINT_LOCAL_STRATEGY, HINT_SHIP_STRATEGY};
use riffle::prelude::*;
use riffle::strategies::{LocalStrategy, ShipStrategy};
use riffle::{DefaultPostPass, NoopPostPass, OptimizedPlan, PlanCompiler};

fn node_by_name<'p>(plan: &'p OptimizedPlan, name: &str) -> &'p PlanCandidate {
    plan.plan_nodes()
        .find(|n| n.name == name)
        .unwrap_or_else(|| panic!("no plan node named '{name}'"))
}

fn input_ship<'p>(plan: &'p OptimizedPlan, node: &PlanCandidate, idx: usize) -> &'p ShipStrategy {
    &plan.channel(node.inputs[idx]).ship
}

#[test]
fn word_count_uses_hash_partition_and_combining_sort() {
    let (plan, stats) = word_count();
    let compiler = compiler_with(stats);
    let optimized = compiler
        .compile_on(&plan, &default_instance(), &DefaultPostPass)
        .unwrap();

    assert_eq!(optimized.sinks.len(), 1);
    assert_eq!(optimized.sources.len(), 1);

    let map = node_by_name(&optimized, "tokenize");
    assert_eq!(map.local_strategy, LocalStrategy::None);
    assert_eq!(*input_ship(&optimized, map, 0), ShipStrategy::Forward);

    let reduce = node_by_name(&optimized, "count");
    assert_eq!(reduce.local_strategy, LocalStrategy::CombiningSort);
    assert!(matches!(
        input_ship(&optimized, reduce, 0),
        ShipStrategy::PartitionHash(_)
    ));

    let sink = node_by_name(&optimized, "out");
    assert_eq!(*input_ship(&optimized, sink, 0), ShipStrategy::Forward);
}

#[test]
fn small_join_side_is_broadcast_and_hash_built() {
    let (plan, stats, _) = skewed_join();
    let compiler = compiler_with(stats);
    let optimized = compiler
        .compile_on(&plan, &default_instance(), &DefaultPostPass)
        .unwrap();

    let join = node_by_name(&optimized, "join");
    // the tiny second input is replicated and used to build the table; the
    // large side streams through untouched
    assert_eq!(*input_ship(&optimized, join, 0), ShipStrategy::Forward);
    assert_eq!(*input_ship(&optimized, join, 1), ShipStrategy::Broadcast);
    assert_eq!(join.local_strategy, LocalStrategy::HashBuildSecond);
}

#[test]
fn co_partitioned_inputs_join_with_forward_merge() {
    let (plan, stats) = co_partitioned_join();
    let compiler = compiler_with(stats);
    let optimized = compiler
        .compile_on(&plan, &default_instance(), &DefaultPostPass)
        .unwrap();

    let join = node_by_name(&optimized, "join");
    assert_eq!(*input_ship(&optimized, join, 0), ShipStrategy::Forward);
    assert_eq!(*input_ship(&optimized, join, 1), ShipStrategy::Forward);
    // both inputs arrive sorted from the sort-based aggregations
    assert_eq!(join.local_strategy, LocalStrategy::Merge);

    for idx in [0, 1] {
        let channel = optimized.channel(join.inputs[idx]);
        assert!(channel
            .global
            .is_partitioned_on(&[0usize].into_iter().collect()));
    }
}

#[test]
fn local_strategy_hint_overrides_the_cost_choice() {
    let (mut plan, stats, join) = skewed_join();
    plan.set_parameter(join, HINT_LOCAL_STRATEGY, "LOCAL_STRATEGY_SORT_BOTH_MERGE");
    let compiler = compiler_with(stats);
    let optimized = compiler
        .compile_on(&plan, &default_instance(), &DefaultPostPass)
        .unwrap();

    let join = node_by_name(&optimized, "join");
    assert_eq!(join.local_strategy, LocalStrategy::SortBothMerge);
}

#[test]
fn ship_strategy_hint_forces_range_partitioning() {
    let (mut plan, stats) = word_count();
    let counts = plan
        .contracts()
        .find(|(_, c)| c.name == "count")
        .map(|(id, _)| id)
        .unwrap();
    plan.set_parameter(counts, HINT_SHIP_STRATEGY, "SHIP_REPARTITION_RANGE");

    let compiler = compiler_with(stats);
    let optimized = compiler
        .compile_on(&plan, &default_instance(), &DefaultPostPass)
        .unwrap();

    let reduce = node_by_name(&optimized, "count");
    assert!(matches!(
        input_ship(&optimized, reduce, 0),
        ShipStrategy::PartitionRange(_)
    ));
}

#[test]
fn multiple_sinks_share_one_compiled_upstream() {
    let mut plan = Plan::new("two sinks");
    let src = plan.source("src", "s");
    let map = plan.map("shared map", src);
    plan.sink("out1", map);
    plan.sink("out2", map);

    let compiler = compiler_with(stats(&[("s", 1_000, 100_000)]));
    let optimized = compiler
        .compile_on(&plan, &default_instance(), &DefaultPostPass)
        .unwrap();

    assert_eq!(optimized.sinks.len(), 2);
    // the joiner is virtual: src, map, and the two sinks remain
    assert_eq!(optimized.nodes.len(), 4);
    assert!(optimized
        .plan_nodes()
        .all(|n| !matches!(n.kind, NodeKind::SinkJoiner)));

    let map_candidates = optimized
        .plan_nodes()
        .filter(|n| n.name == "shared map")
        .count();
    assert_eq!(map_candidates, 1);

    // both sinks consume the same map candidate
    let sinks: Vec<_> = optimized
        .plan_nodes()
        .filter(|n| matches!(n.kind, NodeKind::Sink))
        .collect();
    let upstream: Vec<_> = sinks
        .iter()
        .map(|s| optimized.channel(s.inputs[0]).source)
        .collect();
    assert_eq!(upstream[0], upstream[1]);
}

#[test]
fn noop_post_pass_leaves_the_plan_unannotated() {
    let (plan, stats) = word_count();
    let compiler = compiler_with(stats);

    let bare = compiler
        .compile_on(&plan, &default_instance(), &NoopPostPass)
        .unwrap();
    assert!(bare.plan_nodes().all(|n| n.annotations.is_empty()));

    // the same plan through the default post-pass differs only in the
    // descriptor annotations
    let annotated = compiler
        .compile_on(&plan, &default_instance(), &DefaultPostPass)
        .unwrap();
    assert!(annotated.plan_nodes().all(|n| !n.annotations.is_empty()));
    for (bare_node, annotated_node) in bare.plan_nodes().zip(annotated.plan_nodes()) {
        assert_eq!(bare_node.node_id, annotated_node.node_id);
        assert_eq!(bare_node.local_strategy, annotated_node.local_strategy);
        assert_eq!(bare_node.memory_per_subtask, annotated_node.memory_per_subtask);
    }
}

#[test]
fn co_group_repartitions_and_sorts_both_sides() {
    let mut plan = Plan::new("cogroup");
    let left = plan.source("left", "l");
    let right = plan.source("right", "r");
    let grouped = plan.co_group("group", left, right, vec![0], vec![0]);
    plan.sink("out", grouped);

    let compiler = compiler_with(stats(&[("l", 10_000, 1_000_000), ("r", 5_000, 500_000)]));
    let optimized = compiler
        .compile_on(&plan, &default_instance(), &DefaultPostPass)
        .unwrap();

    let cogroup = node_by_name(&optimized, "group");
    assert!(matches!(
        input_ship(&optimized, cogroup, 0),
        ShipStrategy::PartitionHash(_)
    ));
    assert!(matches!(
        input_ship(&optimized, cogroup, 1),
        ShipStrategy::PartitionHash(_)
    ));
    assert_eq!(cogroup.local_strategy, LocalStrategy::SortBothMerge);
}

#[test]
fn cross_broadcasts_the_small_side_and_streams_the_large() {
    let mut plan = Plan::new("cross");
    let small = plan.source("small", "s");
    let large = plan.source("large", "l");
    let product = plan.cross("product", small, large);
    plan.sink("out", product);

    let compiler = compiler_with(stats(&[("s", 10_000, 1_000_000), ("l", 1_000_000, 100_000_000)]));
    let optimized = compiler
        .compile_on(&plan, &default_instance(), &DefaultPostPass)
        .unwrap();

    let cross = node_by_name(&optimized, "product");
    assert_eq!(*input_ship(&optimized, cross, 0), ShipStrategy::Broadcast);
    assert_eq!(*input_ship(&optimized, cross, 1), ShipStrategy::Forward);
    // the replicated small side is the re-read inner loop
    assert_eq!(
        cross.local_strategy,
        LocalStrategy::NestedLoopStreamedOuterSecond
    );
}

#[test]
fn unresponsive_cluster_lookup_times_out() {
    let config = CompilerConfig {
        cluster_info_timeout_ms: 300,
        ..Default::default()
    };
    let compiler = PlanCompiler::new(config)
        .unwrap()
        .with_cluster_info(Arc::new(NeverRespondingCluster));

    let (plan, _) = word_count();
    let start = Instant::now();
    let err = compiler.compile(&plan).unwrap_err();
    assert!(err.to_string().contains("timed out"), "{err}");
    assert!(start.elapsed() < Duration::from_secs(5));
    // the default deadline is ten seconds
    assert_eq!(CompilerConfig::default().cluster_info_timeout_ms, 10_000);
}

#[test]
fn cluster_lookup_feeds_instance_selection() {
    let (plan, stats) = word_count();
    let compiler = compiler_with(stats)
        .with_cluster_info(Arc::new(FixedClusterInfo::single(default_instance())));
    let optimized = compiler.compile(&plan).unwrap();
    assert_eq!(optimized.instance_type, "standard");
    // 96% of the 4 GiB reported free memory
    assert_eq!(
        optimized.memory_per_instance,
        ((4u64 << 30) as f64 * 0.96) as u64
    );
}
