//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use riffle::prelude::*;
use riffle::PlanCompiler;

pub fn instance(free_memory_bytes: u64, num_cores: u32, max_instances: u32) -> InstanceTypeDescription {
    InstanceTypeDescription {
        identifier: "standard".to_string(),
        hardware: Some(HardwareDescription {
            free_memory_bytes,
            num_cores,
        }),
        max_instances,
    }
}

/// Four instances with 4 GiB each; the default target of these tests.
pub fn default_instance() -> InstanceTypeDescription {
    instance(4 << 30, 8, 4)
}

pub fn stats(entries: &[(&str, u64, u64)]) -> BasicStatistics {
    let mut stats = BasicStatistics::new();
    for (id, records, bytes) in entries {
        stats.cache(
            *id,
            SourceStats {
                num_records: Some(*records),
                avg_record_bytes: Some(*bytes as f64 / (*records).max(1) as f64),
                num_bytes: Some(*bytes),
            },
        );
    }
    stats
}

pub fn compiler_with(statistics: BasicStatistics) -> PlanCompiler {
    PlanCompiler::new(CompilerConfig::default())
        .unwrap()
        .with_statistics(Arc::new(statistics))
}

/// Word count: Source -> Map(tokenize) -> Reduce(sum per word) -> Sink.
pub fn word_count() -> (Plan, BasicStatistics) {
    let mut plan = Plan::new("word count");
    let lines = plan.source("lines", "hdfs://data/lines");
    let words = plan.map("tokenize", lines);
    let counts = plan.reduce("count", words, vec![0]);
    plan.set_combinable(counts, true);
    plan.sink("out", counts);
    (plan, stats(&[("hdfs://data/lines", 1_000_000, 100_000_000)]))
}

/// Equi-join of a large and a tiny input, both keyed on field 0.
pub fn skewed_join() -> (Plan, BasicStatistics, ContractId) {
    let mut plan = Plan::new("skewed join");
    let large = plan.source("large", "hdfs://data/large");
    let small = plan.source("small", "hdfs://data/small");
    let joined = plan.match_join("join", large, small, vec![0], vec![0]);
    plan.sink("out", joined);
    let stats = stats(&[
        ("hdfs://data/large", 100_000_000, 1_000_000_000),
        ("hdfs://data/small", 10_000, 100_000),
    ]);
    (plan, stats, joined)
}

/// Both join sides pre-aggregated on the join key, so they arrive already
/// hash partitioned and sorted.
pub fn co_partitioned_join() -> (Plan, BasicStatistics) {
    let mut plan = Plan::new("co-partitioned join");
    let left = plan.source("left", "hdfs://data/left");
    let left_agg = plan.reduce("left agg", left, vec![0]);
    let right = plan.source("right", "hdfs://data/right");
    let right_agg = plan.reduce("right agg", right, vec![0]);
    let joined = plan.match_join("join", left_agg, right_agg, vec![0], vec![0]);
    plan.sink("out", joined);
    let stats = stats(&[
        ("hdfs://data/left", 1_000_000, 10_000_000),
        ("hdfs://data/right", 2_000_000, 20_000_000),
    ]);
    (plan, stats)
}

/// A cluster-information provider that never answers.
pub struct NeverRespondingCluster;

impl ClusterInfo for NeverRespondingCluster {
    fn instance_types(
        &self,
    ) -> riffle::error::Result<BTreeMap<String, InstanceTypeDescription>> {
        loop {
            std::thread::park();
        }
    }
}
