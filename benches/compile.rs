use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use riffle::prelude::*;
use riffle::{DefaultPostPass, PlanCompiler};

fn analytics_plan() -> (Plan, BasicStatistics) {
    let mut plan = Plan::new("bench");
    let facts = plan.source("facts", "facts");
    let dims = plan.source("dims", "dims");
    let cleaned = plan.map("clean", facts);
    let joined = plan.match_join("enrich", cleaned, dims, vec![0], vec![0]);
    let agg = plan.reduce("aggregate", joined, vec![1]);
    plan.set_combinable(agg, true);
    plan.sink("report", agg);

    let mut stats = BasicStatistics::new();
    stats.cache(
        "facts",
        SourceStats {
            num_records: Some(10_000_000),
            avg_record_bytes: Some(64.0),
            num_bytes: Some(640_000_000),
        },
    );
    stats.cache(
        "dims",
        SourceStats {
            num_records: Some(100_000),
            avg_record_bytes: Some(32.0),
            num_bytes: Some(3_200_000),
        },
    );
    (plan, stats)
}

fn bench_compile(c: &mut Criterion) {
    let (plan, stats) = analytics_plan();
    let compiler = PlanCompiler::new(CompilerConfig::default())
        .unwrap()
        .with_statistics(Arc::new(stats));
    let instance = InstanceTypeDescription {
        identifier: "bench".into(),
        hardware: Some(HardwareDescription {
            free_memory_bytes: 8 << 30,
            num_cores: 16,
        }),
        max_instances: 8,
    };
    c.bench_function("compile_analytics_plan", |b| {
        b.iter(|| {
            compiler
                .compile_on(&plan, &instance, &DefaultPostPass)
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
