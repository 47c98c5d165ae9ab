//! Output size estimation per node kind.
//!
//! Sources ask the statistics provider; internal nodes derive their figures
//! from their inputs and the user's estimate hints. Unknown inputs stay
//! unknown rather than being invented here; the cost model substitutes its
//! conservative defaults at the point of use.

use riffle_core::hints::EstimateHints;
use riffle_core::statistics::DataStatistics;

use super::{Estimates, NodeHandle, NodeKind, OptimizerNode};

pub(crate) fn compute_output_estimates(
    nodes: &[OptimizerNode],
    handle: NodeHandle,
    statistics: Option<&dyn DataStatistics>,
    hints: &EstimateHints,
) -> Estimates {
    let node = &nodes[handle.index()];
    let input = |i: usize| nodes[node.inputs[i].index()].estimates;

    match &node.kind {
        NodeKind::Source { source_id } => {
            let stats = statistics.and_then(|s| s.source_stats(source_id));
            let num_bytes = stats.and_then(|s| s.num_bytes);
            let avg_width = hints
                .avg_bytes_per_record
                .or(stats.and_then(|s| s.avg_record_bytes));
            let num_records = stats.and_then(|s| s.num_records).or_else(|| {
                match (num_bytes, avg_width) {
                    (Some(bytes), Some(width)) if width > 0.0 => {
                        Some((bytes as f64 / width) as u64)
                    }
                    _ => None,
                }
            });
            finish(num_records, avg_width, num_bytes)
        }
        NodeKind::Map => {
            let upstream = input(0);
            let num_records = upstream.num_records.map(|r| {
                scale(r, hints.avg_records_emitted_per_record.unwrap_or(1.0))
            });
            let avg_width = hints.avg_bytes_per_record.or(upstream.avg_record_bytes);
            finish(num_records, avg_width, None)
        }
        NodeKind::Reduce { .. } => {
            let upstream = input(0);
            // without a key-cardinality hint the input cardinality is the
            // (loose) upper bound on the number of groups
            let num_records = hints.key_cardinality.or(upstream.num_records);
            let avg_width = hints.avg_bytes_per_record.or(upstream.avg_record_bytes);
            finish(num_records, avg_width, None)
        }
        NodeKind::Match { .. } => {
            let (first, second) = (input(0), input(1));
            let num_records = match (first.num_records, second.num_records) {
                (Some(a), Some(b)) => Some(a.min(b)),
                _ => None,
            };
            let avg_width = hints
                .avg_bytes_per_record
                .or(combined_width(&first, &second));
            finish(num_records, avg_width, None)
        }
        NodeKind::CoGroup { .. } => {
            let (first, second) = (input(0), input(1));
            let num_records = match (first.num_records, second.num_records) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            };
            let avg_width = hints
                .avg_bytes_per_record
                .or(combined_width(&first, &second));
            finish(num_records, avg_width, None)
        }
        NodeKind::Cross => {
            let (first, second) = (input(0), input(1));
            let num_records = match (first.num_records, second.num_records) {
                (Some(a), Some(b)) => Some(a.saturating_mul(b)),
                _ => None,
            };
            let avg_width = hints
                .avg_bytes_per_record
                .or(combined_width(&first, &second));
            finish(num_records, avg_width, None)
        }
        NodeKind::Sink => input(0),
        NodeKind::SinkJoiner => Estimates::default(),
    }
}

fn combined_width(first: &Estimates, second: &Estimates) -> Option<f64> {
    match (first.avg_record_bytes, second.avg_record_bytes) {
        (Some(a), Some(b)) => Some(a + b),
        _ => None,
    }
}

fn scale(records: u64, factor: f64) -> u64 {
    (records as f64 * factor.max(0.0)) as u64
}

fn finish(num_records: Option<u64>, avg_width: Option<f64>, num_bytes: Option<u64>) -> Estimates {
    let output_bytes = num_bytes.or(match (num_records, avg_width) {
        (Some(records), Some(width)) => Some((records as f64 * width) as u64),
        _ => None,
    });
    Estimates {
        num_records,
        avg_record_bytes: avg_width,
        output_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::super::OptimizerGraph;
    use riffle_core::contract::Plan;
    use riffle_core::hints::EstimateHints;
    use riffle_core::statistics::{BasicStatistics, SourceStats};

    #[test]
    fn estimates_flow_through_the_plan() {
        let mut stats = BasicStatistics::new();
        stats.cache(
            "s",
            SourceStats {
                num_records: Some(1_000),
                avg_record_bytes: Some(100.0),
                num_bytes: Some(100_000),
            },
        );

        let mut plan = Plan::new("p");
        let src = plan.source("src", "s");
        let map = plan.map("map", src);
        plan.set_estimate_hints(
            map,
            EstimateHints {
                avg_records_emitted_per_record: Some(2.0),
                avg_bytes_per_record: Some(10.0),
                key_cardinality: None,
            },
        );
        let red = plan.reduce("red", map, vec![0]);
        plan.set_estimate_hints(
            red,
            EstimateHints {
                key_cardinality: Some(50),
                ..Default::default()
            },
        );
        plan.sink("out", red);

        let graph = OptimizerGraph::build(&plan, Some(&stats), -1, 4, true).unwrap();

        let src_est = graph.node(graph.sources[0]).estimates;
        assert_eq!(src_est.num_records, Some(1_000));
        assert_eq!(src_est.output_bytes, Some(100_000));

        let map_est = graph
            .iter()
            .find(|(_, n)| n.name == "map")
            .map(|(_, n)| n.estimates)
            .unwrap();
        assert_eq!(map_est.num_records, Some(2_000));
        assert_eq!(map_est.output_bytes, Some(20_000));

        let red_est = graph
            .iter()
            .find(|(_, n)| n.name == "red")
            .map(|(_, n)| n.estimates)
            .unwrap();
        assert_eq!(red_est.num_records, Some(50));
    }

    #[test]
    fn unknown_sources_stay_unknown() {
        let mut plan = Plan::new("p");
        let src = plan.source("src", "missing");
        let red = plan.reduce("red", src, vec![0]);
        plan.sink("out", red);

        let graph = OptimizerGraph::build(&plan, None, -1, 4, true).unwrap();
        let est = graph.node(graph.sources[0]).estimates;
        assert_eq!(est.num_records, None);
        assert_eq!(est.output_bytes, None);
    }
}
