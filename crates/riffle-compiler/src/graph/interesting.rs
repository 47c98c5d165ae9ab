//! Top-down propagation of interesting properties.
//!
//! A node's interesting properties are the union of what its consumers would
//! benefit from. Because the graph is a DAG, a node may only be processed
//! once requests have arrived on *every* outgoing edge; a premature visit
//! would propagate incomplete requests. The descent therefore tracks an
//! arrival counter per node and only then derives the requests the node
//! places on its own inputs.

use riffle_core::fields::KeyOrder;

use crate::costs::CostEstimator;
use crate::props::{
    InterestingProperties, RequestedGlobalProperties, RequestedLocalProperties,
};

use super::{NodeHandle, NodeKind, OptimizerGraph};

pub fn propagate_interesting_properties(
    graph: &mut OptimizerGraph,
    estimator: &dyn CostEstimator,
) {
    let len = graph.len();
    let mut arriving: Vec<InterestingProperties> = vec![InterestingProperties::none(); len];
    let mut arrived_edges: Vec<usize> = vec![0; len];
    let mut stack: Vec<NodeHandle> = vec![graph.root];

    while let Some(handle) = stack.pop() {
        let own = std::mem::take(&mut arriving[handle.index()]);
        graph.node_mut(handle).interesting = Some(own.clone());

        let node = graph.node(handle);
        let kind = node.kind.clone();
        let dop = node.dop;
        let inputs = node.inputs.clone();

        for (idx, &input) in inputs.iter().enumerate() {
            let estimates = graph.node(input).estimates;
            let maximal = estimator.maximal_property_cost(&estimates, dop);
            let requests = requests_for_input(&kind, idx, &own, maximal);
            arriving[input.index()].union_with(&requests);

            arrived_edges[input.index()] += 1;
            if arrived_edges[input.index()] == graph.node(input).outputs.len() {
                stack.push(input);
            }
        }
    }
}

/// The requests a node of `kind` places on its input `idx`, given the union
/// `own` of what arrived from its consumers.
fn requests_for_input(
    kind: &NodeKind,
    idx: usize,
    own: &InterestingProperties,
    maximal: crate::costs::Cost,
) -> InterestingProperties {
    let mut requests = InterestingProperties::none();
    match kind {
        // pass-through nodes forward what their consumers asked for
        NodeKind::Sink | NodeKind::SinkJoiner | NodeKind::Map => {
            requests.union_with(own);
        }
        NodeKind::Reduce { keys, .. } => {
            let set = keys.to_set();
            requests.add_global(RequestedGlobalProperties::hash_partitioned(set.clone()), maximal);
            requests.add_global(
                RequestedGlobalProperties::range_partitioned(KeyOrder::ascending(keys)),
                maximal,
            );
            requests.add_local(RequestedLocalProperties::GroupedOn(set), maximal);
        }
        NodeKind::Match { keys_first, keys_second }
        | NodeKind::CoGroup { keys_first, keys_second } => {
            let keys = if idx == 0 { keys_first } else { keys_second };
            let set = keys.to_set();
            requests.add_global(RequestedGlobalProperties::hash_partitioned(set.clone()), maximal);
            requests.add_global(
                RequestedGlobalProperties::range_partitioned(KeyOrder::ascending(keys)),
                maximal,
            );
            requests.add_local(RequestedLocalProperties::GroupedOn(set), maximal);
        }
        NodeKind::Cross => {
            // either side may be replicated; both alternatives are tracked
            requests.add_global(RequestedGlobalProperties::fully_replicated(), maximal);
        }
        NodeKind::Source { .. } => {}
    }
    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costs::DefaultCostEstimator;
    use crate::props::Partitioning;
    use riffle_core::contract::Plan;

    #[test]
    fn reduce_requests_partitioning_and_grouping_upstream() {
        let mut plan = Plan::new("p");
        let src = plan.source("src", "s");
        let map = plan.map("map", src);
        let red = plan.reduce("red", map, vec![0]);
        plan.sink("out", red);

        let mut graph = OptimizerGraph::build(&plan, None, -1, 4, true).unwrap();
        propagate_interesting_properties(&mut graph, &DefaultCostEstimator);

        // the map sees the reduce's requests, and passes them to the source
        for name in ["map", "src"] {
            let (_, node) = graph.iter().find(|(_, n)| n.name == name).unwrap();
            let props = node.interesting.as_ref().unwrap();
            assert_eq!(props.globals.len(), 2, "{name}");
            assert_eq!(props.locals.len(), 1, "{name}");
            assert!(props
                .globals
                .iter()
                .any(|g| matches!(g.properties.partitioning(), Partitioning::Hash(_))));
        }

        // the reduce itself only sees the sink's (empty) requests
        let (_, red_node) = graph.iter().find(|(_, n)| n.name == "red").unwrap();
        assert!(red_node.interesting.as_ref().unwrap().is_empty());
    }

    #[test]
    fn descent_waits_for_all_output_edges() {
        // src feeds two branches which reconverge in a match; the source's
        // interesting properties must union both sides' requests
        let mut plan = Plan::new("diamond");
        let src = plan.source("src", "s");
        let a = plan.map("a", src);
        let b = plan.map("b", src);
        let join = plan.match_join("join", a, b, vec![0], vec![1]);
        plan.sink("out", join);

        let mut graph = OptimizerGraph::build(&plan, None, -1, 4, true).unwrap();
        propagate_interesting_properties(&mut graph, &DefaultCostEstimator);

        let (_, src_node) = graph.iter().find(|(_, n)| n.name == "src").unwrap();
        let props = src_node.interesting.as_ref().unwrap();
        // hash + range for field 0 (via a) and for field 1 (via b)
        assert_eq!(props.globals.len(), 4);
        assert_eq!(props.locals.len(), 2);
    }
}
