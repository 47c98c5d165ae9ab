//! Graph creation: depth-first translation of the contract DAG.
//!
//! The walk descends from each sink. On the first pre-visit of a contract
//! the matching node is allocated and its parallelism resolved; on the first
//! post-visit the node receives its id (post-order, starting at 1), is wired
//! to its inputs, and gets its output estimates. A contract reached twice
//! reuses the same node, which is what turns shared subplans into a DAG.

use std::collections::HashMap;
use std::str::FromStr;

use riffle_core::contract::{Contract, ContractKind, Plan};
use riffle_core::error::{Error, Result};
use riffle_core::hints::{
    LocalStrategyHint, ShipStrategyHint, HINT_LOCAL_STRATEGY, HINT_SHIP_STRATEGY,
    HINT_SHIP_STRATEGY_FIRST, HINT_SHIP_STRATEGY_SECOND,
};
use riffle_core::id::ContractId;
use riffle_core::statistics::DataStatistics;

use super::{estimates, Estimates, NodeHandle, NodeKind, OptimizerGraph, OptimizerNode};

struct GraphBuilder<'a> {
    plan: &'a Plan,
    statistics: Option<&'a dyn DataStatistics>,
    max_machines: i32,
    default_parallelism: u32,
    compute_estimates: bool,
    nodes: Vec<OptimizerNode>,
    seen: HashMap<ContractId, NodeHandle>,
    sources: Vec<NodeHandle>,
    sinks: Vec<NodeHandle>,
    next_id: u32,
}

impl OptimizerGraph {
    /// Translate `plan` into the optimizer representation, joining multiple
    /// sinks under synthetic [`NodeKind::SinkJoiner`] nodes until one root
    /// remains.
    pub fn build(
        plan: &Plan,
        statistics: Option<&dyn DataStatistics>,
        max_machines: i32,
        default_parallelism: u32,
        compute_estimates: bool,
    ) -> Result<OptimizerGraph> {
        if plan.sinks().is_empty() {
            return Err(Error::EmptyPlan("the plan has no sinks".to_string()));
        }

        let mut builder = GraphBuilder {
            plan,
            statistics,
            max_machines,
            default_parallelism,
            compute_estimates,
            nodes: Vec::with_capacity(plan.len()),
            seen: HashMap::with_capacity(plan.len()),
            sources: Vec::new(),
            sinks: Vec::new(),
            next_id: 1,
        };

        for &sink in plan.sinks() {
            builder.visit(sink)?;
        }

        let root = builder.join_sinks();

        Ok(OptimizerGraph {
            nodes: builder.nodes,
            sources: builder.sources,
            sinks: builder.sinks,
            root,
        })
    }
}

impl<'a> GraphBuilder<'a> {
    fn visit(&mut self, contract_id: ContractId) -> Result<NodeHandle> {
        // check if we have been here before
        if let Some(&handle) = self.seen.get(&contract_id) {
            return Ok(handle);
        }

        let contract = self.plan.contract(contract_id);
        let handle = self.create_node(contract_id, contract)?;
        self.seen.insert(contract_id, handle);

        let mut input_handles = Vec::with_capacity(contract.kind.arity());
        for input in contract.kind.inputs() {
            input_handles.push(self.visit(input)?);
        }

        // post-visit: assign the id and wire the inputs
        self.nodes[handle.index()].id = self.next_id;
        self.next_id += 1;

        for input in input_handles {
            let out_edge = self.nodes[input.index()].outputs.len() as u32;
            self.nodes[input.index()].outputs.push(handle);
            let node = &mut self.nodes[handle.index()];
            node.inputs.push(input);
            node.input_out_edge.push(out_edge);
        }

        if self.compute_estimates {
            let computed = estimates::compute_output_estimates(
                &self.nodes,
                handle,
                self.statistics,
                &contract.estimate_hints,
            );
            self.nodes[handle.index()].estimates = computed;
        }

        Ok(handle)
    }

    fn create_node(&mut self, contract_id: ContractId, contract: &Contract) -> Result<NodeHandle> {
        let kind = match &contract.kind {
            ContractKind::Source { source_id } => NodeKind::Source {
                source_id: source_id.clone(),
            },
            ContractKind::Sink { .. } => NodeKind::Sink,
            ContractKind::Map { .. } => NodeKind::Map,
            ContractKind::Reduce {
                keys, combinable, ..
            } => NodeKind::Reduce {
                keys: keys.clone(),
                combinable: *combinable,
            },
            ContractKind::Match {
                keys_first,
                keys_second,
                ..
            } => NodeKind::Match {
                keys_first: keys_first.clone(),
                keys_second: keys_second.clone(),
            },
            ContractKind::CoGroup {
                keys_first,
                keys_second,
                ..
            } => NodeKind::CoGroup {
                keys_first: keys_first.clone(),
                keys_second: keys_second.clone(),
            },
            ContractKind::Cross { .. } => NodeKind::Cross,
        };

        let dop = if contract.parallelism >= 1 {
            contract.parallelism as u32
        } else {
            self.default_parallelism
        };

        // group subtasks onto instances so the machine cap is obeyed
        let subtasks_per_instance = if self.max_machines > 0 {
            dop.div_ceil(self.max_machines as u32).max(1)
        } else {
            1
        };

        let arity = contract.kind.arity();
        let node = OptimizerNode {
            id: 0,
            contract: contract_id,
            name: contract.name.clone(),
            memory_consumer_weight: if kind.is_memory_consumer() { 1 } else { 0 },
            ship_hints: parse_ship_hints(contract, arity),
            local_hint: parse_local_hint(contract, &kind),
            kind,
            inputs: Vec::with_capacity(arity),
            input_out_edge: Vec::with_capacity(arity),
            outputs: Vec::new(),
            dop,
            subtasks_per_instance,
            estimates: Estimates::default(),
            min_memory_per_subtask: None,
            interesting: None,
            open_branches: Vec::new(),
        };

        let handle = NodeHandle::new(self.nodes.len());
        self.nodes.push(node);

        match &self.nodes[handle.index()].kind {
            NodeKind::Source { .. } => self.sources.push(handle),
            NodeKind::Sink => self.sinks.push(handle),
            _ => {}
        }

        Ok(handle)
    }

    /// Fold multiple sinks left-deep under sink joiners until a single root
    /// remains; joiner ids continue the post-order sequence.
    fn join_sinks(&mut self) -> NodeHandle {
        let mut root = self.sinks[0];
        for i in 1..self.sinks.len() {
            let next = self.sinks[i];
            let dop = self.nodes[root.index()]
                .dop
                .max(self.nodes[next.index()].dop);
            let joiner = OptimizerNode {
                id: self.next_id,
                contract: self.nodes[root.index()].contract,
                name: "sink joiner".to_string(),
                kind: NodeKind::SinkJoiner,
                inputs: Vec::with_capacity(2),
                input_out_edge: Vec::with_capacity(2),
                outputs: Vec::new(),
                dop,
                subtasks_per_instance: 1,
                ship_hints: vec![None, None],
                local_hint: None,
                estimates: Estimates::default(),
                memory_consumer_weight: 0,
                min_memory_per_subtask: None,
                interesting: None,
                open_branches: Vec::new(),
            };
            self.next_id += 1;

            let handle = NodeHandle::new(self.nodes.len());
            self.nodes.push(joiner);
            for input in [root, next] {
                let out_edge = self.nodes[input.index()].outputs.len() as u32;
                self.nodes[input.index()].outputs.push(handle);
                let node = &mut self.nodes[handle.index()];
                node.inputs.push(input);
                node.input_out_edge.push(out_edge);
            }
            root = handle;
        }
        root
    }
}

fn parse_ship_hints(contract: &Contract, arity: usize) -> Vec<Option<ShipStrategyHint>> {
    let mut hints = vec![None; arity];
    if arity == 0 {
        return hints;
    }

    if let Some(value) = contract.parameters.get(HINT_SHIP_STRATEGY) {
        match ShipStrategyHint::from_str(value) {
            Ok(hint) => hints.iter_mut().for_each(|slot| *slot = Some(hint)),
            Err(msg) => tracing::warn!(contract = %contract.name, "{msg}, ignoring"),
        }
    }

    // the per-side keys only make sense for contracts with two inputs
    if arity == 2 {
        let per_input = [HINT_SHIP_STRATEGY_FIRST, HINT_SHIP_STRATEGY_SECOND];
        for (idx, key) in per_input.iter().enumerate() {
            if let Some(value) = contract.parameters.get(*key) {
                match ShipStrategyHint::from_str(value) {
                    Ok(hint) => hints[idx] = Some(hint),
                    Err(msg) => tracing::warn!(contract = %contract.name, "{msg}, ignoring"),
                }
            }
        }
    }

    hints
}

fn parse_local_hint(contract: &Contract, kind: &NodeKind) -> Option<LocalStrategyHint> {
    let value = contract.parameters.get(HINT_LOCAL_STRATEGY)?;
    match LocalStrategyHint::from_str(value) {
        Ok(hint) => {
            if local_hint_applies(hint, kind) {
                Some(hint)
            } else {
                tracing::warn!(
                    contract = %contract.name,
                    hint = ?hint,
                    kind = kind.label(),
                    "local strategy hint does not apply to this contract kind, ignoring"
                );
                None
            }
        }
        Err(msg) => {
            tracing::warn!(contract = %contract.name, "{msg}, ignoring");
            None
        }
    }
}

fn local_hint_applies(hint: LocalStrategyHint, kind: &NodeKind) -> bool {
    use LocalStrategyHint::*;
    match kind {
        NodeKind::Reduce { .. } => matches!(hint, Sort | CombiningSort),
        NodeKind::Match { .. } => matches!(
            hint,
            SortBothMerge | SortFirstMerge | SortSecondMerge | Merge | HashBuildFirst
                | HashBuildSecond
        ),
        NodeKind::CoGroup { .. } => {
            matches!(hint, SortBothMerge | SortFirstMerge | SortSecondMerge | Merge)
        }
        NodeKind::Cross => matches!(
            hint,
            NestedLoopStreamedOuterFirst
                | NestedLoopStreamedOuterSecond
                | NestedLoopBlockedOuterFirst
                | NestedLoopBlockedOuterSecond
        ),
        _ => false,
    }
}
