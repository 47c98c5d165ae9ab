//! Minimum-memory pre-budgeting.
//!
//! Before enumeration every memory-consuming node is told the minimal
//! memory its subtasks are guaranteed, assuming an equal split of the
//! instance memory among all consumers. Cost estimation may use this to
//! judge whether hash tables or sort buffers fit.

use super::OptimizerGraph;

pub fn distribute_minimum_memory(graph: &mut OptimizerGraph, memory_per_instance: u64) {
    let consumers: u64 = graph
        .iter()
        .map(|(_, n)| n.memory_consumer_weight as u64)
        .sum();
    let share = if consumers == 0 {
        0
    } else {
        memory_per_instance / consumers
    };

    for handle in graph.handles().collect::<Vec<_>>() {
        let node = graph.node_mut(handle);
        if node.min_memory_per_subtask.is_some() {
            continue;
        }
        let memory = if node.memory_consumer_weight > 0 {
            share * node.memory_consumer_weight as u64 / node.subtasks_per_instance.max(1) as u64
        } else {
            0
        };
        node.min_memory_per_subtask = Some(memory);
    }
}
