//! Shipping and local execution strategies.
//!
//! A shipping strategy moves records between producer and consumer subtasks
//! and *filters* the delivered global properties; a local strategy processes
//! one partition at the consumer and *produces* delivered local properties.
//! The derive order of both enums is the deterministic tie-break order among
//! equal-cost candidates.

use riffle_core::fields::{FieldList, KeyOrder};
use riffle_core::hints::{LocalStrategyHint, ShipStrategyHint};
use serde::{Deserialize, Serialize};

use crate::props::{GlobalProperties, LocalProperties};

/// How records travel from producer to consumer subtasks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShipStrategy {
    /// Local forward, no redistribution.
    Forward,
    /// Repartition by hashing the given fields.
    PartitionHash(FieldList),
    /// Repartition into contiguous ranges of the given order.
    PartitionRange(KeyOrder),
    /// Replicate the full data to every consumer subtask.
    Broadcast,
}

impl ShipStrategy {
    /// Number of redistribution operations this strategy performs.
    pub fn partition_ops(&self) -> u32 {
        match self {
            ShipStrategy::Forward => 0,
            _ => 1,
        }
    }

    pub fn matches_hint(&self, hint: ShipStrategyHint) -> bool {
        matches!(
            (self, hint),
            (ShipStrategy::Forward, ShipStrategyHint::Forward)
                | (ShipStrategy::PartitionHash(_), ShipStrategyHint::RepartitionHash)
                | (ShipStrategy::PartitionRange(_), ShipStrategyHint::RepartitionRange)
                | (ShipStrategy::Broadcast, ShipStrategyHint::Broadcast)
        )
    }

    /// Delivered properties at the receiving end of a channel using this
    /// strategy, given the producer's delivered properties and the degrees
    /// of parallelism on both sides.
    ///
    /// Forwarding between differing degrees of parallelism implies a
    /// redistribution, which erases all properties. Any strategy into a
    /// single consumer subtask collapses to a singleton; the arrival order
    /// of the merged streams is unspecified, so local properties survive
    /// only a true one-to-one forward.
    pub fn deliver(
        &self,
        source_global: &GlobalProperties,
        source_local: &LocalProperties,
        source_dop: u32,
        target_dop: u32,
    ) -> (GlobalProperties, LocalProperties) {
        match self {
            ShipStrategy::Forward => {
                if source_dop == target_dop {
                    (source_global.clone(), source_local.clone())
                } else if target_dop == 1 {
                    (GlobalProperties::singleton(), LocalProperties::none())
                } else {
                    (GlobalProperties::any(), LocalProperties::none())
                }
            }
            ShipStrategy::PartitionHash(fields) => {
                let global = if target_dop == 1 {
                    GlobalProperties::singleton()
                } else {
                    GlobalProperties::hash_partitioned(fields.to_set())
                };
                (global, LocalProperties::none())
            }
            ShipStrategy::PartitionRange(order) => {
                let global = if target_dop == 1 {
                    GlobalProperties::singleton()
                } else {
                    GlobalProperties::range_partitioned(order.clone())
                };
                (global, LocalProperties::none())
            }
            ShipStrategy::Broadcast => {
                let global = if target_dop == 1 {
                    GlobalProperties::singleton()
                } else {
                    GlobalProperties::fully_replicated()
                };
                (global, LocalProperties::none())
            }
        }
    }
}

/// How a consumer processes the data of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LocalStrategy {
    /// Pipelined pass-through; no local processing choice.
    None,
    /// Sort the input to group equal keys.
    Sort,
    /// Sort with repeated combining to shrink the spill volume.
    CombiningSort,
    /// Sort both inputs, then merge.
    SortBothMerge,
    /// Sort the first input, merge with the already-sorted second.
    SortFirstMerge,
    /// Sort the second input, merge with the already-sorted first.
    SortSecondMerge,
    /// Merge two already-sorted inputs.
    Merge,
    /// Build a hash table from the first input, probe with the second.
    HashBuildFirst,
    /// Build a hash table from the second input, probe with the first.
    HashBuildSecond,
    /// Nested loops, first input streamed as the outer side.
    NestedLoopStreamedOuterFirst,
    /// Nested loops, second input streamed as the outer side.
    NestedLoopStreamedOuterSecond,
    /// Nested loops, first input processed in blocks as the outer side.
    NestedLoopBlockedOuterFirst,
    /// Nested loops, second input processed in blocks as the outer side.
    NestedLoopBlockedOuterSecond,
}

impl LocalStrategy {
    pub fn is_sort_based(&self) -> bool {
        matches!(
            self,
            LocalStrategy::Sort
                | LocalStrategy::CombiningSort
                | LocalStrategy::SortBothMerge
                | LocalStrategy::SortFirstMerge
                | LocalStrategy::SortSecondMerge
        )
    }

    pub fn matches_hint(&self, hint: LocalStrategyHint) -> bool {
        matches!(
            (self, hint),
            (LocalStrategy::Sort, LocalStrategyHint::Sort)
                | (LocalStrategy::CombiningSort, LocalStrategyHint::CombiningSort)
                | (LocalStrategy::SortBothMerge, LocalStrategyHint::SortBothMerge)
                | (LocalStrategy::SortFirstMerge, LocalStrategyHint::SortFirstMerge)
                | (LocalStrategy::SortSecondMerge, LocalStrategyHint::SortSecondMerge)
                | (LocalStrategy::Merge, LocalStrategyHint::Merge)
                | (LocalStrategy::HashBuildFirst, LocalStrategyHint::HashBuildFirst)
                | (LocalStrategy::HashBuildSecond, LocalStrategyHint::HashBuildSecond)
                | (
                    LocalStrategy::NestedLoopStreamedOuterFirst,
                    LocalStrategyHint::NestedLoopStreamedOuterFirst
                )
                | (
                    LocalStrategy::NestedLoopStreamedOuterSecond,
                    LocalStrategyHint::NestedLoopStreamedOuterSecond
                )
                | (
                    LocalStrategy::NestedLoopBlockedOuterFirst,
                    LocalStrategyHint::NestedLoopBlockedOuterFirst
                )
                | (
                    LocalStrategy::NestedLoopBlockedOuterSecond,
                    LocalStrategyHint::NestedLoopBlockedOuterSecond
                )
        )
    }
}

/// Filter a strategy set down to a hint, keeping the full set when the hint
/// matches nothing (the hint is then inapplicable and has been warned
/// about at parse time).
pub fn apply_ship_hint(
    options: Vec<ShipStrategy>,
    hint: Option<ShipStrategyHint>,
) -> Vec<ShipStrategy> {
    match hint {
        None => options,
        Some(h) => {
            let filtered: Vec<_> = options
                .iter()
                .filter(|s| s.matches_hint(h))
                .cloned()
                .collect();
            if filtered.is_empty() {
                options
            } else {
                filtered
            }
        }
    }
}

/// Like [`apply_ship_hint`], for local strategies.
pub fn apply_local_hint(
    options: Vec<LocalStrategy>,
    hint: Option<LocalStrategyHint>,
) -> Vec<LocalStrategy> {
    match hint {
        None => options,
        Some(h) => {
            let filtered: Vec<_> = options
                .iter()
                .filter(|s| s.matches_hint(h))
                .copied()
                .collect();
            if filtered.is_empty() {
                options
            } else {
                filtered
            }
        }
    }
}
