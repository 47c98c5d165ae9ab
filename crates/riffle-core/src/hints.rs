//! Compiler hints attached to contracts.
//!
//! The string keys and values are the stable public boundary (they travel in
//! the contract's parameter bag). The compiler parses them once into the
//! typed enums below at graph creation; unrecognized values are logged at
//! warn level and ignored.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Hint key for the shipping strategy of all input channels of a contract.
pub const HINT_SHIP_STRATEGY: &str = "INPUT_SHIP_STRATEGY";

/// Hint key for the shipping strategy of the first input channel only.
pub const HINT_SHIP_STRATEGY_FIRST: &str = "INPUT_LEFT_SHIP_STRATEGY";

/// Hint key for the shipping strategy of the second input channel only.
pub const HINT_SHIP_STRATEGY_SECOND: &str = "INPUT_RIGHT_SHIP_STRATEGY";

/// Hint key for the contract's local strategy.
pub const HINT_LOCAL_STRATEGY: &str = "LOCAL_STRATEGY";

/// Restricts the shipping strategies considered for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipStrategyHint {
    RepartitionHash,
    RepartitionRange,
    Broadcast,
    Forward,
}

impl FromStr for ShipStrategyHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SHIP_REPARTITION_HASH" => Ok(Self::RepartitionHash),
            "SHIP_REPARTITION_RANGE" => Ok(Self::RepartitionRange),
            "SHIP_BROADCAST" => Ok(Self::Broadcast),
            "SHIP_FORWARD" => Ok(Self::Forward),
            other => Err(format!("unrecognized shipping strategy hint '{other}'")),
        }
    }
}

/// Restricts the local strategies considered for a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalStrategyHint {
    Sort,
    CombiningSort,
    SortBothMerge,
    SortFirstMerge,
    SortSecondMerge,
    Merge,
    HashBuildFirst,
    HashBuildSecond,
    NestedLoopStreamedOuterFirst,
    NestedLoopStreamedOuterSecond,
    NestedLoopBlockedOuterFirst,
    NestedLoopBlockedOuterSecond,
}

impl FromStr for LocalStrategyHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOCAL_STRATEGY_SORT" => Ok(Self::Sort),
            "LOCAL_STRATEGY_COMBINING_SORT" => Ok(Self::CombiningSort),
            "LOCAL_STRATEGY_SORT_BOTH_MERGE" => Ok(Self::SortBothMerge),
            "LOCAL_STRATEGY_SORT_FIRST_MERGE" => Ok(Self::SortFirstMerge),
            "LOCAL_STRATEGY_SORT_SECOND_MERGE" => Ok(Self::SortSecondMerge),
            "LOCAL_STRATEGY_MERGE" => Ok(Self::Merge),
            "LOCAL_STRATEGY_HASH_BUILD_FIRST" => Ok(Self::HashBuildFirst),
            "LOCAL_STRATEGY_HASH_BUILD_SECOND" => Ok(Self::HashBuildSecond),
            "LOCAL_STRATEGY_NESTEDLOOP_STREAMED_OUTER_FIRST" => {
                Ok(Self::NestedLoopStreamedOuterFirst)
            }
            "LOCAL_STRATEGY_NESTEDLOOP_STREAMED_OUTER_SECOND" => {
                Ok(Self::NestedLoopStreamedOuterSecond)
            }
            "LOCAL_STRATEGY_NESTEDLOOP_BLOCKED_OUTER_FIRST" => {
                Ok(Self::NestedLoopBlockedOuterFirst)
            }
            "LOCAL_STRATEGY_NESTEDLOOP_BLOCKED_OUTER_SECOND" => {
                Ok(Self::NestedLoopBlockedOuterSecond)
            }
            other => Err(format!("unrecognized local strategy hint '{other}'")),
        }
    }
}

/// Size-estimation hints a user can attach to a contract.
///
/// These feed the output estimates computed during graph creation; absent
/// values fall back to kind-specific defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimateHints {
    /// Average number of records the user function emits per input record.
    pub avg_records_emitted_per_record: Option<f64>,
    /// Average width of an output record in bytes.
    pub avg_bytes_per_record: Option<f64>,
    /// Number of distinct keys in the output (for grouping operators).
    pub key_cardinality: Option<u64>,
}
