//! Global properties: how tuples are distributed across parallel subtasks.

use riffle_core::fields::{FieldSet, KeyOrder};
use serde::{Deserialize, Serialize};

/// Distribution of tuples across the parallel subtasks of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Partitioning {
    /// No statement about the distribution.
    Any,
    /// Tuples with equal values in the fields land in the same partition.
    Hash(FieldSet),
    /// Partitions hold contiguous key ranges in the given order.
    Range(KeyOrder),
    /// Every partition holds the full data set.
    FullReplication,
    /// Exactly one subtask holds all data.
    Singleton,
}

/// Delivered global properties: a fact about a channel or node output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalProperties {
    partitioning: Partitioning,
}

impl GlobalProperties {
    pub fn any() -> Self {
        Self {
            partitioning: Partitioning::Any,
        }
    }

    pub fn hash_partitioned(fields: FieldSet) -> Self {
        Self {
            partitioning: Partitioning::Hash(fields),
        }
    }

    pub fn range_partitioned(order: KeyOrder) -> Self {
        Self {
            partitioning: Partitioning::Range(order),
        }
    }

    pub fn fully_replicated() -> Self {
        Self {
            partitioning: Partitioning::FullReplication,
        }
    }

    pub fn singleton() -> Self {
        Self {
            partitioning: Partitioning::Singleton,
        }
    }

    pub fn partitioning(&self) -> &Partitioning {
        &self.partitioning
    }

    pub fn is_fully_replicated(&self) -> bool {
        self.partitioning == Partitioning::FullReplication
    }

    pub fn is_singleton(&self) -> bool {
        self.partitioning == Partitioning::Singleton
    }

    /// Whether equal keys of `fields` are guaranteed co-located, under any
    /// partitioning scheme. Hash partitioning needs the exact field set;
    /// range partitioning needs `fields` to be a prefix of its order; a
    /// singleton trivially co-locates everything. Replication duplicates
    /// keys and therefore never counts.
    pub fn is_partitioned_on(&self, fields: &FieldSet) -> bool {
        match &self.partitioning {
            Partitioning::Hash(f) => f == fields,
            Partitioning::Range(order) => order.prefix_covers(fields),
            Partitioning::Singleton => true,
            Partitioning::Any | Partitioning::FullReplication => false,
        }
    }

    pub fn satisfies(&self, requested: &RequestedGlobalProperties) -> bool {
        match requested.partitioning() {
            Partitioning::Any => true,
            Partitioning::Hash(f) => matches!(&self.partitioning, Partitioning::Hash(d) if d == f),
            Partitioning::Range(o) => {
                matches!(&self.partitioning, Partitioning::Range(d) if d == o)
            }
            Partitioning::FullReplication => self.is_fully_replicated(),
            Partitioning::Singleton => self.is_singleton(),
        }
    }
}

/// Requested global properties: a constraint placed on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedGlobalProperties {
    partitioning: Partitioning,
}

impl RequestedGlobalProperties {
    pub fn any() -> Self {
        Self {
            partitioning: Partitioning::Any,
        }
    }

    pub fn hash_partitioned(fields: FieldSet) -> Self {
        Self {
            partitioning: Partitioning::Hash(fields),
        }
    }

    pub fn range_partitioned(order: KeyOrder) -> Self {
        Self {
            partitioning: Partitioning::Range(order),
        }
    }

    pub fn fully_replicated() -> Self {
        Self {
            partitioning: Partitioning::FullReplication,
        }
    }

    pub fn singleton() -> Self {
        Self {
            partitioning: Partitioning::Singleton,
        }
    }

    pub fn partitioning(&self) -> &Partitioning {
        &self.partitioning
    }

    pub fn is_trivial(&self) -> bool {
        self.partitioning == Partitioning::Any
    }
}
