//! Interesting properties: what downstream consumers would benefit from.
//!
//! Each entry pairs a requested property with the maximal cost its early
//! establishment could save. The enumerator keeps candidates alive for an
//! interesting property only while their extra cost stays below that figure.

use serde::Serialize;

use crate::costs::Cost;
use crate::props::{GlobalProperties, LocalProperties, RequestedGlobalProperties, RequestedLocalProperties};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterestingGlobal {
    pub properties: RequestedGlobalProperties,
    pub maximal_cost: Cost,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterestingLocal {
    pub properties: RequestedLocalProperties,
    pub maximal_cost: Cost,
}

/// The union of property requests arriving at a node from its consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterestingProperties {
    pub globals: Vec<InterestingGlobal>,
    pub locals: Vec<InterestingLocal>,
}

impl InterestingProperties {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty() && self.locals.is_empty()
    }

    /// Add a global request, deduplicating on the property and keeping the
    /// larger savings figure.
    pub fn add_global(&mut self, properties: RequestedGlobalProperties, maximal_cost: Cost) {
        if properties.is_trivial() {
            return;
        }
        for existing in &mut self.globals {
            if existing.properties == properties {
                if maximal_cost.weighted_total() > existing.maximal_cost.weighted_total() {
                    existing.maximal_cost = maximal_cost;
                }
                return;
            }
        }
        self.globals.push(InterestingGlobal {
            properties,
            maximal_cost,
        });
    }

    /// Add a local request, deduplicating like [`add_global`](Self::add_global).
    pub fn add_local(&mut self, properties: RequestedLocalProperties, maximal_cost: Cost) {
        if properties == RequestedLocalProperties::Any {
            return;
        }
        for existing in &mut self.locals {
            if existing.properties == properties {
                if maximal_cost.weighted_total() > existing.maximal_cost.weighted_total() {
                    existing.maximal_cost = maximal_cost;
                }
                return;
            }
        }
        self.locals.push(InterestingLocal {
            properties,
            maximal_cost,
        });
    }

    pub fn union_with(&mut self, other: &InterestingProperties) {
        for g in &other.globals {
            self.add_global(g.properties.clone(), g.maximal_cost);
        }
        for l in &other.locals {
            self.add_local(l.properties.clone(), l.maximal_cost);
        }
    }

    /// Bitmask of the entries that `global`/`local` together fulfill.
    /// Global entries occupy the low bits, local entries follow.
    pub fn fulfillment_mask(&self, global: &GlobalProperties, local: &LocalProperties) -> u64 {
        let mut mask = 0u64;
        for (i, entry) in self.globals.iter().enumerate() {
            if global.satisfies(&entry.properties) {
                mask |= 1 << i;
            }
        }
        let base = self.globals.len();
        for (i, entry) in self.locals.iter().enumerate() {
            if local.satisfies(&entry.properties) {
                mask |= 1 << (base + i);
            }
        }
        mask
    }

    /// Summed savings of the entries selected by `mask`.
    pub fn savings_for_mask(&self, mask: u64) -> f64 {
        let mut total = 0.0;
        for (i, entry) in self.globals.iter().enumerate() {
            if mask & (1 << i) != 0 {
                total += entry.maximal_cost.weighted_total();
            }
        }
        let base = self.globals.len();
        for (i, entry) in self.locals.iter().enumerate() {
            if mask & (1 << (base + i)) != 0 {
                total += entry.maximal_cost.weighted_total();
            }
        }
        total
    }
}
