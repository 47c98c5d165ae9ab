//! Local properties: order and grouping of tuples within one partition.

use riffle_core::fields::{FieldSet, KeyOrder};
use serde::{Deserialize, Serialize};

/// Delivered local properties of a channel or node output.
///
/// An ordering implies grouping on every key prefix; a grouping alone makes
/// no statement about order within or across groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalProperties {
    ordering: Option<KeyOrder>,
    grouped: Option<FieldSet>,
}

impl LocalProperties {
    /// No statement about per-partition order.
    pub fn none() -> Self {
        Self {
            ordering: None,
            grouped: None,
        }
    }

    pub fn ordered(order: KeyOrder) -> Self {
        let grouped = order.field_list().to_set();
        Self {
            ordering: Some(order),
            grouped: Some(grouped),
        }
    }

    pub fn grouped(fields: FieldSet) -> Self {
        Self {
            ordering: None,
            grouped: Some(fields),
        }
    }

    pub fn ordering(&self) -> Option<&KeyOrder> {
        self.ordering.as_ref()
    }

    pub fn is_trivial(&self) -> bool {
        self.ordering.is_none() && self.grouped.is_none()
    }

    /// Whether tuples with equal values in `fields` arrive contiguously.
    pub fn is_grouped_on(&self, fields: &FieldSet) -> bool {
        if let Some(order) = &self.ordering {
            if order.prefix_covers(fields) {
                return true;
            }
        }
        self.grouped.as_ref() == Some(fields)
    }

    /// Whether the data is sorted at least as specifically as `order`.
    pub fn is_ordered_on(&self, order: &KeyOrder) -> bool {
        match &self.ordering {
            Some(delivered) => delivered.starts_with(order),
            None => false,
        }
    }

    pub fn satisfies(&self, requested: &RequestedLocalProperties) -> bool {
        match requested {
            RequestedLocalProperties::Any => true,
            RequestedLocalProperties::GroupedOn(fields) => self.is_grouped_on(fields),
            RequestedLocalProperties::OrderedOn(order) => self.is_ordered_on(order),
        }
    }
}

/// Requested local properties: a constraint placed on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestedLocalProperties {
    Any,
    GroupedOn(FieldSet),
    OrderedOn(KeyOrder),
}

#[cfg(test)]
mod tests {
    use super::*;
    use riffle_core::fields::FieldList;

    fn set(fields: &[usize]) -> FieldSet {
        fields.iter().copied().collect()
    }

    fn asc(fields: &[usize]) -> KeyOrder {
        KeyOrder::ascending(&FieldList::from(fields))
    }

    #[test]
    fn ordering_implies_grouping_on_prefixes() {
        let delivered = LocalProperties::ordered(asc(&[1, 0, 2]));
        assert!(delivered.satisfies(&RequestedLocalProperties::GroupedOn(set(&[1]))));
        assert!(delivered.satisfies(&RequestedLocalProperties::GroupedOn(set(&[0, 1]))));
        assert!(!delivered.satisfies(&RequestedLocalProperties::GroupedOn(set(&[2]))));
    }

    #[test]
    fn grouping_satisfies_exact_set_only() {
        let delivered = LocalProperties::grouped(set(&[0, 1]));
        assert!(delivered.satisfies(&RequestedLocalProperties::GroupedOn(set(&[0, 1]))));
        assert!(!delivered.satisfies(&RequestedLocalProperties::GroupedOn(set(&[0]))));
        assert!(!delivered.satisfies(&RequestedLocalProperties::OrderedOn(asc(&[0, 1]))));
    }

    #[test]
    fn longer_ordering_satisfies_requested_prefix() {
        let delivered = LocalProperties::ordered(asc(&[3, 4, 5]));
        assert!(delivered.satisfies(&RequestedLocalProperties::OrderedOn(asc(&[3, 4]))));
        assert!(!delivered.satisfies(&RequestedLocalProperties::OrderedOn(asc(&[4]))));
        assert!(delivered.satisfies(&RequestedLocalProperties::Any));
    }
}
