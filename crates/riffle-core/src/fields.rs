//! Field sets, field lists, and key orderings.
//!
//! The property algebra describes partitioning and ordering in terms of
//! record field indices. A [`FieldSet`] is an unordered collection (hash
//! partitioning does not care about key order), a [`FieldList`] is ordered
//! (range partitioning and sorting do), and a [`KeyOrder`] pairs each field
//! with a sort direction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unordered set of record field indices.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct FieldSet(BTreeSet<usize>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, field: usize) -> bool {
        self.0.contains(&field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<usize> for FieldSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<&FieldList> for FieldSet {
    fn from(list: &FieldList) -> Self {
        list.iter().collect()
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, "}}")
    }
}

/// Ordered list of record field indices (key order matters).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct FieldList(Vec<usize>);

impl FieldList {
    pub fn new(fields: Vec<usize>) -> Self {
        Self(fields)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn to_set(&self) -> FieldSet {
        self.into()
    }
}

impl From<Vec<usize>> for FieldList {
    fn from(v: Vec<usize>) -> Self {
        Self(v)
    }
}

impl From<&[usize]> for FieldList {
    fn from(v: &[usize]) -> Self {
        Self(v.to_vec())
    }
}

/// Sort direction of one ordered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A sequence of (field, direction) pairs describing a sort order.
///
/// Ordering on a key prefix implies grouping on that prefix, which is what
/// [`prefix_covers`](KeyOrder::prefix_covers) checks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct KeyOrder(Vec<(usize, Direction)>);

impl KeyOrder {
    pub fn new(fields: Vec<(usize, Direction)>) -> Self {
        Self(fields)
    }

    /// Ascending order over the given key fields, in list order.
    pub fn ascending(keys: &FieldList) -> Self {
        Self(keys.iter().map(|f| (f, Direction::Ascending)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Direction)> + '_ {
        self.0.iter().copied()
    }

    pub fn field_list(&self) -> FieldList {
        FieldList::new(self.0.iter().map(|(f, _)| *f).collect())
    }

    /// True when `fields` is exactly the set of this order's first
    /// `fields.len()` fields. An order on such a prefix groups equal keys
    /// of `fields` contiguously.
    pub fn prefix_covers(&self, fields: &FieldSet) -> bool {
        if fields.is_empty() || fields.len() > self.0.len() {
            return false;
        }
        let prefix: FieldSet = self.0[..fields.len()].iter().map(|(f, _)| *f).collect();
        prefix == *fields
    }

    /// True when `prefix` matches this order field-for-field and
    /// direction-for-direction at the front.
    pub fn starts_with(&self, prefix: &KeyOrder) -> bool {
        prefix.0.len() <= self.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(fields: &[usize]) -> KeyOrder {
        KeyOrder::ascending(&FieldList::from(fields))
    }

    #[test]
    fn prefix_covers_exact_and_partial() {
        let o = order(&[2, 0, 1]);
        assert!(o.prefix_covers(&[2].iter().copied().collect()));
        assert!(o.prefix_covers(&[0, 2].iter().copied().collect()));
        assert!(o.prefix_covers(&[0, 1, 2].iter().copied().collect()));
        assert!(!o.prefix_covers(&[0].iter().copied().collect()));
        assert!(!o.prefix_covers(&[0, 1].iter().copied().collect()));
        assert!(!o.prefix_covers(&FieldSet::new()));
    }

    #[test]
    fn starts_with_respects_direction() {
        let long = KeyOrder::new(vec![
            (0, Direction::Ascending),
            (1, Direction::Descending),
        ]);
        assert!(long.starts_with(&KeyOrder::new(vec![(0, Direction::Ascending)])));
        assert!(!long.starts_with(&KeyOrder::new(vec![(0, Direction::Descending)])));
        assert!(long.starts_with(&long.clone()));
        assert!(!order(&[0]).starts_with(&order(&[0, 1])));
    }
}
