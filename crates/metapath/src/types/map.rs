//! The map item: atomic keys to arbitrary sequences, insertion-ordered.

use crate::types::{Item, Sequence};
use indexmap::IndexMap;
use metapath_model::AtomicValue;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Default)]
pub struct MapValue<N> {
    entries: IndexMap<AtomicValue, Sequence<N>>,
}

impl<N: Clone> MapValue<N> {
    pub fn new() -> Self {
        MapValue {
            entries: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, key: AtomicValue, value: Sequence<N>) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &AtomicValue) -> Option<&Sequence<N>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &AtomicValue) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&self, key: &AtomicValue) -> MapValue<N> {
        let mut entries = self.entries.clone();
        entries.shift_remove(key);
        MapValue { entries }
    }

    /// A copy with `key` bound to `value`.
    pub fn put(&self, key: AtomicValue, value: Sequence<N>) -> MapValue<N> {
        let mut entries = self.entries.clone();
        entries.insert(key, value);
        MapValue { entries }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &AtomicValue> {
        self.entries.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&AtomicValue, &Sequence<N>)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Sequence<N>> {
        self.entries.values()
    }
}

impl<N: PartialEq + Clone> PartialEq for MapValue<N> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.entries.get(k) == Some(v))
    }
}

impl<N: Eq + Clone> Eq for MapValue<N> {}

impl<N: Hash + Clone> Hash for MapValue<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.len().hash(state);
        for (k, v) in &self.entries {
            k.hash(state);
            for item in v.items() {
                item.hash(state);
            }
        }
    }
}

impl<N: Clone + std::fmt::Debug> fmt::Display for MapValue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map{{")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}

impl<N: Clone> FromIterator<(AtomicValue, Sequence<N>)> for MapValue<N> {
    fn from_iter<T: IntoIterator<Item = (AtomicValue, Sequence<N>)>>(iter: T) -> Self {
        MapValue {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metapath_model::TreeNode;

    fn string_key(s: &str) -> AtomicValue {
        AtomicValue::String(s.to_string())
    }

    #[test]
    fn test_put_is_persistent() {
        let empty: MapValue<TreeNode> = MapValue::new();
        let one = empty.put(string_key("a"), Sequence::from_integer(1));
        assert_eq!(empty.size(), 0);
        assert_eq!(one.size(), 1);
        assert_eq!(
            one.get(&string_key("a")),
            Some(&Sequence::from_integer(1))
        );
    }

    #[test]
    fn test_keys_keep_insertion_order() {
        let m: MapValue<TreeNode> = [
            (string_key("b"), Sequence::from_integer(2)),
            (string_key("a"), Sequence::from_integer(1)),
        ]
        .into_iter()
        .collect();
        let keys: Vec<_> = m.keys().map(|k| k.to_string_value()).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_numeric_keys_unify_across_types() {
        let m: MapValue<TreeNode> = [(AtomicValue::Integer(1), Sequence::from_string("one"))]
            .into_iter()
            .collect();
        // integer 1 and decimal 1.0 are the same key
        assert!(m.contains(&AtomicValue::Decimal(rust_decimal::Decimal::from(1))));
    }
}
