//! The runtime item and sequence model.
//!
//! A [`Sequence`] is the universal evaluation result: ordered, possibly
//! empty, materialized. A single item is a sequence of length one.

use crate::error::MetapathError;
use crate::types::{ArrayValue, FunctionValue, MapValue};
use metapath_model::{AtomicValue, ModelNode};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub enum Item<N> {
    Node(N),
    Atomic(AtomicValue),
    Map(MapValue<N>),
    Array(ArrayValue<N>),
    Function(FunctionValue<N>),
}

impl<N: Clone> Item<N> {
    pub fn is_node(&self) -> bool {
        matches!(self, Item::Node(_))
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Item::Atomic(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Item::Map(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Item::Array(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Item::Function(_))
    }

    pub fn as_node(&self) -> Option<&N> {
        match self {
            Item::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_atomic(&self) -> Option<&AtomicValue> {
        match self {
            Item::Atomic(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue<N>> {
        match self {
            Item::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue<N>> {
        match self {
            Item::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionValue<N>> {
        match self {
            Item::Function(f) => Some(f),
            _ => None,
        }
    }
}

impl<'a, N: ModelNode<'a>> Item<N> {
    pub fn string_value(&self) -> String {
        match self {
            Item::Node(n) => n.string_value(),
            Item::Atomic(a) => a.to_string_value(),
            Item::Map(m) => m.to_string(),
            Item::Array(a) => a.to_string(),
            Item::Function(f) => format!("{:?}", f),
        }
    }

    /// The typed atomic value of this item, or an error for items with no
    /// atomization (maps and bare functions).
    pub fn atomize(&self, out: &mut Vec<AtomicValue>) -> Result<(), MetapathError> {
        match self {
            Item::Atomic(a) => out.push(a.clone()),
            Item::Node(n) => match n.value() {
                Some(value) => out.push(value),
                None => out.push(AtomicValue::Untyped(n.string_value())),
            },
            Item::Array(a) => {
                for member in a.members() {
                    for item in member.items() {
                        item.atomize(out)?;
                    }
                }
            }
            Item::Map(_) | Item::Function(_) => {
                return Err(MetapathError::type_error(format!(
                    "{} has no typed value",
                    crate::types::ItemType::of_item(self)
                )));
            }
        }
        Ok(())
    }

    pub fn type_signature(&self) -> String {
        crate::types::ItemType::of_item(self).to_string()
    }
}

impl<N: PartialEq + Clone> PartialEq for Item<N> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Item::Node(a), Item::Node(b)) => a == b,
            (Item::Atomic(a), Item::Atomic(b)) => a == b,
            (Item::Map(a), Item::Map(b)) => a == b,
            (Item::Array(a), Item::Array(b)) => a == b,
            (Item::Function(a), Item::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl<N: Eq + Clone> Eq for Item<N> {}

impl<N: Hash + Clone> Hash for Item<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Item::Node(n) => n.hash(state),
            Item::Atomic(a) => a.hash(state),
            Item::Map(m) => m.hash(state),
            Item::Array(a) => a.hash(state),
            Item::Function(f) => f.hash(state),
        }
    }
}

/// An ordered sequence of items.
#[derive(Debug, Clone)]
pub struct Sequence<N> {
    items: Vec<Item<N>>,
}

impl<N: PartialEq + Clone> PartialEq for Sequence<N> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<N: Clone> Sequence<N> {
    pub fn empty() -> Self {
        Sequence { items: Vec::new() }
    }

    pub fn from_item(item: Item<N>) -> Self {
        Sequence { items: vec![item] }
    }

    pub fn from_items(items: Vec<Item<N>>) -> Self {
        Sequence { items }
    }

    pub fn from_atomic(value: AtomicValue) -> Self {
        Self::from_item(Item::Atomic(value))
    }

    pub fn from_bool(b: bool) -> Self {
        Self::from_atomic(AtomicValue::Boolean(b))
    }

    pub fn from_integer(i: i64) -> Self {
        Self::from_atomic(AtomicValue::Integer(i))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self::from_atomic(AtomicValue::String(s.into()))
    }

    pub fn from_node(node: N) -> Self {
        Self::from_item(Item::Node(node))
    }

    pub fn from_nodes(nodes: Vec<N>) -> Self {
        Sequence {
            items: nodes.into_iter().map(Item::Node).collect(),
        }
    }

    pub fn items(&self) -> &[Item<N>] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Item<N>> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&Item<N>> {
        self.items.first()
    }

    /// The single item of a singleton sequence.
    pub fn singleton(&self) -> Result<&Item<N>, MetapathError> {
        match self.items.as_slice() {
            [item] => Ok(item),
            _ => Err(MetapathError::Cardinality {
                expected: "exactly one item".to_string(),
                actual: self.items.len(),
            }),
        }
    }
}

impl<'a, N: ModelNode<'a>> Sequence<N> {
    /// The effective boolean value: empty is false, a sequence starting
    /// with a node is true, a singleton atomic is its own truth value.
    pub fn effective_boolean_value(&self) -> Result<bool, MetapathError> {
        match self.items.as_slice() {
            [] => Ok(false),
            [Item::Node(_), ..] => Ok(true),
            [Item::Atomic(a)] => Ok(a.to_boolean()),
            _ => Err(MetapathError::type_error(
                "sequence has no effective boolean value",
            )),
        }
    }

    pub fn string_value(&self) -> String {
        self.items
            .iter()
            .map(|item| item.string_value())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Atomizes every item, flattening arrays.
    pub fn atomize(&self) -> Result<Vec<AtomicValue>, MetapathError> {
        let mut out = Vec::with_capacity(self.items.len());
        for item in &self.items {
            item.atomize(&mut out)?;
        }
        Ok(out)
    }

    /// The atomic value of a singleton sequence, or `None` when empty.
    pub fn atomized_singleton(&self) -> Result<Option<AtomicValue>, MetapathError> {
        let values = self.atomize()?;
        match values.len() {
            0 => Ok(None),
            1 => Ok(values.into_iter().next()),
            n => Err(MetapathError::Cardinality {
                expected: "at most one atomic value".to_string(),
                actual: n,
            }),
        }
    }
}

impl<N: Clone> From<Vec<Item<N>>> for Sequence<N> {
    fn from(items: Vec<Item<N>>) -> Self {
        Sequence { items }
    }
}

impl<N: Clone> FromIterator<Item<N>> for Sequence<N> {
    fn from_iter<T: IntoIterator<Item = Item<N>>>(iter: T) -> Self {
        Sequence {
            items: iter.into_iter().collect(),
        }
    }
}

impl<N: Clone + fmt::Debug> fmt::Display for Sequence<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} items)", self.items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metapath_model::TreeNode;
    use metapath_model::node::tests::sample_catalog;

    #[test]
    fn test_effective_boolean_value() {
        let empty: Sequence<TreeNode> = Sequence::empty();
        assert!(!empty.effective_boolean_value().unwrap());
        assert!(Sequence::<TreeNode>::from_bool(true)
            .effective_boolean_value()
            .unwrap());
        assert!(!Sequence::<TreeNode>::from_string("")
            .effective_boolean_value()
            .unwrap());
        let multi: Sequence<TreeNode> = Sequence::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Integer(2)),
        ]);
        assert!(multi.effective_boolean_value().is_err());
    }

    #[test]
    fn test_node_sequence_is_true() {
        let tree = sample_catalog();
        let seq = Sequence::from_node(tree.root());
        assert!(seq.effective_boolean_value().unwrap());
    }

    #[test]
    fn test_atomize_typed_nodes() {
        let tree = sample_catalog();
        let rating = metapath_model::axes::collect_descendants(tree.root())
            .into_iter()
            .find(|n| n.name() == Some(metapath_model::Name::local_only("rating")))
            .unwrap();
        let values = Sequence::from_node(rating).atomize().unwrap();
        assert_eq!(values, vec![AtomicValue::Integer(4)]);
    }

    #[test]
    fn test_atomize_container_yields_untyped() {
        let tree = sample_catalog();
        let catalog = tree.root().children().next().unwrap();
        let vendor = catalog.children().next().unwrap();
        let values = Sequence::from_node(vendor).atomize().unwrap();
        assert_eq!(
            values,
            vec![AtomicValue::Untyped("Initech4".to_string())]
        );
    }
}
