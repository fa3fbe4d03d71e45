//! The closed lattice of item and sequence types.
//!
//! Every concrete item has exactly one most-specific type reachable from
//! `item()` (see [`ItemType::of_item`]); `matches` walks the derivation
//! relationship, so an integer item matches a `decimal` test and a node
//! declared with a derived type matches a test on its base type.

use crate::types::{Item, Sequence};
use metapath_model::{DataType, ModelNode, Name, NodeKind};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum KindTest {
    AnyNode,
    Document,
    Assembly {
        name: Option<Name>,
        type_name: Option<Name>,
    },
    Field {
        name: Option<Name>,
        type_name: Option<Name>,
    },
    Flag {
        name: Option<Name>,
        type_name: Option<Name>,
    },
}

impl KindTest {
    pub fn matches<'a, N: ModelNode<'a>>(&self, node: &N) -> bool {
        match self {
            KindTest::AnyNode => true,
            KindTest::Document => node.kind() == NodeKind::Document,
            KindTest::Assembly { name, type_name } => {
                node.kind() == NodeKind::Assembly && filters_match(node, name, type_name)
            }
            KindTest::Field { name, type_name } => {
                node.kind() == NodeKind::Field && filters_match(node, name, type_name)
            }
            KindTest::Flag { name, type_name } => {
                node.kind() == NodeKind::Flag && filters_match(node, name, type_name)
            }
        }
    }
}

fn filters_match<'a, N: ModelNode<'a>>(
    node: &N,
    name: &Option<Name>,
    type_name: &Option<Name>,
) -> bool {
    if let Some(expected) = name
        && node.name() != Some(*expected)
    {
        return false;
    }
    match type_name {
        None => true,
        Some(tn) => {
            if node.type_derives_from(*tn) {
                return true;
            }
            // A test on a built-in data type also matches through the
            // value's type derivation.
            match (DataType::lookup(&tn.local()), node.value()) {
                (Some(dt), Some(value)) => value.data_type().derives_from(dt),
                _ => false,
            }
        }
    }
}

impl fmt::Display for KindTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn args(
            f: &mut fmt::Formatter<'_>,
            kw: &str,
            name: &Option<Name>,
            type_name: &Option<Name>,
        ) -> fmt::Result {
            write!(f, "{}(", kw)?;
            match (name, type_name) {
                (None, None) => {}
                (Some(n), None) => write!(f, "{}", n)?,
                (None, Some(t)) => write!(f, "*, {}", t)?,
                (Some(n), Some(t)) => write!(f, "{}, {}", n, t)?,
            }
            write!(f, ")")
        }
        match self {
            KindTest::AnyNode => write!(f, "node()"),
            KindTest::Document => write!(f, "document-node()"),
            KindTest::Assembly { name, type_name } => args(f, "assembly", name, type_name),
            KindTest::Field { name, type_name } => args(f, "field", name, type_name),
            KindTest::Flag { name, type_name } => args(f, "flag", name, type_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemType {
    AnyItem,
    AnyAtomic,
    Atomic(DataType),
    Kind(KindTest),
    AnyFunction,
    AnyMap,
    AnyArray,
    Map {
        key: DataType,
        value: Box<SequenceType>,
    },
    Array(Box<SequenceType>),
    Function {
        params: Vec<SequenceType>,
        result: Box<SequenceType>,
    },
}

impl ItemType {
    pub fn matches<'a, N: ModelNode<'a>>(&self, item: &Item<N>) -> bool {
        match self {
            ItemType::AnyItem => true,
            ItemType::AnyAtomic => item.is_atomic(),
            ItemType::Atomic(dt) => item
                .as_atomic()
                .is_some_and(|a| a.data_type().derives_from(*dt)),
            ItemType::Kind(kt) => item.as_node().is_some_and(|n| kt.matches(n)),
            ItemType::AnyFunction => item.is_function() || item.is_map() || item.is_array(),
            ItemType::AnyMap => item.is_map(),
            ItemType::AnyArray => item.is_array(),
            ItemType::Map { key, value } => item.as_map().is_some_and(|m| {
                m.entries().all(|(k, v)| {
                    k.data_type().derives_from(*key) && value.matches(v)
                })
            }),
            ItemType::Array(member) => item
                .as_array()
                .is_some_and(|a| a.members().iter().all(|m| member.matches(m))),
            ItemType::Function { params, .. } => item
                .as_function()
                .is_some_and(|func| func.arity() == params.len()),
        }
    }

    /// The most specific type of a concrete item.
    pub fn of_item<'a, N: ModelNode<'a>>(item: &Item<N>) -> ItemType {
        match item {
            Item::Atomic(a) => ItemType::Atomic(a.data_type()),
            Item::Node(n) => ItemType::Kind(match n.kind() {
                NodeKind::Document => KindTest::Document,
                NodeKind::Assembly => KindTest::Assembly {
                    name: n.name(),
                    type_name: n.type_name(),
                },
                NodeKind::Field => KindTest::Field {
                    name: n.name(),
                    type_name: n.type_name(),
                },
                NodeKind::Flag => KindTest::Flag {
                    name: n.name(),
                    type_name: n.type_name(),
                },
            }),
            Item::Map(_) => ItemType::AnyMap,
            Item::Array(_) => ItemType::AnyArray,
            Item::Function(_) => ItemType::AnyFunction,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::AnyItem => write!(f, "item()"),
            ItemType::AnyAtomic => write!(f, "atomic()"),
            ItemType::Atomic(dt) => write!(f, "{}", dt),
            ItemType::Kind(kt) => write!(f, "{}", kt),
            ItemType::AnyFunction => write!(f, "function(*)"),
            ItemType::AnyMap => write!(f, "map(*)"),
            ItemType::AnyArray => write!(f, "array(*)"),
            ItemType::Map { key, value } => write!(f, "map({}, {})", key, value),
            ItemType::Array(member) => write!(f, "array({})", member),
            ItemType::Function { params, result } => {
                write!(f, "function(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") as {}", result)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    ExactlyOne,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Occurrence {
    fn admits(&self, len: usize) -> bool {
        match self {
            Occurrence::ExactlyOne => len == 1,
            Occurrence::ZeroOrOne => len <= 1,
            Occurrence::ZeroOrMore => true,
            Occurrence::OneOrMore => len >= 1,
        }
    }

    pub fn indicator(&self) -> &'static str {
        match self {
            Occurrence::ExactlyOne => "",
            Occurrence::ZeroOrOne => "?",
            Occurrence::ZeroOrMore => "*",
            Occurrence::OneOrMore => "+",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceType {
    Empty,
    Typed {
        item_type: ItemType,
        occurrence: Occurrence,
    },
}

impl SequenceType {
    pub fn one(item_type: ItemType) -> Self {
        SequenceType::Typed {
            item_type,
            occurrence: Occurrence::ExactlyOne,
        }
    }

    pub fn zero_or_more(item_type: ItemType) -> Self {
        SequenceType::Typed {
            item_type,
            occurrence: Occurrence::ZeroOrMore,
        }
    }

    pub fn matches<'a, N: ModelNode<'a>>(&self, sequence: &Sequence<N>) -> bool {
        match self {
            SequenceType::Empty => sequence.is_empty(),
            SequenceType::Typed {
                item_type,
                occurrence,
            } => {
                occurrence.admits(sequence.len())
                    && sequence.items().iter().all(|item| item_type.matches(item))
            }
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceType::Empty => write!(f, "empty-sequence()"),
            SequenceType::Typed {
                item_type,
                occurrence,
            } => write!(f, "{}{}", item_type, occurrence.indicator()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metapath_model::node::tests::sample_catalog;
    use metapath_model::AtomicValue;
    use metapath_model::axes::collect_descendants;

    type TestItem<'a> = Item<metapath_model::TreeNode<'a>>;

    #[test]
    fn test_atomic_matching_follows_derivation() {
        let item: TestItem = Item::Atomic(AtomicValue::Integer(5));
        assert!(ItemType::Atomic(DataType::Integer).matches(&item));
        assert!(ItemType::Atomic(DataType::Decimal).matches(&item));
        assert!(!ItemType::Atomic(DataType::String).matches(&item));
        assert!(ItemType::AnyAtomic.matches(&item));
        assert!(ItemType::AnyItem.matches(&item));
    }

    #[test]
    fn test_kind_test_name_filter() {
        let tree = sample_catalog();
        let catalog = tree.root().children().next().unwrap();
        let test = KindTest::Assembly {
            name: Some(Name::local_only("catalog")),
            type_name: None,
        };
        assert!(test.matches(&catalog));
        let other = KindTest::Assembly {
            name: Some(Name::local_only("product")),
            type_name: None,
        };
        assert!(!other.matches(&catalog));
        assert!(KindTest::Document.matches(&tree.root()));
    }

    #[test]
    fn test_kind_test_value_type_filter() {
        let tree = sample_catalog();
        let price = collect_descendants(tree.root())
            .into_iter()
            .find(|n| n.name() == Some(Name::local_only("price")))
            .unwrap();
        let test = KindTest::Field {
            name: None,
            type_name: Some(Name::local_only("decimal")),
        };
        assert!(test.matches(&price));
        let wrong = KindTest::Field {
            name: None,
            type_name: Some(Name::local_only("date")),
        };
        assert!(!wrong.matches(&price));
    }

    #[test]
    fn test_sequence_type_occurrence() {
        let one: Sequence<metapath_model::TreeNode> =
            Sequence::from_item(Item::Atomic(AtomicValue::Integer(1)));
        let empty: Sequence<metapath_model::TreeNode> = Sequence::empty();
        let st = SequenceType::one(ItemType::Atomic(DataType::Integer));
        assert!(st.matches(&one));
        assert!(!st.matches(&empty));
        assert!(SequenceType::Empty.matches(&empty));
        assert!(!SequenceType::Empty.matches(&one));
        assert!(SequenceType::zero_or_more(ItemType::AnyItem).matches(&empty));
    }

    #[test]
    fn test_signatures_render() {
        assert_eq!(
            SequenceType::zero_or_more(ItemType::Atomic(DataType::String)).to_string(),
            "string*"
        );
        let kt = KindTest::Assembly {
            name: Some(Name::local_only("part")),
            type_name: None,
        };
        assert_eq!(kt.to_string(), "assembly(part)");
        assert_eq!(
            ItemType::Array(Box::new(SequenceType::zero_or_more(ItemType::Atomic(
                DataType::String
            ))))
            .to_string(),
            "array(string*)"
        );
    }
}
