//! The arena-owned metaschema document tree.
//!
//! All nodes of a document live in one [`DocumentTree`] arena; a
//! [`TreeNode`] is a copyable `(tree, index)` handle. Node ids are assigned
//! in construction order, which the builder guarantees is document order, so
//! ordering handles by id orders them by document position. Parent links are
//! plain indices into the arena, never owning references.
//!
//! Recursive model definitions are closed with cycle nodes: a node carrying a
//! back-edge to an ancestor of the same name. A cycle node answers structural
//! queries (name, type, flags, children) through its referent but keeps its
//! own place in the tree and reports position 1.

use crate::atomic::AtomicValue;
use crate::error::ModelError;
use crate::name::Name;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// The structural kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Assembly,
    Field,
    Flag,
}

/// The universal contract for a navigable metaschema node.
///
/// The evaluator is written exclusively against this trait, so any bound
/// object graph can be queried by exposing itself through it. `'a` is the
/// lifetime of the underlying document storage.
pub trait ModelNode<'a>:
    std::fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord
{
    fn kind(&self) -> NodeKind;

    /// The instance name. `None` only for document nodes.
    fn name(&self) -> Option<Name>;

    /// The declared type name, when the node was built from a named
    /// definition.
    fn type_name(&self) -> Option<Name>;

    /// True when the node's declared type is `type_name` or derives from it.
    fn type_derives_from(&self, type_name: Name) -> bool;

    /// The atomic value of a field or flag. `None` for containers.
    fn value(&self) -> Option<AtomicValue>;

    /// The flag nodes, in insertion order.
    fn flags(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    fn flag(&self, name: Name) -> Option<Self>;

    /// The model children (assemblies and fields), in document order.
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    fn parent(&self) -> Option<Self>;

    /// 1-based position among same-named siblings. Cycle nodes report 1.
    fn position(&self) -> usize;

    /// True when this node is a back-edge closing a recursive model.
    fn is_cycle(&self) -> bool;

    /// The base URI, inherited from the nearest ancestor that declares one.
    fn base_uri(&self) -> Option<String>;

    /// The string value: a field or flag's lexical value, or for containers
    /// the concatenated values of all descendant fields in document order.
    fn string_value(&self) -> String;
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    name: Option<Name>,
    type_name: Option<Name>,
    // Declared type followed by the types it derives from, outermost last.
    type_ancestry: Vec<Name>,
    value: Option<AtomicValue>,
    parent: Option<usize>,
    flags: IndexMap<Name, usize>,
    model: IndexMap<Name, Vec<usize>>,
    position: usize,
    base_uri: Option<String>,
    cycle_of: Option<usize>,
}

impl NodeData {
    fn new(kind: NodeKind, name: Option<Name>, parent: Option<usize>) -> Self {
        NodeData {
            kind,
            name,
            type_name: None,
            type_ancestry: Vec::new(),
            value: None,
            parent,
            flags: IndexMap::new(),
            model: IndexMap::new(),
            position: 1,
            base_uri: None,
            cycle_of: None,
        }
    }
}

/// An arena holding every node of one document.
#[derive(Debug)]
pub struct DocumentTree {
    nodes: Vec<NodeData>,
}

impl DocumentTree {
    pub fn root(&self) -> TreeNode<'_> {
        TreeNode { tree: self, id: 0 }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A copyable handle to one node of a [`DocumentTree`].
#[derive(Debug, Clone, Copy)]
pub struct TreeNode<'a> {
    tree: &'a DocumentTree,
    id: usize,
}

impl<'a> TreeNode<'a> {
    fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.id]
    }

    /// The node structural queries delegate to: the referent for a cycle
    /// node, the node itself otherwise.
    fn referent(&self) -> &'a NodeData {
        match self.data().cycle_of {
            Some(target) => &self.tree.nodes[target],
            None => self.data(),
        }
    }

    fn at(&self, id: usize) -> TreeNode<'a> {
        TreeNode {
            tree: self.tree,
            id,
        }
    }

    fn collect_string_value(&self, out: &mut String) {
        match self.kind() {
            NodeKind::Field | NodeKind::Flag => {
                if let Some(value) = self.referent().value.as_ref() {
                    out.push_str(&value.to_string_value());
                }
            }
            NodeKind::Document | NodeKind::Assembly => {
                for child in self.children() {
                    if !child.is_cycle() {
                        child.collect_string_value(out);
                    }
                }
            }
        }
    }
}

impl<'a> ModelNode<'a> for TreeNode<'a> {
    fn kind(&self) -> NodeKind {
        self.referent().kind
    }

    fn name(&self) -> Option<Name> {
        self.referent().name
    }

    fn type_name(&self) -> Option<Name> {
        self.referent().type_name
    }

    fn type_derives_from(&self, type_name: Name) -> bool {
        self.referent().type_ancestry.contains(&type_name)
    }

    fn value(&self) -> Option<AtomicValue> {
        self.referent().value.clone()
    }

    fn flags(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let this = *self;
        Box::new(self.referent().flags.values().map(move |id| this.at(*id)))
    }

    fn flag(&self, name: Name) -> Option<Self> {
        self.referent().flags.get(&name).map(|id| self.at(*id))
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let this = *self;
        let mut ids: Vec<usize> = self
            .referent()
            .model
            .values()
            .flat_map(|group| group.iter().copied())
            .collect();
        ids.sort_unstable();
        Box::new(ids.into_iter().map(move |id| this.at(id)))
    }

    fn parent(&self) -> Option<Self> {
        self.data().parent.map(|id| self.at(id))
    }

    fn position(&self) -> usize {
        if self.data().cycle_of.is_some() {
            1
        } else {
            self.data().position
        }
    }

    fn is_cycle(&self) -> bool {
        self.data().cycle_of.is_some()
    }

    fn base_uri(&self) -> Option<String> {
        let mut current = Some(*self);
        while let Some(node) = current {
            if let Some(uri) = node.data().base_uri.as_ref() {
                return Some(uri.clone());
            }
            current = node.parent();
        }
        None
    }

    fn string_value(&self) -> String {
        let mut out = String::new();
        self.collect_string_value(&mut out);
        out
    }
}

impl PartialEq for TreeNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for TreeNode<'_> {}

impl Hash for TreeNode<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.tree as *const DocumentTree).hash(state);
        self.id.hash(state);
    }
}

impl PartialOrd for TreeNode<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeNode<'_> {
    // Ids are assigned in document order, so id order is document order
    // within one tree.
    fn cmp(&self, other: &Self) -> Ordering {
        (self.tree as *const DocumentTree as usize, self.id)
            .cmp(&(other.tree as *const DocumentTree as usize, other.id))
    }
}

/// Builds a [`DocumentTree`] depth-first, in document order.
///
/// Assemblies open a scope; fields and flags attach to the innermost open
/// scope. `back_reference` closes a recursive model against the nearest open
/// ancestor assembly of the given name.
pub struct DocumentTreeBuilder {
    nodes: Vec<NodeData>,
    open: Vec<usize>,
}

impl DocumentTreeBuilder {
    pub fn new() -> Self {
        DocumentTreeBuilder {
            nodes: vec![NodeData::new(NodeKind::Document, None, None)],
            open: Vec::new(),
        }
    }

    fn attach(&mut self, mut data: NodeData) -> usize {
        let id = self.nodes.len();
        let parent = data.parent.unwrap_or(0);
        if data.kind == NodeKind::Flag {
            let name = data.name.unwrap_or_else(|| Name::local_only(""));
            self.nodes[parent].flags.insert(name, id);
        } else {
            let name = data.name.unwrap_or_else(|| Name::local_only(""));
            let group = self.nodes[parent].model.entry(name).or_default();
            data.position = group.len() + 1;
            group.push(id);
        }
        self.nodes.push(data);
        id
    }

    fn current(&self) -> usize {
        self.open.last().copied().unwrap_or(0)
    }

    pub fn start_assembly(&mut self, name: Name) -> &mut Self {
        let data = NodeData::new(NodeKind::Assembly, Some(name), Some(self.current()));
        let id = self.attach(data);
        self.open.push(id);
        self
    }

    pub fn end_assembly(&mut self) -> Result<&mut Self, ModelError> {
        match self.open.pop() {
            Some(_) => Ok(self),
            None => Err(ModelError::NoOpenAssembly),
        }
    }

    pub fn field(&mut self, name: Name, value: AtomicValue) -> Result<&mut Self, ModelError> {
        if self.open.is_empty() {
            return Err(ModelError::NoOpenAssembly);
        }
        let mut data = NodeData::new(NodeKind::Field, Some(name), Some(self.current()));
        data.value = Some(value);
        self.attach(data);
        Ok(self)
    }

    pub fn flag(&mut self, name: Name, value: AtomicValue) -> Result<&mut Self, ModelError> {
        if self.open.is_empty() {
            return Err(ModelError::NoOpenAssembly);
        }
        let mut data = NodeData::new(NodeKind::Flag, Some(name), Some(self.current()));
        data.value = Some(value);
        self.attach(data);
        Ok(self)
    }

    /// Declares the type of the most recently added node. `ancestry` lists
    /// the types the declared type derives from; the declared type itself is
    /// always part of the recorded ancestry.
    pub fn with_type(&mut self, type_name: Name, ancestry: &[Name]) -> &mut Self {
        if let Some(data) = self.nodes.last_mut() {
            data.type_name = Some(type_name);
            data.type_ancestry = std::iter::once(type_name)
                .chain(ancestry.iter().copied())
                .collect();
        }
        self
    }

    /// Sets the base URI of the most recently added node.
    pub fn with_base_uri(&mut self, uri: &str) -> &mut Self {
        if let Some(data) = self.nodes.last_mut() {
            data.base_uri = Some(uri.to_string());
        }
        self
    }

    /// Closes a recursive model definition: adds a cycle node under the
    /// innermost open assembly, back-referencing the nearest open ancestor
    /// assembly named `name`.
    pub fn back_reference(&mut self, name: Name) -> Result<&mut Self, ModelError> {
        if self.open.is_empty() {
            return Err(ModelError::NoOpenAssembly);
        }
        let target = self
            .open
            .iter()
            .rev()
            .copied()
            .find(|id| self.nodes[*id].name == Some(name))
            .ok_or_else(|| ModelError::NoCycleTarget(name.to_string()))?;
        let mut data = NodeData::new(NodeKind::Assembly, Some(name), Some(self.current()));
        data.cycle_of = Some(target);
        self.attach(data);
        Ok(self)
    }

    pub fn build(self) -> Result<DocumentTree, ModelError> {
        if !self.open.is_empty() {
            return Err(ModelError::UnbalancedBuilder(self.open.len()));
        }
        let top_level: usize = self.nodes[0].model.values().map(|g| g.len()).sum();
        if top_level != 1 {
            return Err(ModelError::MissingRootAssembly);
        }
        Ok(DocumentTree { nodes: self.nodes })
    }
}

impl Default for DocumentTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// Test documents - publicly available for integration testing in downstream
// crates.
pub mod tests {
    use super::*;

    /// A small product catalog:
    ///
    /// ```text
    /// catalog [version="1.2", base-uri="https://example.com/catalog"]
    ///   vendor
    ///     name  "Initech"
    ///     rating 4
    ///   product [sku="A-100"]
    ///     name  "Widget"
    ///     price 25.00
    ///     released 2024-03-15
    ///   product [sku="B-200"]
    ///     name  "Gadget"
    ///     price 110.50
    ///     released 2025-01-02
    ///   part
    ///     name "Case"
    ///     part
    ///       name "Screw"
    ///       part (cycle -> outer part)
    /// ```
    pub fn sample_catalog() -> DocumentTree {
        use crate::datatype::DataType;
        let dec = |s: &str| AtomicValue::from_lexical(DataType::Decimal, s).unwrap();
        let date = |s: &str| AtomicValue::from_lexical(DataType::Date, s).unwrap();

        let mut b = DocumentTreeBuilder::new();
        b.start_assembly(Name::local_only("catalog"))
            .with_base_uri("https://example.com/catalog");
        b.flag(Name::local_only("version"), AtomicValue::from("1.2"))
            .unwrap();

        b.start_assembly(Name::local_only("vendor"));
        b.field(Name::local_only("name"), AtomicValue::from("Initech"))
            .unwrap();
        b.field(Name::local_only("rating"), AtomicValue::from(4)).unwrap();
        b.end_assembly().unwrap();

        b.start_assembly(Name::local_only("product"));
        b.flag(Name::local_only("sku"), AtomicValue::from("A-100"))
            .unwrap();
        b.field(Name::local_only("name"), AtomicValue::from("Widget"))
            .unwrap();
        b.field(Name::local_only("price"), dec("25.00")).unwrap();
        b.field(Name::local_only("released"), date("2024-03-15"))
            .unwrap();
        b.end_assembly().unwrap();

        b.start_assembly(Name::local_only("product"));
        b.flag(Name::local_only("sku"), AtomicValue::from("B-200"))
            .unwrap();
        b.field(Name::local_only("name"), AtomicValue::from("Gadget"))
            .unwrap();
        b.field(Name::local_only("price"), dec("110.50")).unwrap();
        b.field(Name::local_only("released"), date("2025-01-02"))
            .unwrap();
        b.end_assembly().unwrap();

        b.start_assembly(Name::local_only("part"));
        b.field(Name::local_only("name"), AtomicValue::from("Case"))
            .unwrap();
        b.start_assembly(Name::local_only("part"));
        b.field(Name::local_only("name"), AtomicValue::from("Screw"))
            .unwrap();
        b.back_reference(Name::local_only("part")).unwrap();
        b.end_assembly().unwrap();
        b.end_assembly().unwrap();

        b.end_assembly().unwrap();
        b.build().expect("sample catalog must build")
    }

    #[cfg(test)]
    mod unit {
        use super::*;

        #[test]
        fn test_root_owns_one_assembly() {
            let tree = sample_catalog();
            let root = tree.root();
            assert_eq!(root.kind(), NodeKind::Document);
            let children: Vec<_> = root.children().collect();
            assert_eq!(children.len(), 1);
            assert_eq!(children[0].name(), Some(Name::local_only("catalog")));
        }

        #[test]
        fn test_children_in_document_order() {
            let tree = sample_catalog();
            let catalog = tree.root().children().next().unwrap();
            let names: Vec<_> = catalog
                .children()
                .map(|c| c.name().unwrap().local())
                .collect();
            assert_eq!(names, ["vendor", "product", "product", "part"]);
        }

        #[test]
        fn test_positions_count_same_named_siblings() {
            let tree = sample_catalog();
            let catalog = tree.root().children().next().unwrap();
            let positions: Vec<_> = catalog
                .children()
                .filter(|c| c.name() == Some(Name::local_only("product")))
                .map(|c| c.position())
                .collect();
            assert_eq!(positions, [1, 2]);
        }

        #[test]
        fn test_flag_lookup() {
            let tree = sample_catalog();
            let catalog = tree.root().children().next().unwrap();
            let version = catalog.flag(Name::local_only("version")).unwrap();
            assert_eq!(version.kind(), NodeKind::Flag);
            assert_eq!(version.string_value(), "1.2");
            assert!(catalog.flag(Name::local_only("missing")).is_none());
        }

        #[test]
        fn test_cycle_delegates_structure() {
            let tree = sample_catalog();
            let catalog = tree.root().children().next().unwrap();
            let outer_part = catalog
                .children()
                .find(|c| c.name() == Some(Name::local_only("part")))
                .unwrap();
            let inner_part = outer_part
                .children()
                .find(|c| c.kind() == NodeKind::Assembly)
                .unwrap();
            let cycle = inner_part
                .children()
                .find(|c| c.is_cycle())
                .expect("inner part should hold a cycle node");
            assert_eq!(cycle.name(), Some(Name::local_only("part")));
            assert_eq!(cycle.position(), 1);
            // Structural queries resolve through the referent (the outer
            // part), while the cycle node keeps its own parent.
            let delegated: Vec<_> = cycle
                .children()
                .filter_map(|c| c.name())
                .map(|n| n.local())
                .collect();
            assert!(delegated.contains(&"name".to_string()));
            assert_eq!(cycle.parent(), Some(inner_part));
        }

        #[test]
        fn test_base_uri_inherits_from_ancestor() {
            let tree = sample_catalog();
            let catalog = tree.root().children().next().unwrap();
            let vendor = catalog.children().next().unwrap();
            let name = vendor.children().next().unwrap();
            assert_eq!(
                name.base_uri().as_deref(),
                Some("https://example.com/catalog")
            );
        }

        #[test]
        fn test_parent_of_root_is_empty() {
            let tree = sample_catalog();
            assert!(tree.root().parent().is_none());
        }

        #[test]
        fn test_build_rejects_unbalanced_scopes() {
            let mut b = DocumentTreeBuilder::new();
            b.start_assembly(Name::local_only("open"));
            assert!(matches!(
                b.build(),
                Err(ModelError::UnbalancedBuilder(1))
            ));
        }

        #[test]
        fn test_build_requires_single_root_assembly() {
            let b = DocumentTreeBuilder::new();
            assert!(matches!(b.build(), Err(ModelError::MissingRootAssembly)));
        }

        #[test]
        fn test_back_reference_requires_named_ancestor() {
            let mut b = DocumentTreeBuilder::new();
            b.start_assembly(Name::local_only("root"));
            let err = b.back_reference(Name::local_only("elsewhere"));
            assert!(matches!(err, Err(ModelError::NoCycleTarget(_))));
        }
    }
}
