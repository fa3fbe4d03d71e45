//! Axis collectors over any [`ModelNode`] implementation.
//!
//! Forward axes (`child`, `descendant`, `following-sibling`, `following`)
//! yield nodes in document order; `ancestor` and `preceding` yield reverse
//! document order. `preceding-sibling` is internally in document order so
//! that the two sibling axes partition the sibling set cleanly.
//!
//! Cycle nodes are included wherever an axis reaches them but are never
//! re-expanded: recursion into a subtree stops at a back-edge, which keeps
//! every traversal finite on recursive models.

use crate::node::ModelNode;

pub fn collect_self<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    vec![node]
}

pub fn collect_children<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    node.children().collect()
}

pub fn collect_flags<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    node.flags().collect()
}

fn push_descendants<'a, N: ModelNode<'a>>(node: N, out: &mut Vec<N>) {
    for child in node.children() {
        out.push(child);
        if !child.is_cycle() {
            push_descendants(child, out);
        }
    }
}

pub fn collect_descendants<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    let mut out = Vec::new();
    push_descendants(node, &mut out);
    out
}

pub fn collect_descendants_or_self<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    let mut out = vec![node];
    push_descendants(node, &mut out);
    out
}

pub fn collect_parent<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    node.parent().into_iter().collect()
}

/// Nearest ancestor first (reverse document order).
pub fn collect_ancestors<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    let mut out = Vec::new();
    let mut current = node.parent();
    while let Some(ancestor) = current {
        out.push(ancestor);
        current = ancestor.parent();
    }
    out
}

pub fn collect_ancestors_or_self<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    let mut out = vec![node];
    out.extend(collect_ancestors(node));
    out
}

pub fn collect_following_siblings<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    match node.parent() {
        Some(parent) => parent
            .children()
            .skip_while(|sibling| *sibling != node)
            .skip(1)
            .collect(),
        None => Vec::new(),
    }
}

/// Siblings before the node, internally in document order.
pub fn collect_preceding_siblings<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    match node.parent() {
        Some(parent) => parent
            .children()
            .take_while(|sibling| *sibling != node)
            .collect(),
        None => Vec::new(),
    }
}

/// Everything after the node in document order, excluding its own
/// descendants: each following sibling's subtree exhaustively, then the
/// parent's following siblings, up to the root.
pub fn collect_following<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    let mut out = Vec::new();
    let mut current = node;
    loop {
        for sibling in collect_following_siblings(current) {
            out.push(sibling);
            if !sibling.is_cycle() {
                push_descendants(sibling, &mut out);
            }
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    out
}

/// Everything before the node in reverse document order, excluding its
/// ancestors: each preceding sibling's subtree from its last descendant
/// back to the sibling itself, then outward.
pub fn collect_preceding<'a, N: ModelNode<'a>>(node: N) -> Vec<N> {
    let mut out = Vec::new();
    let mut current = node;
    loop {
        for sibling in collect_preceding_siblings(current).into_iter().rev() {
            if sibling.is_cycle() {
                out.push(sibling);
            } else {
                let mut subtree = collect_descendants_or_self(sibling);
                subtree.reverse();
                out.extend(subtree);
            }
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    out
}

/// The document root the node belongs to.
pub fn document_root<'a, N: ModelNode<'a>>(node: N) -> N {
    let mut current = node;
    while let Some(parent) = current.parent() {
        current = parent;
    }
    current
}
