//! Process-wide interning of qualified names.
//!
//! Every `(namespace, local-name)` pair is assigned a small integer identity
//! on first use; all later comparisons and hashing go through that integer.
//! Namespaces are interned separately and indexed from 0.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// An interned namespace URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(u32);

/// An interned qualified name. Equality and hashing compare the integer
/// identity, never the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

#[derive(Default)]
struct InternTable {
    namespaces: Vec<String>,
    namespace_index: HashMap<String, NamespaceId>,
    names: Vec<(NamespaceId, String)>,
    name_index: HashMap<(NamespaceId, String), Name>,
}

static TABLE: Lazy<RwLock<InternTable>> = Lazy::new(|| RwLock::new(InternTable::default()));

impl NamespaceId {
    pub fn intern(uri: &str) -> Self {
        if let Some(id) = TABLE
            .read()
            .expect("name intern table poisoned")
            .namespace_index
            .get(uri)
        {
            return *id;
        }
        let mut table = TABLE.write().expect("name intern table poisoned");
        if let Some(id) = table.namespace_index.get(uri) {
            return *id;
        }
        let id = NamespaceId(table.namespaces.len() as u32);
        table.namespaces.push(uri.to_string());
        table.namespace_index.insert(uri.to_string(), id);
        id
    }

    pub fn uri(&self) -> String {
        TABLE.read().expect("name intern table poisoned").namespaces[self.0 as usize].clone()
    }
}

impl Name {
    pub fn intern(namespace: &str, local: &str) -> Self {
        let ns = NamespaceId::intern(namespace);
        Self::intern_in(ns, local)
    }

    pub fn intern_in(ns: NamespaceId, local: &str) -> Self {
        {
            let table = TABLE.read().expect("name intern table poisoned");
            if let Some(name) = table.name_index.get(&(ns, local.to_string())) {
                return *name;
            }
        }
        let mut table = TABLE.write().expect("name intern table poisoned");
        if let Some(name) = table.name_index.get(&(ns, local.to_string())) {
            return *name;
        }
        let name = Name(table.names.len() as u32);
        table.names.push((ns, local.to_string()));
        table.name_index.insert((ns, local.to_string()), name);
        name
    }

    /// Interns a name in the empty namespace.
    pub fn local_only(local: &str) -> Self {
        Self::intern("", local)
    }

    pub fn namespace_id(&self) -> NamespaceId {
        TABLE.read().expect("name intern table poisoned").names[self.0 as usize].0
    }

    pub fn namespace(&self) -> String {
        self.namespace_id().uri()
    }

    pub fn local(&self) -> String {
        TABLE.read().expect("name intern table poisoned").names[self.0 as usize]
            .1
            .clone()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.namespace();
        if ns.is_empty() {
            write!(f, "{}", self.local())
        } else {
            write!(f, "Q{{{}}}{}", ns, self.local())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let a = Name::intern("http://example.com/ns", "field");
        let b = Name::intern("http://example.com/ns", "field");
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_namespaces_distinct_names() {
        let a = Name::intern("http://example.com/a", "item");
        let b = Name::intern("http://example.com/b", "item");
        assert_ne!(a, b);
        assert_eq!(a.local(), b.local());
    }

    #[test]
    fn test_display_renders_clark_notation() {
        let name = Name::intern("http://example.com/ns", "part");
        assert_eq!(name.to_string(), "Q{http://example.com/ns}part");
        let bare = Name::local_only("part");
        assert_eq!(bare.to_string(), "part");
    }

    #[test]
    fn test_concurrent_first_intern() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| Name::intern("http://example.com/race", "x")))
            .collect();
        let names: Vec<Name> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(names.windows(2).all(|w| w[0] == w[1]));
    }
}
