//! Static and dynamic evaluation contexts.
//!
//! The static context fixes everything known at compile time: namespace
//! prefix bindings and the default function namespace. The dynamic context
//! carries the per-evaluation state: external variable bindings, the
//! current date-time, and the set of loadable documents.

use crate::error::MetapathError;
use crate::types::Sequence;
use metapath_model::{DateTime, Name};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Namespace of the core built-in function library.
pub const FN_NAMESPACE: &str = "http://csrc.nist.gov/ns/metapath/functions";
/// Namespace of the math function library.
pub const MATH_NAMESPACE: &str = "http://csrc.nist.gov/ns/metapath/functions/math";
/// Namespace of the map function library.
pub const MAP_NAMESPACE: &str = "http://csrc.nist.gov/ns/metapath/functions/map";
/// Namespace of the array function library.
pub const ARRAY_NAMESPACE: &str = "http://csrc.nist.gov/ns/metapath/functions/array";

#[derive(Debug, Clone)]
pub struct StaticContext {
    namespaces: HashMap<String, String>,
    default_function_namespace: String,
    default_element_namespace: String,
}

impl Default for StaticContext {
    fn default() -> Self {
        let mut namespaces = HashMap::new();
        namespaces.insert("fn".to_string(), FN_NAMESPACE.to_string());
        namespaces.insert("math".to_string(), MATH_NAMESPACE.to_string());
        namespaces.insert("map".to_string(), MAP_NAMESPACE.to_string());
        namespaces.insert("array".to_string(), ARRAY_NAMESPACE.to_string());
        StaticContext {
            namespaces,
            default_function_namespace: FN_NAMESPACE.to_string(),
            default_element_namespace: String::new(),
        }
    }
}

impl StaticContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix` to `uri`, replacing any previous binding.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn with_default_element_namespace(mut self, uri: impl Into<String>) -> Self {
        self.default_element_namespace = uri.into();
        self
    }

    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    /// Resolves a node name: an unprefixed name falls in the default
    /// element namespace.
    pub fn resolve_node_name(
        &self,
        prefix: Option<&str>,
        local: &str,
    ) -> Result<Name, MetapathError> {
        match prefix {
            None => Ok(Name::intern(&self.default_element_namespace, local)),
            Some(p) => self.resolve_prefixed(p, local),
        }
    }

    /// Resolves a function name: an unprefixed name falls in the default
    /// function namespace.
    pub fn resolve_function_name(
        &self,
        prefix: Option<&str>,
        local: &str,
    ) -> Result<Name, MetapathError> {
        match prefix {
            None => Ok(Name::intern(&self.default_function_namespace, local)),
            Some(p) => self.resolve_prefixed(p, local),
        }
    }

    /// Resolves a variable name: unprefixed variables have no namespace.
    pub fn resolve_variable_name(
        &self,
        prefix: Option<&str>,
        local: &str,
    ) -> Result<Name, MetapathError> {
        match prefix {
            None => Ok(Name::local_only(local)),
            Some(p) => self.resolve_prefixed(p, local),
        }
    }

    fn resolve_prefixed(&self, prefix: &str, local: &str) -> Result<Name, MetapathError> {
        match self.namespaces.get(prefix) {
            Some(uri) => Ok(Name::intern(uri, local)),
            None => Err(MetapathError::UnknownPrefix(prefix.to_string())),
        }
    }
}

/// Per-evaluation state. Cheap to clone; sharing the static context
/// through an [`Arc`].
#[derive(Debug, Clone)]
pub struct DynamicContext<N> {
    static_ctx: Arc<StaticContext>,
    variables: HashMap<Name, Sequence<N>>,
    documents: HashMap<String, N>,
    current_date_time: DateTime,
}

impl<N: Clone> DynamicContext<N> {
    pub fn new(static_ctx: Arc<StaticContext>) -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        DynamicContext {
            static_ctx,
            variables: HashMap::new(),
            documents: HashMap::new(),
            current_date_time: DateTime::from_epoch_seconds(epoch),
        }
    }

    pub fn static_context(&self) -> &StaticContext {
        &self.static_ctx
    }

    /// Binds an external variable visible to every expression evaluated
    /// under this context.
    pub fn bind_variable(&mut self, name: Name, value: Sequence<N>) {
        self.variables.insert(name, value);
    }

    pub fn variable(&self, name: Name) -> Option<&Sequence<N>> {
        self.variables.get(&name)
    }

    /// Registers a document root for retrieval by `doc()`.
    pub fn register_document(&mut self, uri: impl Into<String>, root: N) {
        self.documents.insert(uri.into(), root);
    }

    pub fn document(&self, uri: &str) -> Option<&N> {
        self.documents.get(uri)
    }

    pub fn current_date_time(&self) -> DateTime {
        self.current_date_time
    }

    /// Pins the clock; every `current-*` function reads this value, so one
    /// evaluation observes a single instant.
    pub fn with_current_date_time(mut self, value: DateTime) -> Self {
        self.current_date_time = value;
        self
    }
}

impl<N: Clone> Default for DynamicContext<N> {
    fn default() -> Self {
        Self::new(Arc::new(StaticContext::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metapath_model::TreeNode;

    #[test]
    fn test_default_prefixes() {
        let ctx = StaticContext::new();
        assert_eq!(ctx.namespace_for_prefix("math"), Some(MATH_NAMESPACE));
        assert_eq!(ctx.namespace_for_prefix("nope"), None);
        let name = ctx.resolve_function_name(None, "string-length").unwrap();
        assert_eq!(name.namespace(), FN_NAMESPACE);
        let err = ctx.resolve_function_name(Some("nope"), "f").unwrap_err();
        assert_eq!(err.code(), "XPST0081");
    }

    #[test]
    fn test_node_names_default_to_empty_namespace() {
        let ctx = StaticContext::new();
        let name = ctx.resolve_node_name(None, "product").unwrap();
        assert_eq!(name, Name::local_only("product"));
    }

    #[test]
    fn test_variable_binding() {
        let mut ctx: DynamicContext<TreeNode> = DynamicContext::default();
        let name = Name::local_only("limit");
        ctx.bind_variable(name, Sequence::from_integer(10));
        assert_eq!(ctx.variable(name), Some(&Sequence::from_integer(10)));
        assert_eq!(ctx.variable(Name::local_only("other")), None);
    }
}
