//! Function items: built-ins, inline closures, named references, and
//! partial applications produced by `?` placeholders.

use crate::ast::{Expr, Param};
use crate::types::Sequence;
use metapath_model::Name;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Clone)]
pub enum FunctionValue<N> {
    /// A function from the built-in library, identified by its expanded name.
    Builtin { name: Name, arity: usize },
    /// An inline function expression together with the variable bindings it
    /// captured at the point of construction.
    ///
    /// Only variable bindings are captured; the dynamic context is the one
    /// supplied at invocation, so a closure invoked under a different
    /// [`DynamicContext`](crate::DynamicContext) sees that context's
    /// documents and clock.
    Inline {
        params: Vec<Param>,
        body: Arc<Expr>,
        captured: Vec<(Name, Sequence<N>)>,
    },
    /// A `name#arity` reference, resolved against the function library at
    /// call time.
    NamedRef { name: Name, arity: usize },
    /// A call with `?` placeholders; `bound_args` holds `Some` for the
    /// arguments fixed at construction and `None` for each placeholder.
    Partial {
        base: Box<FunctionValue<N>>,
        bound_args: Vec<Option<Sequence<N>>>,
    },
}

impl<N: Clone> FunctionValue<N> {
    /// The number of arguments a call must supply.
    pub fn arity(&self) -> usize {
        match self {
            FunctionValue::Builtin { arity, .. } => *arity,
            FunctionValue::Inline { params, .. } => params.len(),
            FunctionValue::NamedRef { arity, .. } => *arity,
            FunctionValue::Partial { bound_args, .. } => {
                bound_args.iter().filter(|a| a.is_none()).count()
            }
        }
    }

    pub fn name(&self) -> Option<Name> {
        match self {
            FunctionValue::Builtin { name, .. } | FunctionValue::NamedRef { name, .. } => {
                Some(*name)
            }
            FunctionValue::Inline { .. } => None,
            FunctionValue::Partial { base, .. } => base.name(),
        }
    }
}

// Only named functions have a usable identity; inline closures and partial
// applications never compare equal.
impl<N: Clone> PartialEq for FunctionValue<N> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                FunctionValue::Builtin { name: a, arity: x },
                FunctionValue::Builtin { name: b, arity: y },
            ) => a == b && x == y,
            (
                FunctionValue::NamedRef { name: a, arity: x },
                FunctionValue::NamedRef { name: b, arity: y },
            ) => a == b && x == y,
            _ => false,
        }
    }
}

impl<N: Clone> Hash for FunctionValue<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            FunctionValue::Builtin { name, arity }
            | FunctionValue::NamedRef { name, arity } => {
                name.hash(state);
                arity.hash(state);
            }
            FunctionValue::Inline { params, .. } => params.len().hash(state),
            FunctionValue::Partial { bound_args, .. } => bound_args.len().hash(state),
        }
    }
}

impl<N> fmt::Debug for FunctionValue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionValue::Builtin { name, arity } => write!(f, "{}#{}", name, arity),
            FunctionValue::Inline { params, .. } => {
                write!(f, "function({} params)", params.len())
            }
            FunctionValue::NamedRef { name, arity } => write!(f, "{}#{}", name, arity),
            FunctionValue::Partial { base, bound_args } => {
                write!(
                    f,
                    "partial {:?} ({} placeholder(s))",
                    base,
                    bound_args.iter().filter(|a| a.is_none()).count()
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metapath_model::TreeNode;

    #[test]
    fn test_arity_counts_placeholders() {
        let base: FunctionValue<TreeNode> = FunctionValue::Builtin {
            name: Name::local_only("concat"),
            arity: 3,
        };
        assert_eq!(base.arity(), 3);
        let partial = FunctionValue::Partial {
            base: Box::new(base),
            bound_args: vec![
                Some(Sequence::from_string("a")),
                None,
                Some(Sequence::from_string("c")),
            ],
        };
        assert_eq!(partial.arity(), 1);
        assert_eq!(partial.name(), Some(Name::local_only("concat")));
    }

    #[test]
    fn test_named_identity() {
        let a: FunctionValue<TreeNode> = FunctionValue::Builtin {
            name: Name::local_only("not"),
            arity: 1,
        };
        let b: FunctionValue<TreeNode> = FunctionValue::Builtin {
            name: Name::local_only("not"),
            arity: 1,
        };
        assert_eq!(a, b);
        let c: FunctionValue<TreeNode> = FunctionValue::Builtin {
            name: Name::local_only("not"),
            arity: 2,
        };
        assert_ne!(a, c);
    }
}
