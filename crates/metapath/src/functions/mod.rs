//! The built-in function library, grouped by namespace.
//!
//! Resolution is two-stage: at compile time [`is_known_function`] checks the
//! qualified name and arity against the signature tables, so a bad call is a
//! static error; at evaluation time [`call`] dispatches to the group module
//! for the name's namespace.

mod array;
mod core;
mod map;
mod math;

use crate::context::{
    ARRAY_NAMESPACE, DynamicContext, FN_NAMESPACE, MAP_NAMESPACE, MATH_NAMESPACE,
};
use crate::engine::Focus;
use crate::error::MetapathError;
use crate::types::Sequence;
use metapath_model::{ModelNode, Name};

// (local name, minimum arity, maximum arity)
type SignatureTable = &'static [(&'static str, usize, usize)];

const VARIADIC: usize = usize::MAX;

static CORE_SIGNATURES: SignatureTable = &[
    ("abs", 1, 1),
    ("avg", 1, 1),
    ("base-uri", 0, 1),
    ("boolean", 1, 1),
    ("ceiling", 1, 1),
    ("concat", 2, VARIADIC),
    ("contains", 2, 2),
    ("count", 1, 1),
    ("current-date", 0, 0),
    ("current-dateTime", 0, 0),
    ("current-time", 0, 0),
    ("data", 0, 1),
    ("distinct-values", 1, 1),
    ("doc", 1, 1),
    ("empty", 1, 1),
    ("ends-with", 2, 2),
    ("exactly-one", 1, 1),
    ("exists", 1, 1),
    ("false", 0, 0),
    ("filter", 2, 2),
    ("floor", 1, 1),
    ("fold-left", 3, 3),
    ("fold-right", 3, 3),
    ("for-each", 2, 2),
    ("head", 1, 1),
    ("index-of", 2, 2),
    ("insert-before", 3, 3),
    ("last", 0, 0),
    ("local-name", 0, 1),
    ("lower-case", 1, 1),
    ("matches", 2, 2),
    ("max", 1, 1),
    ("min", 1, 1),
    ("name", 0, 1),
    ("normalize-space", 0, 1),
    ("not", 1, 1),
    ("number", 0, 1),
    ("one-or-more", 1, 1),
    ("path", 0, 1),
    ("position", 0, 0),
    ("remove", 2, 2),
    ("replace", 3, 3),
    ("reverse", 1, 1),
    ("root", 0, 1),
    ("round", 1, 2),
    ("starts-with", 2, 2),
    ("string", 0, 1),
    ("string-join", 1, 2),
    ("string-length", 0, 1),
    ("subsequence", 2, 3),
    ("substring", 2, 3),
    ("sum", 1, 2),
    ("tail", 1, 1),
    ("tokenize", 1, 2),
    ("true", 0, 0),
    ("upper-case", 1, 1),
    ("zero-or-one", 1, 1),
];

static MATH_SIGNATURES: SignatureTable = &[
    ("cos", 1, 1),
    ("exp", 1, 1),
    ("log", 1, 1),
    ("log10", 1, 1),
    ("pi", 0, 0),
    ("pow", 2, 2),
    ("sin", 1, 1),
    ("sqrt", 1, 1),
    ("tan", 1, 1),
];

static MAP_SIGNATURES: SignatureTable = &[
    ("contains", 2, 2),
    ("entry", 2, 2),
    ("get", 2, 2),
    ("keys", 1, 1),
    ("merge", 1, 1),
    ("put", 3, 3),
    ("remove", 2, 2),
    ("size", 1, 1),
];

static ARRAY_SIGNATURES: SignatureTable = &[
    ("append", 2, 2),
    ("flatten", 1, 1),
    ("get", 2, 2),
    ("head", 1, 1),
    ("insert-before", 3, 3),
    ("join", 1, 1),
    ("put", 3, 3),
    ("remove", 2, 2),
    ("reverse", 1, 1),
    ("size", 1, 1),
    ("subarray", 2, 3),
    ("tail", 1, 1),
];

fn table_for(namespace: &str) -> Option<SignatureTable> {
    match namespace {
        FN_NAMESPACE => Some(CORE_SIGNATURES),
        MATH_NAMESPACE => Some(MATH_SIGNATURES),
        MAP_NAMESPACE => Some(MAP_SIGNATURES),
        ARRAY_NAMESPACE => Some(ARRAY_SIGNATURES),
        _ => None,
    }
}

/// Whether `name` with `arity` names a built-in.
pub(crate) fn is_known_function(name: Name, arity: usize) -> bool {
    let Some(table) = table_for(&name.namespace()) else {
        return false;
    };
    let local = name.local();
    table
        .iter()
        .any(|(n, min, max)| *n == local && (*min..=*max).contains(&arity))
}

/// Dispatches an already arity-checked call.
pub(crate) fn call<'a, N: ModelNode<'a>>(
    name: Name,
    args: &[Sequence<N>],
    ctx: &DynamicContext<N>,
    focus: &Focus<N>,
) -> Result<Sequence<N>, MetapathError> {
    let unknown = || MetapathError::UnknownFunction {
        name: name.to_string(),
        arity: args.len(),
    };
    if !is_known_function(name, args.len()) {
        return Err(unknown());
    }
    let local = name.local();
    match name.namespace().as_str() {
        FN_NAMESPACE => core::call(&local, args, ctx, focus),
        MATH_NAMESPACE => math::call(&local, args),
        MAP_NAMESPACE => map::call(&local, args, ctx),
        ARRAY_NAMESPACE => array::call(&local, args),
        _ => Err(unknown()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_function_lookup() {
        assert!(is_known_function(Name::intern(FN_NAMESPACE, "not"), 1));
        assert!(!is_known_function(Name::intern(FN_NAMESPACE, "not"), 2));
        assert!(is_known_function(Name::intern(FN_NAMESPACE, "concat"), 7));
        assert!(!is_known_function(Name::intern(FN_NAMESPACE, "concat"), 1));
        assert!(is_known_function(Name::intern(MATH_NAMESPACE, "sqrt"), 1));
        assert!(is_known_function(Name::intern(MAP_NAMESPACE, "put"), 3));
        assert!(is_known_function(Name::intern(ARRAY_NAMESPACE, "flatten"), 1));
        assert!(!is_known_function(Name::local_only("not"), 1));
    }
}
