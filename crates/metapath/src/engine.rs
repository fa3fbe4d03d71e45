//! The tree-walking evaluator.
//!
//! Evaluation threads three pieces of state: the dynamic context (external
//! variables, documents, the pinned clock), the focus (context item,
//! position, size), and the local variable environment built up by `for`,
//! `let`, quantifiers, and function parameters. Every expression produces a
//! [`Sequence`].

use crate::ast::{Axis, Expr, LookupKey, NodeTest, Quantifier, Step};
use crate::context::DynamicContext;
use crate::error::MetapathError;
use crate::operators;
use crate::types::{
    ArrayValue, FunctionValue, Item, MapValue, Sequence, SequenceType,
};
use metapath_model::{axes, AtomicValue, ModelNode, Name};
use std::collections::HashMap;

/// The context item together with its position in the sequence currently
/// being processed.
#[derive(Debug, Clone)]
pub struct Focus<N> {
    pub item: Option<Item<N>>,
    pub position: usize,
    pub size: usize,
}

impl<N: Clone> Focus<N> {
    pub fn none() -> Self {
        Focus {
            item: None,
            position: 0,
            size: 0,
        }
    }

    pub fn of(item: Option<Item<N>>) -> Self {
        let size = usize::from(item.is_some());
        Focus {
            item,
            position: size,
            size,
        }
    }

    pub fn at(item: Item<N>, position: usize, size: usize) -> Self {
        Focus {
            item: Some(item),
            position,
            size,
        }
    }

    pub fn context_item(&self) -> Result<&Item<N>, MetapathError> {
        self.item.as_ref().ok_or(MetapathError::NoContextItem)
    }
}

type Env<N> = HashMap<Name, Sequence<N>>;

pub fn evaluate<'a, N: ModelNode<'a>>(
    expr: &Expr,
    ctx: &DynamicContext<N>,
    focus: &Focus<N>,
    vars: &Env<N>,
) -> Result<Sequence<N>, MetapathError> {
    match expr {
        Expr::Literal(value) => Ok(Sequence::from_atomic(value.clone())),
        Expr::ContextItem => Ok(Sequence::from_item(focus.context_item()?.clone())),
        Expr::Variable(name) => lookup_variable(*name, ctx, vars),
        Expr::Sequence(exprs) => {
            let mut items = Vec::new();
            for e in exprs {
                items.extend(evaluate(e, ctx, focus, vars)?.into_items());
            }
            Ok(Sequence::from_items(items))
        }
        Expr::Path {
            absolute,
            base,
            steps,
        } => evaluate_path(*absolute, base.as_deref(), steps, ctx, focus, vars),
        Expr::Filter { base, predicates } => {
            let base = evaluate(base, ctx, focus, vars)?;
            filter_items(base.into_items(), predicates, ctx, vars)
        }
        Expr::Or(l, r) => {
            let left = evaluate(l, ctx, focus, vars)?.effective_boolean_value()?;
            if left {
                return Ok(Sequence::from_bool(true));
            }
            let right = evaluate(r, ctx, focus, vars)?.effective_boolean_value()?;
            Ok(Sequence::from_bool(right))
        }
        Expr::And(l, r) => {
            let left = evaluate(l, ctx, focus, vars)?.effective_boolean_value()?;
            if !left {
                return Ok(Sequence::from_bool(false));
            }
            let right = evaluate(r, ctx, focus, vars)?.effective_boolean_value()?;
            Ok(Sequence::from_bool(right))
        }
        Expr::ValueComparison { op, left, right } => {
            let l = evaluate(left, ctx, focus, vars)?;
            let r = evaluate(right, ctx, focus, vars)?;
            operators::value_compare(*op, &l, &r)
        }
        Expr::GeneralComparison { op, left, right } => {
            let l = evaluate(left, ctx, focus, vars)?;
            let r = evaluate(right, ctx, focus, vars)?;
            operators::general_compare(*op, &l, &r)
        }
        Expr::Arithmetic { op, left, right } => {
            let l = evaluate(left, ctx, focus, vars)?;
            let r = evaluate(right, ctx, focus, vars)?;
            operators::arithmetic(*op, &l, &r)
        }
        Expr::Negate(e) => {
            let operand = evaluate(e, ctx, focus, vars)?;
            operators::negate(&operand)
        }
        Expr::StringConcat(l, r) => {
            let left = evaluate(l, ctx, focus, vars)?
                .atomized_singleton()?
                .map(|v| v.to_string_value())
                .unwrap_or_default();
            let right = evaluate(r, ctx, focus, vars)?
                .atomized_singleton()?
                .map(|v| v.to_string_value())
                .unwrap_or_default();
            Ok(Sequence::from_string(left + &right))
        }
        Expr::Range { start, end } => {
            let start = evaluate(start, ctx, focus, vars)?.atomized_singleton()?;
            let end = evaluate(end, ctx, focus, vars)?.atomized_singleton()?;
            let (Some(start), Some(end)) = (start, end) else {
                return Ok(Sequence::empty());
            };
            let (Some(start), Some(end)) = (start.to_integer(), end.to_integer()) else {
                return Err(MetapathError::type_error(
                    "range bounds must be integers",
                ));
            };
            Ok(Sequence::from_items(
                (start..=end)
                    .map(|i| Item::Atomic(AtomicValue::Integer(i)))
                    .collect(),
            ))
        }
        Expr::Union(l, r) => {
            let mut nodes = nodes_of(evaluate(l, ctx, focus, vars)?)?;
            nodes.extend(nodes_of(evaluate(r, ctx, focus, vars)?)?);
            nodes.sort_unstable();
            nodes.dedup();
            Ok(Sequence::from_nodes(nodes))
        }
        Expr::If {
            condition,
            then_branch,
            else_branch,
        } => {
            if evaluate(condition, ctx, focus, vars)?.effective_boolean_value()? {
                evaluate(then_branch, ctx, focus, vars)
            } else {
                evaluate(else_branch, ctx, focus, vars)
            }
        }
        Expr::For {
            bindings,
            return_expr,
        } => {
            let mut out = Vec::new();
            for_each_binding(bindings, 0, ctx, focus, &mut vars.clone(), &mut |ctx,
                                                                              focus,
                                                                              vars| {
                out.extend(evaluate(return_expr, ctx, focus, vars)?.into_items());
                Ok(true)
            })?;
            Ok(Sequence::from_items(out))
        }
        Expr::Let {
            bindings,
            return_expr,
        } => {
            let mut scope = vars.clone();
            for (name, value_expr) in bindings {
                let value = evaluate(value_expr, ctx, focus, &scope)?;
                scope.insert(*name, value);
            }
            evaluate(return_expr, ctx, focus, &scope)
        }
        Expr::Quantified {
            quantifier,
            bindings,
            satisfies,
        } => {
            let mut verdict = *quantifier == Quantifier::Every;
            for_each_binding(bindings, 0, ctx, focus, &mut vars.clone(), &mut |ctx,
                                                                              focus,
                                                                              vars| {
                let holds = evaluate(satisfies, ctx, focus, vars)?.effective_boolean_value()?;
                match quantifier {
                    Quantifier::Some if holds => {
                        verdict = true;
                        Ok(false)
                    }
                    Quantifier::Every if !holds => {
                        verdict = false;
                        Ok(false)
                    }
                    _ => Ok(true),
                }
            })?;
            Ok(Sequence::from_bool(verdict))
        }
        Expr::FunctionCall { name, args } => {
            if args.iter().any(|a| matches!(a, Expr::ArgumentPlaceholder)) {
                let base = FunctionValue::Builtin {
                    name: *name,
                    arity: args.len(),
                };
                return partial_apply(base, args, ctx, focus, vars);
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, ctx, focus, vars)?);
            }
            crate::functions::call(*name, &values, ctx, focus)
        }
        Expr::DynamicCall { base, args } => {
            let base = evaluate(base, ctx, focus, vars)?;
            let item = base.singleton()?.clone();
            if args.iter().any(|a| matches!(a, Expr::ArgumentPlaceholder)) {
                let Item::Function(func) = item else {
                    return Err(MetapathError::type_error(
                        "argument placeholders require a function item",
                    ));
                };
                return partial_apply(func, args, ctx, focus, vars);
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, ctx, focus, vars)?);
            }
            call_item(&item, values, ctx)
        }
        Expr::NamedFunctionRef { name, arity } => Ok(Sequence::from_item(Item::Function(
            FunctionValue::Builtin {
                name: *name,
                arity: *arity,
            },
        ))),
        Expr::InlineFunction {
            params,
            return_type,
            body,
        } => {
            let func = with_return_check(
                FunctionValue::Inline {
                    params: params.clone(),
                    body: body.clone(),
                    captured: vars.iter().map(|(k, v)| (*k, v.clone())).collect(),
                },
                return_type.clone(),
            );
            Ok(Sequence::from_item(Item::Function(func)))
        }
        Expr::ArgumentPlaceholder => Err(MetapathError::Static(
            "'?' is only valid as a call argument".to_string(),
        )),
        Expr::MapConstructor(entries) => {
            let mut map = MapValue::new();
            for (key_expr, value_expr) in entries {
                let key = evaluate(key_expr, ctx, focus, vars)?
                    .atomized_singleton()?
                    .ok_or_else(|| {
                        MetapathError::type_error("map key must be a single atomic value")
                    })?;
                if map.contains(&key) {
                    return Err(MetapathError::function(
                        "map",
                        format!("duplicate key '{}'", key),
                    ));
                }
                let value = evaluate(value_expr, ctx, focus, vars)?;
                map.insert(key, value);
            }
            Ok(Sequence::from_item(Item::Map(map)))
        }
        Expr::SquareArray(members) => {
            let mut out = Vec::with_capacity(members.len());
            for member in members {
                out.push(evaluate(member, ctx, focus, vars)?);
            }
            Ok(Sequence::from_item(Item::Array(ArrayValue::new(out))))
        }
        Expr::CurlyArray(e) => {
            // each item of the sequence becomes its own member
            let members = evaluate(e, ctx, focus, vars)?
                .into_items()
                .into_iter()
                .map(Sequence::from_item)
                .collect();
            Ok(Sequence::from_item(Item::Array(ArrayValue::new(members))))
        }
        Expr::Lookup { base, key } => {
            let base = evaluate(base, ctx, focus, vars)?;
            let mut out = Vec::new();
            for item in base.items() {
                out.extend(lookup_in(item, key, ctx, focus, vars)?.into_items());
            }
            Ok(Sequence::from_items(out))
        }
        Expr::UnaryLookup(key) => {
            let item = focus.context_item()?.clone();
            lookup_in(&item, key, ctx, focus, vars)
        }
        Expr::SimpleMap { base, mapping } => {
            let base = evaluate(base, ctx, focus, vars)?;
            let size = base.len();
            let mut out = Vec::new();
            for (i, item) in base.into_items().into_iter().enumerate() {
                let focus = Focus::at(item, i + 1, size);
                out.extend(evaluate(mapping, ctx, &focus, vars)?.into_items());
            }
            Ok(Sequence::from_items(out))
        }
        Expr::InstanceOf {
            expr,
            sequence_type,
        } => {
            let value = evaluate(expr, ctx, focus, vars)?;
            Ok(Sequence::from_bool(sequence_type.matches(&value)))
        }
        Expr::TreatAs {
            expr,
            sequence_type,
        } => {
            let value = evaluate(expr, ctx, focus, vars)?;
            if sequence_type.matches(&value) {
                Ok(value)
            } else {
                Err(MetapathError::type_error(format!(
                    "sequence does not match {}",
                    sequence_type
                )))
            }
        }
        Expr::CastAs {
            expr,
            data_type,
            optional,
        } => {
            let value = evaluate(expr, ctx, focus, vars)?;
            match value.atomized_singleton()? {
                None if *optional => Ok(Sequence::empty()),
                None => Err(MetapathError::type_error(format!(
                    "cannot cast an empty sequence to {}",
                    data_type
                ))),
                Some(atomic) => {
                    operators::cast_atomic(&atomic, *data_type).map(Sequence::from_atomic)
                }
            }
        }
        Expr::CastableAs {
            expr,
            data_type,
            optional,
        } => {
            let value = evaluate(expr, ctx, focus, vars)?;
            let castable = match value.atomized_singleton() {
                Ok(None) => *optional,
                Ok(Some(atomic)) => operators::cast_atomic(&atomic, *data_type).is_ok(),
                Err(_) => false,
            };
            Ok(Sequence::from_bool(castable))
        }
    }
}

fn lookup_variable<'a, N: ModelNode<'a>>(
    name: Name,
    ctx: &DynamicContext<N>,
    vars: &Env<N>,
) -> Result<Sequence<N>, MetapathError> {
    if let Some(value) = vars.get(&name) {
        return Ok(value.clone());
    }
    ctx.variable(name)
        .cloned()
        .ok_or_else(|| MetapathError::UnknownVariable(name.to_string()))
}

/// Runs `body` once per combination of the `for`/quantifier bindings.
/// `body` returns `false` to stop early.
fn for_each_binding<'a, N: ModelNode<'a>>(
    bindings: &[(Name, Expr)],
    index: usize,
    ctx: &DynamicContext<N>,
    focus: &Focus<N>,
    vars: &mut Env<N>,
    body: &mut dyn FnMut(&DynamicContext<N>, &Focus<N>, &Env<N>) -> Result<bool, MetapathError>,
) -> Result<bool, MetapathError> {
    let Some((name, value_expr)) = bindings.get(index) else {
        return body(ctx, focus, vars);
    };
    let values = evaluate(value_expr, ctx, focus, vars)?;
    for item in values.into_items() {
        let previous = vars.insert(*name, Sequence::from_item(item));
        let keep_going = for_each_binding(bindings, index + 1, ctx, focus, vars, body)?;
        match previous {
            Some(p) => {
                vars.insert(*name, p);
            }
            None => {
                vars.remove(name);
            }
        }
        if !keep_going {
            return Ok(false);
        }
    }
    Ok(true)
}

fn evaluate_path<'a, N: ModelNode<'a>>(
    absolute: bool,
    base: Option<&Expr>,
    steps: &[Step],
    ctx: &DynamicContext<N>,
    focus: &Focus<N>,
    vars: &Env<N>,
) -> Result<Sequence<N>, MetapathError> {
    let mut nodes: Vec<N> = match base {
        Some(base) => nodes_of(evaluate(base, ctx, focus, vars)?)?,
        None => {
            let item = focus.context_item()?;
            let node = *item.as_node().ok_or_else(|| {
                MetapathError::type_error("path expression requires a node context item")
            })?;
            if absolute {
                vec![axes::document_root(node)]
            } else {
                vec![node]
            }
        }
    };
    for step in steps {
        let mut collected = Vec::new();
        for node in &nodes {
            collected.extend(evaluate_step(*node, step, ctx, vars)?);
        }
        collected.sort_unstable();
        collected.dedup();
        nodes = collected;
    }
    Ok(Sequence::from_nodes(nodes))
}

fn evaluate_step<'a, N: ModelNode<'a>>(
    node: N,
    step: &Step,
    ctx: &DynamicContext<N>,
    vars: &Env<N>,
) -> Result<Vec<N>, MetapathError> {
    let candidates = match step.axis {
        Axis::SelfAxis => axes::collect_self(node),
        Axis::Child => axes::collect_children(node),
        Axis::Descendant => axes::collect_descendants(node),
        Axis::DescendantOrSelf => axes::collect_descendants_or_self(node),
        Axis::Parent => axes::collect_parent(node),
        Axis::Ancestor => axes::collect_ancestors(node),
        Axis::AncestorOrSelf => axes::collect_ancestors_or_self(node),
        Axis::FollowingSibling => axes::collect_following_siblings(node),
        Axis::PrecedingSibling => axes::collect_preceding_siblings(node),
        Axis::Following => axes::collect_following(node),
        Axis::Preceding => axes::collect_preceding(node),
        Axis::Flag => axes::collect_flags(node),
    };
    let mut selected: Vec<N> = candidates
        .into_iter()
        .filter(|n| node_test_matches(&step.test, n))
        .collect();
    for predicate in &step.predicates {
        selected = apply_node_predicate(selected, predicate, ctx, vars)?;
    }
    Ok(selected)
}

fn node_test_matches<'a, N: ModelNode<'a>>(test: &NodeTest, node: &N) -> bool {
    match test {
        NodeTest::Wildcard => node.name().is_some(),
        NodeTest::Name(name) => node.name() == Some(*name),
        NodeTest::Kind(kt) => kt.matches(node),
    }
}

fn apply_node_predicate<'a, N: ModelNode<'a>>(
    nodes: Vec<N>,
    predicate: &Expr,
    ctx: &DynamicContext<N>,
    vars: &Env<N>,
) -> Result<Vec<N>, MetapathError> {
    let size = nodes.len();
    let mut kept = Vec::new();
    for (i, node) in nodes.into_iter().enumerate() {
        let focus = Focus::at(Item::Node(node), i + 1, size);
        let result = evaluate(predicate, ctx, &focus, vars)?;
        if predicate_holds(&result, i + 1)? {
            kept.push(node);
        }
    }
    Ok(kept)
}

fn filter_items<'a, N: ModelNode<'a>>(
    mut items: Vec<Item<N>>,
    predicates: &[Expr],
    ctx: &DynamicContext<N>,
    vars: &Env<N>,
) -> Result<Sequence<N>, MetapathError> {
    for predicate in predicates {
        let size = items.len();
        let mut kept = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            let focus = Focus::at(item.clone(), i + 1, size);
            let result = evaluate(predicate, ctx, &focus, vars)?;
            if predicate_holds(&result, i + 1)? {
                kept.push(item);
            }
        }
        items = kept;
    }
    Ok(Sequence::from_items(items))
}

// A singleton numeric predicate selects by position; anything else is an
// effective boolean value.
fn predicate_holds<'a, N: ModelNode<'a>>(
    result: &Sequence<N>,
    position: usize,
) -> Result<bool, MetapathError> {
    if let [Item::Atomic(value)] = result.items()
        && value.is_numeric()
    {
        return Ok(value.to_integer() == Some(position as i64)
            && value == &AtomicValue::Integer(position as i64));
    }
    result.effective_boolean_value()
}

fn nodes_of<'a, N: ModelNode<'a>>(sequence: Sequence<N>) -> Result<Vec<N>, MetapathError> {
    sequence
        .into_items()
        .into_iter()
        .map(|item| match item {
            Item::Node(n) => Ok(n),
            other => Err(MetapathError::type_error(format!(
                "expected nodes, found {}",
                other.type_signature()
            ))),
        })
        .collect()
}

fn partial_apply<'a, N: ModelNode<'a>>(
    base: FunctionValue<N>,
    args: &[Expr],
    ctx: &DynamicContext<N>,
    focus: &Focus<N>,
    vars: &Env<N>,
) -> Result<Sequence<N>, MetapathError> {
    let mut bound = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Expr::ArgumentPlaceholder => bound.push(None),
            other => bound.push(Some(evaluate(other, ctx, focus, vars)?)),
        }
    }
    Ok(Sequence::from_item(Item::Function(FunctionValue::Partial {
        base: Box::new(base),
        bound_args: bound,
    })))
}

/// Calls a map, an array, or a function item with already-evaluated
/// arguments.
pub fn call_item<'a, N: ModelNode<'a>>(
    item: &Item<N>,
    args: Vec<Sequence<N>>,
    ctx: &DynamicContext<N>,
) -> Result<Sequence<N>, MetapathError> {
    match item {
        Item::Function(func) => invoke(func, args, ctx),
        Item::Map(map) => {
            let [key] = args.as_slice() else {
                return Err(MetapathError::type_error(
                    "a map takes exactly one argument",
                ));
            };
            let key = key.atomized_singleton()?.ok_or_else(|| {
                MetapathError::type_error("map key must be a single atomic value")
            })?;
            Ok(map.get(&key).cloned().unwrap_or_else(Sequence::empty))
        }
        Item::Array(array) => {
            let [index] = args.as_slice() else {
                return Err(MetapathError::type_error(
                    "an array takes exactly one argument",
                ));
            };
            let index = index
                .atomized_singleton()?
                .and_then(|v| v.to_integer())
                .ok_or_else(|| {
                    MetapathError::type_error("array index must be a single integer")
                })?;
            array.get(index).cloned()
        }
        other => Err(MetapathError::type_error(format!(
            "{} is not callable",
            other.type_signature()
        ))),
    }
}

/// Invokes a function item.
pub fn invoke<'a, N: ModelNode<'a>>(
    func: &FunctionValue<N>,
    args: Vec<Sequence<N>>,
    ctx: &DynamicContext<N>,
) -> Result<Sequence<N>, MetapathError> {
    if args.len() != func.arity() {
        return Err(MetapathError::type_error(format!(
            "function expects {} argument(s), got {}",
            func.arity(),
            args.len()
        )));
    }
    match func {
        FunctionValue::Builtin { name, .. } | FunctionValue::NamedRef { name, .. } => {
            crate::functions::call(*name, &args, ctx, &Focus::none())
        }
        FunctionValue::Inline {
            params,
            body,
            captured,
        } => {
            let mut env: Env<N> = captured.iter().cloned().collect();
            for (param, value) in params.iter().zip(args) {
                if let Some(declared) = &param.type_decl
                    && !declared.matches(&value)
                {
                    return Err(MetapathError::type_error(format!(
                        "argument ${} does not match {}",
                        param.name, declared
                    )));
                }
                env.insert(param.name, value);
            }
            evaluate(body, ctx, &Focus::none(), &env)
        }
        FunctionValue::Partial { base, bound_args } => {
            let mut supplied = args.into_iter();
            let full: Vec<Sequence<N>> = bound_args
                .iter()
                .map(|slot| match slot {
                    Some(value) => value.clone(),
                    None => supplied.next().unwrap_or_else(Sequence::empty),
                })
                .collect();
            invoke(base, full, ctx)
        }
    }
}

fn lookup_in<'a, N: ModelNode<'a>>(
    item: &Item<N>,
    key: &LookupKey,
    ctx: &DynamicContext<N>,
    focus: &Focus<N>,
    vars: &Env<N>,
) -> Result<Sequence<N>, MetapathError> {
    let keys: Vec<AtomicValue> = match key {
        LookupKey::Wildcard => {
            return match item {
                Item::Map(map) => Ok(Sequence::from_items(
                    map.values()
                        .flat_map(|v| v.items().iter().cloned())
                        .collect(),
                )),
                Item::Array(array) => Ok(Sequence::from_items(
                    array
                        .members()
                        .iter()
                        .flat_map(|m| m.items().iter().cloned())
                        .collect(),
                )),
                other => Err(MetapathError::type_error(format!(
                    "cannot look up in {}",
                    other.type_signature()
                ))),
            };
        }
        LookupKey::Integer(i) => vec![AtomicValue::Integer(*i)],
        LookupKey::Name(n) => vec![AtomicValue::String(n.clone())],
        LookupKey::Expr(e) => evaluate(e, ctx, focus, vars)?.atomize()?,
    };
    let mut out = Vec::new();
    for key in keys {
        match item {
            Item::Map(map) => {
                if let Some(value) = map.get(&key) {
                    out.extend(value.items().iter().cloned());
                }
            }
            Item::Array(array) => {
                let index = key.to_integer().ok_or_else(|| {
                    MetapathError::type_error("array lookup requires an integer key")
                })?;
                out.extend(array.get(index)?.items().iter().cloned());
            }
            other => {
                return Err(MetapathError::type_error(format!(
                    "cannot look up in {}",
                    other.type_signature()
                )));
            }
        }
    }
    Ok(Sequence::from_items(out))
}

// An inline function's declared return type is enforced by wrapping the
// body in a treat step at construction.
fn with_return_check<N: Clone>(
    func: FunctionValue<N>,
    return_type: Option<SequenceType>,
) -> FunctionValue<N> {
    match (func, return_type) {
        (
            FunctionValue::Inline {
                params,
                body,
                captured,
            },
            Some(declared),
        ) => FunctionValue::Inline {
            params,
            body: std::sync::Arc::new(Expr::TreatAs {
                expr: Box::new((*body).clone()),
                sequence_type: declared,
            }),
            captured,
        },
        (func, _) => func,
    }
}
