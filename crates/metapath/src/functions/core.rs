//! The core function group (default function namespace).

use crate::context::DynamicContext;
use crate::engine::{self, Focus};
use crate::error::MetapathError;
use crate::types::{Item, Sequence};
use metapath_model::{AtomicValue, ModelNode, NodeKind};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

pub(super) fn call<'a, N: ModelNode<'a>>(
    local: &str,
    args: &[Sequence<N>],
    ctx: &DynamicContext<N>,
    focus: &Focus<N>,
) -> Result<Sequence<N>, MetapathError> {
    match (local, args.len()) {
        ("true", 0) => Ok(Sequence::from_bool(true)),
        ("false", 0) => Ok(Sequence::from_bool(false)),
        ("boolean", 1) => Ok(Sequence::from_bool(args[0].effective_boolean_value()?)),
        ("not", 1) => Ok(Sequence::from_bool(!args[0].effective_boolean_value()?)),

        ("string", 0) => Ok(Sequence::from_string(item_string(focus.context_item()?))),
        ("string", 1) => Ok(Sequence::from_string(singleton_string(&args[0])?)),
        ("string-length", 0) => Ok(Sequence::from_integer(
            item_string(focus.context_item()?).chars().count() as i64,
        )),
        ("string-length", 1) => Ok(Sequence::from_integer(
            singleton_string(&args[0])?.chars().count() as i64,
        )),
        ("concat", _) => {
            let mut out = String::new();
            for arg in args {
                out.push_str(&singleton_string(arg)?);
            }
            Ok(Sequence::from_string(out))
        }
        ("substring", 2 | 3) => {
            let source = singleton_string(&args[0])?;
            let start = singleton_double(&args[1])?.round();
            let end = match args.get(2) {
                Some(len) => start + singleton_double(len)?.round(),
                None => f64::INFINITY,
            };
            let out: String = source
                .chars()
                .enumerate()
                .filter(|(i, _)| {
                    let p = (*i + 1) as f64;
                    p >= start && p < end
                })
                .map(|(_, c)| c)
                .collect();
            Ok(Sequence::from_string(out))
        }
        ("contains", 2) => {
            let haystack = singleton_string(&args[0])?;
            let needle = singleton_string(&args[1])?;
            Ok(Sequence::from_bool(haystack.contains(&needle)))
        }
        ("starts-with", 2) => {
            let haystack = singleton_string(&args[0])?;
            let needle = singleton_string(&args[1])?;
            Ok(Sequence::from_bool(haystack.starts_with(&needle)))
        }
        ("ends-with", 2) => {
            let haystack = singleton_string(&args[0])?;
            let needle = singleton_string(&args[1])?;
            Ok(Sequence::from_bool(haystack.ends_with(&needle)))
        }
        ("upper-case", 1) => Ok(Sequence::from_string(
            singleton_string(&args[0])?.to_uppercase(),
        )),
        ("lower-case", 1) => Ok(Sequence::from_string(
            singleton_string(&args[0])?.to_lowercase(),
        )),
        ("normalize-space", 0) => Ok(Sequence::from_string(normalize(&item_string(
            focus.context_item()?,
        )))),
        ("normalize-space", 1) => Ok(Sequence::from_string(normalize(&singleton_string(
            &args[0],
        )?))),
        ("tokenize", 1) => {
            let input = normalize(&singleton_string(&args[0])?);
            Ok(Sequence::from_items(
                input
                    .split(' ')
                    .filter(|t| !t.is_empty())
                    .map(|t| Item::Atomic(AtomicValue::String(t.to_string())))
                    .collect(),
            ))
        }
        ("tokenize", 2) => {
            let input = singleton_string(&args[0])?;
            let re = compile_regex("tokenize", &singleton_string(&args[1])?)?;
            Ok(Sequence::from_items(
                re.split(&input)
                    .map(|t| Item::Atomic(AtomicValue::String(t.to_string())))
                    .collect(),
            ))
        }
        ("matches", 2) => {
            let input = singleton_string(&args[0])?;
            let re = compile_regex("matches", &singleton_string(&args[1])?)?;
            Ok(Sequence::from_bool(re.is_match(&input)))
        }
        ("replace", 3) => {
            let input = singleton_string(&args[0])?;
            let re = compile_regex("replace", &singleton_string(&args[1])?)?;
            let replacement = singleton_string(&args[2])?;
            Ok(Sequence::from_string(
                re.replace_all(&input, replacement.as_str()).into_owned(),
            ))
        }
        ("string-join", 1 | 2) => {
            let separator = match args.get(1) {
                Some(sep) => singleton_string(sep)?,
                None => String::new(),
            };
            let parts: Vec<String> = args[0]
                .atomize()?
                .into_iter()
                .map(|v| v.to_string_value())
                .collect();
            Ok(Sequence::from_string(parts.join(&separator)))
        }

        ("count", 1) => Ok(Sequence::from_integer(args[0].len() as i64)),
        ("empty", 1) => Ok(Sequence::from_bool(args[0].is_empty())),
        ("exists", 1) => Ok(Sequence::from_bool(!args[0].is_empty())),
        ("head", 1) => Ok(args[0]
            .first()
            .cloned()
            .map(Sequence::from_item)
            .unwrap_or_else(Sequence::empty)),
        ("tail", 1) => Ok(Sequence::from_items(
            args[0].items().iter().skip(1).cloned().collect(),
        )),
        ("reverse", 1) => {
            let mut items: Vec<Item<N>> = args[0].items().to_vec();
            items.reverse();
            Ok(Sequence::from_items(items))
        }
        ("subsequence", 2 | 3) => {
            let start = singleton_double(&args[1])?.round();
            let end = match args.get(2) {
                Some(len) => start + singleton_double(len)?.round(),
                None => f64::INFINITY,
            };
            Ok(Sequence::from_items(
                args[0]
                    .items()
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| {
                        let p = (*i + 1) as f64;
                        p >= start && p < end
                    })
                    .map(|(_, item)| item.clone())
                    .collect(),
            ))
        }
        ("distinct-values", 1) => {
            let mut seen: Vec<AtomicValue> = Vec::new();
            for value in args[0].atomize()? {
                if !seen.contains(&value) {
                    seen.push(value);
                }
            }
            Ok(Sequence::from_items(
                seen.into_iter().map(Item::Atomic).collect(),
            ))
        }
        ("insert-before", 3) => {
            let mut items: Vec<Item<N>> = args[0].items().to_vec();
            let position = singleton_integer(&args[1])?.max(1) as usize - 1;
            let at = position.min(items.len());
            for (offset, item) in args[2].items().iter().enumerate() {
                items.insert(at + offset, item.clone());
            }
            Ok(Sequence::from_items(items))
        }
        ("remove", 2) => {
            let position = singleton_integer(&args[1])?;
            Ok(Sequence::from_items(
                args[0]
                    .items()
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| (*i + 1) as i64 != position)
                    .map(|(_, item)| item.clone())
                    .collect(),
            ))
        }
        ("index-of", 2) => {
            let search = args[1].atomized_singleton()?.ok_or_else(|| {
                MetapathError::type_error("index-of requires a single search value")
            })?;
            let mut out = Vec::new();
            for (i, value) in args[0].atomize()?.into_iter().enumerate() {
                if value == search {
                    out.push(Item::Atomic(AtomicValue::Integer((i + 1) as i64)));
                }
            }
            Ok(Sequence::from_items(out))
        }
        ("zero-or-one", 1) => {
            if args[0].len() <= 1 {
                Ok(args[0].clone())
            } else {
                Err(MetapathError::Cardinality {
                    expected: "at most one item".to_string(),
                    actual: args[0].len(),
                })
            }
        }
        ("one-or-more", 1) => {
            if args[0].is_empty() {
                Err(MetapathError::Cardinality {
                    expected: "at least one item".to_string(),
                    actual: 0,
                })
            } else {
                Ok(args[0].clone())
            }
        }
        ("exactly-one", 1) => args[0].singleton().map(|i| Sequence::from_item(i.clone())),

        ("position", 0) => {
            focus.context_item()?;
            Ok(Sequence::from_integer(focus.position as i64))
        }
        ("last", 0) => {
            focus.context_item()?;
            Ok(Sequence::from_integer(focus.size as i64))
        }
        ("name", 0 | 1) => {
            let node = node_argument(args.first(), focus)?;
            Ok(match node.and_then(|n| n.name()) {
                Some(name) => Sequence::from_string(name.to_string()),
                None => Sequence::from_string(""),
            })
        }
        ("local-name", 0 | 1) => {
            let node = node_argument(args.first(), focus)?;
            Ok(match node.and_then(|n| n.name()) {
                Some(name) => Sequence::from_string(name.local()),
                None => Sequence::from_string(""),
            })
        }
        ("path", 0 | 1) => {
            let Some(node) = node_argument(args.first(), focus)? else {
                return Ok(Sequence::empty());
            };
            Ok(Sequence::from_string(node_path(node)))
        }
        ("root", 0 | 1) => {
            let Some(node) = node_argument(args.first(), focus)? else {
                return Ok(Sequence::empty());
            };
            Ok(Sequence::from_node(metapath_model::axes::document_root(
                node,
            )))
        }
        ("base-uri", 0 | 1) => {
            let Some(node) = node_argument(args.first(), focus)? else {
                return Ok(Sequence::empty());
            };
            Ok(match node.base_uri() {
                Some(uri) => Sequence::from_atomic(AtomicValue::Uri(uri)),
                None => Sequence::empty(),
            })
        }
        ("data", 0) => {
            let item = focus.context_item()?.clone();
            let values = Sequence::from_item(item).atomize()?;
            Ok(Sequence::from_items(
                values.into_iter().map(Item::Atomic).collect(),
            ))
        }
        ("data", 1) => Ok(Sequence::from_items(
            args[0].atomize()?.into_iter().map(Item::Atomic).collect(),
        )),
        ("number", 0 | 1) => {
            let value = match args.first() {
                Some(arg) => arg.atomized_singleton()?,
                None => Sequence::from_item(focus.context_item()?.clone())
                    .atomized_singleton()?,
            };
            let value = value.ok_or_else(|| {
                MetapathError::function("number", "empty sequence has no numeric value")
            })?;
            value
                .to_decimal()
                .map(|d| Sequence::from_atomic(AtomicValue::Decimal(d)))
                .ok_or_else(|| {
                    MetapathError::function(
                        "number",
                        format!("'{}' is not numeric", value.to_string_value()),
                    )
                })
        }

        ("abs", 1) => unary_numeric(&args[0], |i| Some(i.abs()), |d| d.abs()),
        ("ceiling", 1) => unary_numeric(&args[0], Some, |d| d.ceil()),
        ("floor", 1) => unary_numeric(&args[0], Some, |d| d.floor()),
        ("round", 1) => unary_numeric(&args[0], Some, round_half_up),
        ("round", 2) => {
            let precision = singleton_integer(&args[1])?;
            let Some(value) = args[0].atomized_singleton()? else {
                return Ok(Sequence::empty());
            };
            let d = value.to_decimal().ok_or_else(|| {
                MetapathError::type_error(format!("cannot round {}", value.type_name()))
            })?;
            let factor = Decimal::from(10i64.pow(precision.unsigned_abs().min(28) as u32));
            let rounded = if precision >= 0 {
                round_half_up(d * factor) / factor
            } else {
                round_half_up(d / factor) * factor
            };
            Ok(Sequence::from_atomic(decimal_result(rounded, &value)))
        }
        ("sum", 1 | 2) => {
            let values = args[0].atomize()?;
            if values.is_empty() {
                return Ok(match args.get(1) {
                    Some(zero) => zero.clone(),
                    None => Sequence::from_integer(0),
                });
            }
            sum_values(values).map(Sequence::from_atomic)
        }
        ("avg", 1) => {
            let values = args[0].atomize()?;
            if values.is_empty() {
                return Ok(Sequence::empty());
            }
            let count = Decimal::from(values.len() as i64);
            match sum_values(values)? {
                AtomicValue::Integer(total) => Ok(Sequence::from_atomic(AtomicValue::Decimal(
                    Decimal::from(total) / count,
                ))),
                AtomicValue::Decimal(total) => {
                    Ok(Sequence::from_atomic(AtomicValue::Decimal(total / count)))
                }
                other => Err(MetapathError::type_error(format!(
                    "cannot average {}",
                    other.type_name()
                ))),
            }
        }
        ("min", 1) => extreme(&args[0], std::cmp::Ordering::Less),
        ("max", 1) => extreme(&args[0], std::cmp::Ordering::Greater),

        ("current-date", 0) => Ok(Sequence::from_atomic(AtomicValue::Date(
            ctx.current_date_time().date(),
        ))),
        ("current-dateTime", 0) => Ok(Sequence::from_atomic(AtomicValue::DateTime(
            ctx.current_date_time(),
        ))),
        ("current-time", 0) => Ok(Sequence::from_atomic(AtomicValue::Time(
            ctx.current_date_time().time(),
        ))),
        ("doc", 1) => {
            let uri = singleton_string(&args[0])?;
            ctx.document(&uri)
                .map(|root| Sequence::from_node(*root))
                .ok_or_else(|| {
                    MetapathError::function("doc", format!("no document registered at '{}'", uri))
                })
        }

        ("for-each", 2) => {
            let func = function_argument(&args[1])?;
            let mut out = Vec::new();
            for item in args[0].items() {
                let result =
                    engine::invoke(func, vec![Sequence::from_item(item.clone())], ctx)?;
                out.extend(result.into_items());
            }
            Ok(Sequence::from_items(out))
        }
        ("filter", 2) => {
            let func = function_argument(&args[1])?;
            let mut out = Vec::new();
            for item in args[0].items() {
                let verdict =
                    engine::invoke(func, vec![Sequence::from_item(item.clone())], ctx)?
                        .effective_boolean_value()?;
                if verdict {
                    out.push(item.clone());
                }
            }
            Ok(Sequence::from_items(out))
        }
        ("fold-left", 3) => {
            let func = function_argument(&args[2])?;
            let mut acc = args[1].clone();
            for item in args[0].items() {
                acc = engine::invoke(
                    func,
                    vec![acc, Sequence::from_item(item.clone())],
                    ctx,
                )?;
            }
            Ok(acc)
        }
        ("fold-right", 3) => {
            let func = function_argument(&args[2])?;
            let mut acc = args[1].clone();
            for item in args[0].items().iter().rev() {
                acc = engine::invoke(
                    func,
                    vec![Sequence::from_item(item.clone()), acc],
                    ctx,
                )?;
            }
            Ok(acc)
        }

        (local, arity) => Err(MetapathError::UnknownFunction {
            name: local.to_string(),
            arity,
        }),
    }
}

fn item_string<'a, N: ModelNode<'a>>(item: &Item<N>) -> String {
    item.string_value()
}

/// The string value of an at-most-one-item sequence; empty becomes "".
fn singleton_string<'a, N: ModelNode<'a>>(seq: &Sequence<N>) -> Result<String, MetapathError> {
    match seq.items() {
        [] => Ok(String::new()),
        [item] => Ok(item.string_value()),
        _ => Err(MetapathError::Cardinality {
            expected: "at most one item".to_string(),
            actual: seq.len(),
        }),
    }
}

fn singleton_double<'a, N: ModelNode<'a>>(seq: &Sequence<N>) -> Result<f64, MetapathError> {
    let value = seq
        .atomized_singleton()?
        .ok_or_else(|| MetapathError::type_error("expected a number, got an empty sequence"))?;
    if !value.is_numeric() && !matches!(value, AtomicValue::Untyped(_)) {
        return Err(MetapathError::type_error(format!(
            "expected a number, got {}",
            value.type_name()
        )));
    }
    Ok(value.to_double())
}

fn singleton_integer<'a, N: ModelNode<'a>>(seq: &Sequence<N>) -> Result<i64, MetapathError> {
    seq.atomized_singleton()?
        .and_then(|v| v.to_integer())
        .ok_or_else(|| MetapathError::type_error("expected a single integer"))
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn compile_regex(function: &str, pattern: &str) -> Result<Regex, MetapathError> {
    Regex::new(pattern)
        .map_err(|e| MetapathError::function(function, format!("invalid pattern: {}", e)))
}

fn node_argument<'a, N: ModelNode<'a>>(
    arg: Option<&Sequence<N>>,
    focus: &Focus<N>,
) -> Result<Option<N>, MetapathError> {
    let item = match arg {
        Some(seq) => match seq.items() {
            [] => return Ok(None),
            [item] => item.clone(),
            _ => {
                return Err(MetapathError::Cardinality {
                    expected: "at most one node".to_string(),
                    actual: seq.len(),
                });
            }
        },
        None => focus.context_item()?.clone(),
    };
    item.as_node().copied().map(Some).ok_or_else(|| {
        MetapathError::type_error(format!("expected a node, got {}", item.type_signature()))
    })
}

// `/catalog/product[2]/@sku` style location path.
fn node_path<'a, N: ModelNode<'a>>(node: N) -> String {
    let mut segments = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        match n.kind() {
            NodeKind::Document => {}
            NodeKind::Flag => {
                if let Some(name) = n.name() {
                    segments.push(format!("@{}", name));
                }
            }
            _ => {
                if let Some(name) = n.name() {
                    segments.push(format!("{}[{}]", name, n.position()));
                }
            }
        }
        current = n.parent();
    }
    segments.reverse();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn function_argument<'a, 's, N: ModelNode<'a>>(
    seq: &'s Sequence<N>,
) -> Result<&'s crate::types::FunctionValue<N>, MetapathError> {
    let item = seq.singleton()?;
    item.as_function().ok_or_else(|| {
        MetapathError::type_error(format!(
            "expected a function, got {}",
            item.type_signature()
        ))
    })
}

fn unary_numeric<'a, N: ModelNode<'a>>(
    seq: &Sequence<N>,
    on_integer: fn(i64) -> Option<i64>,
    on_decimal: fn(Decimal) -> Decimal,
) -> Result<Sequence<N>, MetapathError> {
    let Some(value) = seq.atomized_singleton()? else {
        return Ok(Sequence::empty());
    };
    match &value {
        AtomicValue::Integer(i) => Ok(Sequence::from_atomic(match on_integer(*i) {
            Some(n) => AtomicValue::Integer(n),
            None => AtomicValue::Decimal(on_decimal(Decimal::from(*i))),
        })),
        AtomicValue::Decimal(d) => Ok(Sequence::from_atomic(AtomicValue::Decimal(on_decimal(
            *d,
        )))),
        AtomicValue::Untyped(_) => {
            let d = value.to_decimal().ok_or_else(|| {
                MetapathError::type_error(format!(
                    "'{}' is not numeric",
                    value.to_string_value()
                ))
            })?;
            Ok(Sequence::from_atomic(AtomicValue::Decimal(on_decimal(d))))
        }
        other => Err(MetapathError::type_error(format!(
            "expected a number, got {}",
            other.type_name()
        ))),
    }
}

// Rounds halves toward positive infinity: 2.5 -> 3, -2.5 -> -2.
fn round_half_up(d: Decimal) -> Decimal {
    (d + Decimal::new(5, 1)).floor()
}

fn decimal_result(d: Decimal, original: &AtomicValue) -> AtomicValue {
    if matches!(original, AtomicValue::Integer(_)) {
        d.to_i64()
            .map(AtomicValue::Integer)
            .unwrap_or(AtomicValue::Decimal(d))
    } else {
        AtomicValue::Decimal(d)
    }
}

fn sum_values(values: Vec<AtomicValue>) -> Result<AtomicValue, MetapathError> {
    use metapath_model::{DayTimeDuration, YearMonthDuration};

    if values
        .iter()
        .all(|v| matches!(v, AtomicValue::YearMonthDuration(_)))
    {
        let months = values
            .iter()
            .map(|v| match v {
                AtomicValue::YearMonthDuration(d) => d.months,
                _ => 0,
            })
            .sum();
        return Ok(AtomicValue::YearMonthDuration(YearMonthDuration::new(
            months,
        )));
    }
    if values
        .iter()
        .all(|v| matches!(v, AtomicValue::DayTimeDuration(_)))
    {
        let seconds = values
            .iter()
            .map(|v| match v {
                AtomicValue::DayTimeDuration(d) => d.seconds,
                _ => 0.0,
            })
            .sum();
        return Ok(AtomicValue::DayTimeDuration(DayTimeDuration::new(seconds)));
    }

    let mut all_integers = true;
    let mut total = Decimal::ZERO;
    for value in &values {
        if !matches!(value, AtomicValue::Integer(_)) {
            all_integers = false;
        }
        let d = value.to_decimal().ok_or_else(|| {
            MetapathError::type_error(format!("cannot sum {}", value.type_name()))
        })?;
        total += d;
    }
    if all_integers
        && let Some(i) = total.to_i64()
    {
        return Ok(AtomicValue::Integer(i));
    }
    Ok(AtomicValue::Decimal(total))
}

fn extreme<'a, N: ModelNode<'a>>(
    seq: &Sequence<N>,
    keep: std::cmp::Ordering,
) -> Result<Sequence<N>, MetapathError> {
    let values = seq.atomize()?;
    let mut best: Option<AtomicValue> = None;
    for value in values {
        // untyped values take part as numbers
        let value = match value {
            AtomicValue::Untyped(s) => AtomicValue::from_lexical(
                metapath_model::DataType::Decimal,
                &s,
            )?,
            other => other,
        };
        best = Some(match best {
            None => value,
            Some(current) => match value.partial_cmp(&current) {
                Some(ordering) if ordering == keep => value,
                Some(_) => current,
                None => {
                    return Err(MetapathError::type_error(format!(
                        "cannot compare {} with {}",
                        value.type_name(),
                        current.type_name()
                    )));
                }
            },
        });
    }
    Ok(best
        .map(Sequence::from_atomic)
        .unwrap_or_else(Sequence::empty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use metapath_model::TreeNode;
    use std::sync::Arc;

    type Seq = Sequence<TreeNode<'static>>;

    fn ctx() -> DynamicContext<TreeNode<'static>> {
        DynamicContext::new(Arc::new(StaticContext::new()))
    }

    fn run(local: &str, args: &[Seq]) -> Result<Seq, MetapathError> {
        call(local, args, &ctx(), &Focus::none())
    }

    fn strings(seq: &Seq) -> Vec<String> {
        seq.items().iter().map(|i| i.string_value()).collect()
    }

    #[test]
    fn test_substring_rounds_like_xpath() {
        let r = run(
            "substring",
            &[Seq::from_string("metadata"), Seq::from_integer(2), Seq::from_integer(4)],
        )
        .unwrap();
        assert_eq!(strings(&r), ["etad"]);
        let r = run("substring", &[Seq::from_string("metadata"), Seq::from_integer(5)]).unwrap();
        assert_eq!(strings(&r), ["data"]);
    }

    #[test]
    fn test_tokenize_default_splits_on_whitespace() {
        let r = run("tokenize", &[Seq::from_string("  a  b\tc ")]).unwrap();
        assert_eq!(strings(&r), ["a", "b", "c"]);
        let r = run(
            "tokenize",
            &[Seq::from_string("1,2,,3"), Seq::from_string(",")],
        )
        .unwrap();
        assert_eq!(strings(&r), ["1", "2", "", "3"]);
    }

    #[test]
    fn test_distinct_values_unifies_numeric_types() {
        let input: Seq = Sequence::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Decimal(Decimal::from(1))),
            Item::Atomic(AtomicValue::Integer(2)),
        ]);
        let r = run("distinct-values", &[input]).unwrap();
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_round_half_toward_positive() {
        let r = run(
            "round",
            &[Seq::from_atomic(AtomicValue::Decimal(Decimal::new(25, 1)))],
        )
        .unwrap();
        assert_eq!(strings(&r), ["3"]);
        let r = run(
            "round",
            &[Seq::from_atomic(AtomicValue::Decimal(Decimal::new(-25, 1)))],
        )
        .unwrap();
        assert_eq!(strings(&r), ["-2"]);
    }

    #[test]
    fn test_sum_and_avg() {
        let input: Seq = Sequence::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Integer(2)),
            Item::Atomic(AtomicValue::Integer(3)),
        ]);
        let r = run("sum", &[input.clone()]).unwrap();
        assert_eq!(r, Seq::from_integer(6));
        let r = run("sum", &[Seq::empty()]).unwrap();
        assert_eq!(r, Seq::from_integer(0));
        let r = run("avg", &[input]).unwrap();
        assert_eq!(
            r,
            Seq::from_atomic(AtomicValue::Decimal(Decimal::from(2)))
        );
    }

    #[test]
    fn test_min_max_reject_mixed_types() {
        let input: Seq = Sequence::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Boolean(true)),
        ]);
        assert!(run("min", &[input]).is_err());
    }

    #[test]
    fn test_position_requires_focus() {
        let err = run("position", &[]).unwrap_err();
        assert_eq!(err.code(), "XPDY0002");
    }

    #[test]
    fn test_index_of() {
        let input: Seq = Sequence::from_items(vec![
            Item::Atomic(AtomicValue::String("a".into())),
            Item::Atomic(AtomicValue::String("b".into())),
            Item::Atomic(AtomicValue::String("a".into())),
        ]);
        let r = run("index-of", &[input, Seq::from_string("a")]).unwrap();
        assert_eq!(strings(&r), ["1", "3"]);
    }
}
