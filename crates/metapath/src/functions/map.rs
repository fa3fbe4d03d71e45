//! The `map:` function group.

use crate::context::DynamicContext;
use crate::error::MetapathError;
use crate::types::{Item, MapValue, Sequence};
use metapath_model::{AtomicValue, ModelNode};

pub(super) fn call<'a, N: ModelNode<'a>>(
    local: &str,
    args: &[Sequence<N>],
    _ctx: &DynamicContext<N>,
) -> Result<Sequence<N>, MetapathError> {
    match (local, args.len()) {
        ("size", 1) => Ok(Sequence::from_integer(map_argument(&args[0])?.size() as i64)),
        ("keys", 1) => Ok(Sequence::from_items(
            map_argument(&args[0])?
                .keys()
                .cloned()
                .map(Item::Atomic)
                .collect(),
        )),
        ("contains", 2) => {
            let map = map_argument(&args[0])?;
            let key = key_argument(&args[1])?;
            Ok(Sequence::from_bool(map.contains(&key)))
        }
        ("get", 2) => {
            let map = map_argument(&args[0])?;
            let key = key_argument(&args[1])?;
            Ok(map.get(&key).cloned().unwrap_or_else(Sequence::empty))
        }
        ("put", 3) => {
            let map = map_argument(&args[0])?;
            let key = key_argument(&args[1])?;
            Ok(Sequence::from_item(Item::Map(
                map.put(key, args[2].clone()),
            )))
        }
        ("remove", 2) => {
            let map = map_argument(&args[0])?;
            let key = key_argument(&args[1])?;
            Ok(Sequence::from_item(Item::Map(map.remove(&key))))
        }
        ("entry", 2) => {
            let key = key_argument(&args[0])?;
            let mut map = MapValue::new();
            map.insert(key, args[1].clone());
            Ok(Sequence::from_item(Item::Map(map)))
        }
        // duplicate keys resolve to the first map that defines them
        ("merge", 1) => {
            let mut merged = MapValue::new();
            for item in args[0].items() {
                let map = item.as_map().ok_or_else(|| {
                    MetapathError::type_error(format!(
                        "map:merge expects maps, got {}",
                        item.type_signature()
                    ))
                })?;
                for (key, value) in map.entries() {
                    if !merged.contains(key) {
                        merged.insert(key.clone(), value.clone());
                    }
                }
            }
            Ok(Sequence::from_item(Item::Map(merged)))
        }
        (local, arity) => Err(MetapathError::UnknownFunction {
            name: format!("map:{}", local),
            arity,
        }),
    }
}

fn map_argument<'a, 's, N: ModelNode<'a>>(
    seq: &'s Sequence<N>,
) -> Result<&'s MapValue<N>, MetapathError> {
    let item = seq.singleton()?;
    item.as_map().ok_or_else(|| {
        MetapathError::type_error(format!("expected a map, got {}", item.type_signature()))
    })
}

fn key_argument<'a, N: ModelNode<'a>>(
    seq: &Sequence<N>,
) -> Result<AtomicValue, MetapathError> {
    seq.atomized_singleton()?
        .ok_or_else(|| MetapathError::type_error("map key must be a single atomic value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use metapath_model::TreeNode;
    use std::sync::Arc;

    type Seq = Sequence<TreeNode<'static>>;

    fn run(local: &str, args: &[Seq]) -> Result<Seq, MetapathError> {
        call(local, args, &DynamicContext::new(Arc::new(StaticContext::new())))
    }

    fn sample() -> Seq {
        let mut map = MapValue::new();
        map.insert(AtomicValue::String("a".into()), Sequence::from_integer(1));
        map.insert(AtomicValue::String("b".into()), Sequence::from_integer(2));
        Sequence::from_item(Item::Map(map))
    }

    #[test]
    fn test_get_and_contains() {
        let r = run("get", &[sample(), Seq::from_string("a")]).unwrap();
        assert_eq!(r, Seq::from_integer(1));
        let r = run("get", &[sample(), Seq::from_string("z")]).unwrap();
        assert!(r.is_empty());
        let r = run("contains", &[sample(), Seq::from_string("b")]).unwrap();
        assert_eq!(r, Seq::from_bool(true));
    }

    #[test]
    fn test_put_leaves_original_untouched() {
        let original = sample();
        let r = run(
            "put",
            &[original.clone(), Seq::from_string("c"), Seq::from_integer(3)],
        )
        .unwrap();
        let updated = r.items()[0].as_map().unwrap();
        assert_eq!(updated.size(), 3);
        assert_eq!(original.items()[0].as_map().unwrap().size(), 2);
    }

    #[test]
    fn test_merge_keeps_first_binding() {
        let mut other = MapValue::new();
        other.insert(AtomicValue::String("a".into()), Sequence::from_integer(9));
        other.insert(AtomicValue::String("c".into()), Sequence::from_integer(3));
        let input: Seq = Sequence::from_items(vec![
            sample().items()[0].clone(),
            Item::Map(other),
        ]);
        let r = run("merge", &[input]).unwrap();
        let merged = r.items()[0].as_map().unwrap();
        assert_eq!(merged.size(), 3);
        assert_eq!(
            merged.get(&AtomicValue::String("a".into())),
            Some(&Sequence::from_integer(1))
        );
    }
}
