//! The `array:` function group.

use crate::error::MetapathError;
use crate::types::{ArrayValue, Item, Sequence};
use metapath_model::ModelNode;

pub(super) fn call<'a, N: ModelNode<'a>>(
    local: &str,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, MetapathError> {
    match (local, args.len()) {
        ("size", 1) => Ok(Sequence::from_integer(
            array_argument(&args[0])?.size() as i64
        )),
        ("get", 2) => {
            let array = array_argument(&args[0])?;
            array.get(index_argument(&args[1])?).cloned()
        }
        ("put", 3) => {
            let array = array_argument(&args[0])?;
            array
                .put(index_argument(&args[1])?, args[2].clone())
                .map(|a| Sequence::from_item(Item::Array(a)))
        }
        ("append", 2) => {
            let array = array_argument(&args[0])?;
            Ok(Sequence::from_item(Item::Array(
                array.append(args[1].clone()),
            )))
        }
        ("subarray", 2 | 3) => {
            let array = array_argument(&args[0])?;
            let start = index_argument(&args[1])?;
            let length = match args.get(2) {
                Some(len) => index_argument(len)?,
                None => array.size() as i64 - start + 1,
            };
            array
                .subarray(start, length)
                .map(|a| Sequence::from_item(Item::Array(a)))
        }
        ("remove", 2) => {
            let array = array_argument(&args[0])?;
            array
                .remove(index_argument(&args[1])?)
                .map(|a| Sequence::from_item(Item::Array(a)))
        }
        ("insert-before", 3) => {
            let array = array_argument(&args[0])?;
            array
                .insert_before(index_argument(&args[1])?, args[2].clone())
                .map(|a| Sequence::from_item(Item::Array(a)))
        }
        ("head", 1) => {
            let array = array_argument(&args[0])?;
            array.get(1).cloned()
        }
        ("tail", 1) => {
            let array = array_argument(&args[0])?;
            array
                .remove(1)
                .map(|a| Sequence::from_item(Item::Array(a)))
        }
        ("reverse", 1) => Ok(Sequence::from_item(Item::Array(
            array_argument(&args[0])?.reversed(),
        ))),
        ("join", 1) => {
            let mut members = Vec::new();
            for item in args[0].items() {
                let array = item.as_array().ok_or_else(|| {
                    MetapathError::type_error(format!(
                        "array:join expects arrays, got {}",
                        item.type_signature()
                    ))
                })?;
                members.extend(array.members().iter().cloned());
            }
            Ok(Sequence::from_item(Item::Array(ArrayValue::new(members))))
        }
        ("flatten", 1) => {
            let mut out = Vec::new();
            for item in args[0].items() {
                flatten_into(item, &mut out);
            }
            Ok(Sequence::from_items(out))
        }
        (local, arity) => Err(MetapathError::UnknownFunction {
            name: format!("array:{}", local),
            arity,
        }),
    }
}

fn flatten_into<'a, N: ModelNode<'a>>(item: &Item<N>, out: &mut Vec<Item<N>>) {
    match item {
        Item::Array(array) => {
            for member in array.members() {
                for item in member.items() {
                    flatten_into(item, out);
                }
            }
        }
        other => out.push(other.clone()),
    }
}

fn array_argument<'a, 's, N: ModelNode<'a>>(
    seq: &'s Sequence<N>,
) -> Result<&'s ArrayValue<N>, MetapathError> {
    let item = seq.singleton()?;
    item.as_array().ok_or_else(|| {
        MetapathError::type_error(format!("expected an array, got {}", item.type_signature()))
    })
}

fn index_argument<'a, N: ModelNode<'a>>(seq: &Sequence<N>) -> Result<i64, MetapathError> {
    seq.atomized_singleton()?
        .and_then(|v| v.to_integer())
        .ok_or_else(|| MetapathError::type_error("expected a single integer"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metapath_model::TreeNode;

    type Seq = Sequence<TreeNode<'static>>;

    fn sample() -> Seq {
        Sequence::from_item(Item::Array(ArrayValue::new(vec![
            Sequence::from_integer(1),
            Sequence::from_integer(2),
            Sequence::from_integer(3),
        ])))
    }

    #[test]
    fn test_get_out_of_bounds() {
        let err = call("get", &[sample(), Seq::from_integer(4)]).unwrap_err();
        assert_eq!(err.code(), "FOAY0001");
    }

    #[test]
    fn test_subarray_default_length() {
        let r = call("subarray", &[sample(), Seq::from_integer(2)]).unwrap();
        let array = r.items()[0].as_array().unwrap();
        assert_eq!(array.size(), 2);
        assert_eq!(array.get(1).unwrap(), &Sequence::from_integer(2));
    }

    #[test]
    fn test_flatten_recurses() {
        let nested: Seq = Sequence::from_item(Item::Array(ArrayValue::new(vec![
            Sequence::from_integer(1),
            sample(),
        ])));
        let r = call("flatten", &[nested]).unwrap();
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn test_join() {
        let input: Seq = Sequence::from_items(vec![
            sample().items()[0].clone(),
            sample().items()[0].clone(),
        ]);
        let r = call("join", &[input]).unwrap();
        assert_eq!(r.items()[0].as_array().unwrap().size(), 6);
    }
}
