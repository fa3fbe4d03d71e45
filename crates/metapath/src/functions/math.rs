//! The `math:` function group. Computed over f64 and re-expressed as
//! decimals, which bounds precision to what f64 carries.

use crate::error::MetapathError;
use crate::types::Sequence;
use metapath_model::{AtomicValue, ModelNode};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

pub(super) fn call<'a, N: ModelNode<'a>>(
    local: &str,
    args: &[Sequence<N>],
) -> Result<Sequence<N>, MetapathError> {
    match (local, args.len()) {
        ("pi", 0) => decimal(std::f64::consts::PI),
        ("sqrt", 1) => unary(local, &args[0], f64::sqrt),
        ("exp", 1) => unary(local, &args[0], f64::exp),
        ("log", 1) => unary(local, &args[0], f64::ln),
        ("log10", 1) => unary(local, &args[0], f64::log10),
        ("sin", 1) => unary(local, &args[0], f64::sin),
        ("cos", 1) => unary(local, &args[0], f64::cos),
        ("tan", 1) => unary(local, &args[0], f64::tan),
        ("pow", 2) => {
            let (Some(base), Some(exponent)) =
                (args[0].atomized_singleton()?, args[1].atomized_singleton()?)
            else {
                return Ok(Sequence::empty());
            };
            decimal(base.to_double().powf(exponent.to_double()))
        }
        (local, arity) => Err(MetapathError::UnknownFunction {
            name: format!("math:{}", local),
            arity,
        }),
    }
}

fn unary<'a, N: ModelNode<'a>>(
    local: &str,
    arg: &Sequence<N>,
    f: fn(f64) -> f64,
) -> Result<Sequence<N>, MetapathError> {
    let Some(value) = arg.atomized_singleton()? else {
        return Ok(Sequence::empty());
    };
    let result = f(value.to_double());
    if result.is_nan() || result.is_infinite() {
        return Err(MetapathError::function(
            format!("math:{}", local),
            format!("no decimal result for {}", value.to_string_value()),
        ));
    }
    decimal(result)
}

fn decimal<'a, N: ModelNode<'a>>(value: f64) -> Result<Sequence<N>, MetapathError> {
    Decimal::from_f64(value)
        .map(|d| Sequence::from_atomic(AtomicValue::Decimal(d)))
        .ok_or_else(|| {
            MetapathError::type_error(format!("{} is not representable as a decimal", value))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use metapath_model::TreeNode;

    type Seq = Sequence<TreeNode<'static>>;

    #[test]
    fn test_sqrt() {
        let r = call("sqrt", &[Seq::from_integer(9)]).unwrap();
        assert_eq!(r, Seq::from_atomic(AtomicValue::Decimal(9f64.sqrt().try_into().unwrap())));
        assert!(call("sqrt", &[Seq::from_integer(-1)]).is_err());
    }

    #[test]
    fn test_pow() {
        let r = call("pow", &[Seq::from_integer(2), Seq::from_integer(10)]).unwrap();
        assert_eq!(
            r.atomized_singleton().unwrap().unwrap().to_integer(),
            Some(1024)
        );
    }

    #[test]
    fn test_empty_argument_is_empty() {
        let r = call("sin", &[Seq::empty()]).unwrap();
        assert!(r.is_empty());
    }
}
