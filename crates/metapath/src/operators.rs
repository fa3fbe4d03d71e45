//! Value-level semantics of the binary operators and casts.
//!
//! Arithmetic and comparison are defined over atomized singletons; an empty
//! operand makes the whole operation empty. Every supported operand pairing
//! is dispatched explicitly, so an unsupported pairing fails with the
//! operator and both type names in the message.

use crate::ast::{ArithmeticOp, ComparisonOp};
use crate::error::MetapathError;
use crate::types::Sequence;
use metapath_model::AtomicValue as A;
use metapath_model::{AtomicValue, DataType, DayTimeDuration, ModelNode, YearMonthDuration};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::cmp::Ordering;

pub fn arithmetic<'a, N: ModelNode<'a>>(
    op: ArithmeticOp,
    left: &Sequence<N>,
    right: &Sequence<N>,
) -> Result<Sequence<N>, MetapathError> {
    let (Some(a), Some(b)) = (left.atomized_singleton()?, right.atomized_singleton()?) else {
        return Ok(Sequence::empty());
    };
    let a = coerce_untyped_numeric(a)?;
    let b = coerce_untyped_numeric(b)?;
    apply_arithmetic(op, a, b).map(Sequence::from_atomic)
}

pub fn negate<'a, N: ModelNode<'a>>(
    operand: &Sequence<N>,
) -> Result<Sequence<N>, MetapathError> {
    let Some(value) = operand.atomized_singleton()? else {
        return Ok(Sequence::empty());
    };
    match coerce_untyped_numeric(value)? {
        A::Integer(i) => Ok(Sequence::from_atomic(match i.checked_neg() {
            Some(n) => A::Integer(n),
            None => A::Decimal(-Decimal::from(i)),
        })),
        A::Decimal(d) => Ok(Sequence::from_atomic(A::Decimal(-d))),
        other => Err(MetapathError::type_error(format!(
            "cannot negate {}",
            other.type_name()
        ))),
    }
}

// Untyped operands act as numbers in arithmetic.
fn coerce_untyped_numeric(value: AtomicValue) -> Result<AtomicValue, MetapathError> {
    match value {
        A::Untyped(s) => {
            AtomicValue::from_lexical(DataType::Decimal, &s).map_err(MetapathError::from)
        }
        other => Ok(other),
    }
}

fn apply_arithmetic(
    op: ArithmeticOp,
    a: AtomicValue,
    b: AtomicValue,
) -> Result<AtomicValue, MetapathError> {
    use ArithmeticOp::*;

    match (op, a, b) {
        // date/time plus-minus durations
        (Add, A::Date(d), A::YearMonthDuration(dur))
        | (Add, A::YearMonthDuration(dur), A::Date(d)) => Ok(A::Date(d.add_months(dur.months))),
        (Subtract, A::Date(d), A::YearMonthDuration(dur)) => {
            Ok(A::Date(d.add_months(-dur.months)))
        }
        (Add, A::Date(d), A::DayTimeDuration(dur))
        | (Add, A::DayTimeDuration(dur), A::Date(d)) => Ok(A::Date(d.add_seconds(dur.seconds))),
        (Subtract, A::Date(d), A::DayTimeDuration(dur)) => {
            Ok(A::Date(d.add_seconds(-dur.seconds)))
        }
        (Add, A::DateTime(d), A::YearMonthDuration(dur))
        | (Add, A::YearMonthDuration(dur), A::DateTime(d)) => {
            Ok(A::DateTime(d.add_months(dur.months)))
        }
        (Subtract, A::DateTime(d), A::YearMonthDuration(dur)) => {
            Ok(A::DateTime(d.add_months(-dur.months)))
        }
        (Add, A::DateTime(d), A::DayTimeDuration(dur))
        | (Add, A::DayTimeDuration(dur), A::DateTime(d)) => {
            Ok(A::DateTime(d.add_seconds(dur.seconds)))
        }
        (Subtract, A::DateTime(d), A::DayTimeDuration(dur)) => {
            Ok(A::DateTime(d.add_seconds(-dur.seconds)))
        }
        (Add, A::Time(t), A::DayTimeDuration(dur))
        | (Add, A::DayTimeDuration(dur), A::Time(t)) => Ok(A::Time(t.add_seconds(dur.seconds))),
        (Subtract, A::Time(t), A::DayTimeDuration(dur)) => {
            Ok(A::Time(t.add_seconds(-dur.seconds)))
        }

        // differences between temporal values
        (Subtract, A::Date(x), A::Date(y)) => Ok(A::DayTimeDuration(DayTimeDuration::new(
            x.epoch_seconds() - y.epoch_seconds(),
        ))),
        (Subtract, A::DateTime(x), A::DateTime(y)) => Ok(A::DayTimeDuration(
            DayTimeDuration::new(x.epoch_seconds() - y.epoch_seconds()),
        )),
        (Subtract, A::Time(x), A::Time(y)) => Ok(A::DayTimeDuration(DayTimeDuration::new(
            time_seconds(&x) - time_seconds(&y),
        ))),

        // duration against duration
        (Add, A::YearMonthDuration(x), A::YearMonthDuration(y)) => Ok(A::YearMonthDuration(
            YearMonthDuration::new(x.months + y.months),
        )),
        (Subtract, A::YearMonthDuration(x), A::YearMonthDuration(y)) => Ok(
            A::YearMonthDuration(YearMonthDuration::new(x.months - y.months)),
        ),
        (Add, A::DayTimeDuration(x), A::DayTimeDuration(y)) => Ok(A::DayTimeDuration(
            DayTimeDuration::new(x.seconds + y.seconds),
        )),
        (Subtract, A::DayTimeDuration(x), A::DayTimeDuration(y)) => Ok(A::DayTimeDuration(
            DayTimeDuration::new(x.seconds - y.seconds),
        )),
        (Divide, A::YearMonthDuration(x), A::YearMonthDuration(y)) => {
            if y.months == 0 {
                return Err(MetapathError::DivisionByZero);
            }
            Ok(A::Decimal(Decimal::from(x.months) / Decimal::from(y.months)))
        }
        (Divide, A::DayTimeDuration(x), A::DayTimeDuration(y)) => {
            if y.seconds == 0.0 {
                return Err(MetapathError::DivisionByZero);
            }
            decimal_from_f64(x.seconds / y.seconds).map(A::Decimal)
        }

        // duration scaled by a number
        (Multiply, A::YearMonthDuration(dur), n) | (Multiply, n, A::YearMonthDuration(dur))
            if n.is_numeric() =>
        {
            Ok(A::YearMonthDuration(YearMonthDuration::new(
                (dur.months as f64 * n.to_double()).round() as i64,
            )))
        }
        (Divide, A::YearMonthDuration(dur), n) if n.is_numeric() => {
            let divisor = n.to_double();
            if divisor == 0.0 {
                return Err(MetapathError::DivisionByZero);
            }
            Ok(A::YearMonthDuration(YearMonthDuration::new(
                (dur.months as f64 / divisor).round() as i64,
            )))
        }
        (Multiply, A::DayTimeDuration(dur), n) | (Multiply, n, A::DayTimeDuration(dur))
            if n.is_numeric() =>
        {
            Ok(A::DayTimeDuration(DayTimeDuration::new(
                dur.seconds * n.to_double(),
            )))
        }
        (Divide, A::DayTimeDuration(dur), n) if n.is_numeric() => {
            let divisor = n.to_double();
            if divisor == 0.0 {
                return Err(MetapathError::DivisionByZero);
            }
            Ok(A::DayTimeDuration(DayTimeDuration::new(
                dur.seconds / divisor,
            )))
        }

        // integer fast paths, promoting to decimal on overflow
        (Add, A::Integer(x), A::Integer(y)) => Ok(match x.checked_add(y) {
            Some(n) => A::Integer(n),
            None => A::Decimal(Decimal::from(x) + Decimal::from(y)),
        }),
        (Subtract, A::Integer(x), A::Integer(y)) => Ok(match x.checked_sub(y) {
            Some(n) => A::Integer(n),
            None => A::Decimal(Decimal::from(x) - Decimal::from(y)),
        }),
        (Multiply, A::Integer(x), A::Integer(y)) => Ok(match x.checked_mul(y) {
            Some(n) => A::Integer(n),
            None => A::Decimal(Decimal::from(x) * Decimal::from(y)),
        }),
        (IntegerDivide, A::Integer(x), A::Integer(y)) => {
            if y == 0 {
                return Err(MetapathError::DivisionByZero);
            }
            match x.checked_div(y) {
                Some(n) => Ok(A::Integer(n)),
                None => Ok(A::Decimal((Decimal::from(x) / Decimal::from(y)).trunc())),
            }
        }
        (Modulo, A::Integer(x), A::Integer(y)) => {
            if y == 0 {
                return Err(MetapathError::DivisionByZero);
            }
            Ok(A::Integer(x.wrapping_rem(y)))
        }

        // general numeric arithmetic over decimals
        (op, x, y) if x.is_numeric() && y.is_numeric() => {
            let x = x.to_decimal().unwrap_or_default();
            let y = y.to_decimal().unwrap_or_default();
            match op {
                Add => x.checked_add(y).map(A::Decimal).ok_or_else(|| overflow("+")),
                Subtract => x.checked_sub(y).map(A::Decimal).ok_or_else(|| overflow("-")),
                Multiply => x.checked_mul(y).map(A::Decimal).ok_or_else(|| overflow("*")),
                Divide => {
                    if y.is_zero() {
                        return Err(MetapathError::DivisionByZero);
                    }
                    x.checked_div(y).map(A::Decimal).ok_or_else(|| overflow("div"))
                }
                IntegerDivide => {
                    if y.is_zero() {
                        return Err(MetapathError::DivisionByZero);
                    }
                    let q = (x / y).trunc();
                    Ok(q.to_i64().map(A::Integer).unwrap_or(A::Decimal(q)))
                }
                Modulo => {
                    if y.is_zero() {
                        return Err(MetapathError::DivisionByZero);
                    }
                    Ok(A::Decimal(x - y * (x / y).trunc()))
                }
            }
        }

        (op, x, y) => Err(MetapathError::UnsupportedOperation {
            operator: operator_symbol(op).to_string(),
            left: x.type_name().to_string(),
            right: y.type_name().to_string(),
        }),
    }
}

fn time_seconds(t: &metapath_model::Time) -> f64 {
    t.seconds_of_day()
        - t.timezone
            .map(|z| z.offset_minutes as f64 * 60.0)
            .unwrap_or(0.0)
}

fn overflow(operator: &str) -> MetapathError {
    MetapathError::type_error(format!("decimal overflow in '{}'", operator))
}

fn operator_symbol(op: ArithmeticOp) -> &'static str {
    match op {
        ArithmeticOp::Add => "+",
        ArithmeticOp::Subtract => "-",
        ArithmeticOp::Multiply => "*",
        ArithmeticOp::Divide => "div",
        ArithmeticOp::IntegerDivide => "idiv",
        ArithmeticOp::Modulo => "mod",
    }
}

fn decimal_from_f64(value: f64) -> Result<Decimal, MetapathError> {
    Decimal::from_f64(value)
        .ok_or_else(|| MetapathError::type_error(format!("{} is not a valid decimal", value)))
}

/// `eq ne lt le gt ge`: singleton against singleton, empty when either
/// operand is empty.
pub fn value_compare<'a, N: ModelNode<'a>>(
    op: ComparisonOp,
    left: &Sequence<N>,
    right: &Sequence<N>,
) -> Result<Sequence<N>, MetapathError> {
    let (Some(a), Some(b)) = (left.atomized_singleton()?, right.atomized_singleton()?) else {
        return Ok(Sequence::empty());
    };
    compare_atomics(op, &a, &b).map(Sequence::from_bool)
}

/// `= != < <= > >=`: existential over every pair drawn from the two
/// atomized operands, with untyped values coerced to the other side's type.
pub fn general_compare<'a, N: ModelNode<'a>>(
    op: ComparisonOp,
    left: &Sequence<N>,
    right: &Sequence<N>,
) -> Result<Sequence<N>, MetapathError> {
    let lhs = left.atomize()?;
    let rhs = right.atomize()?;
    for a in &lhs {
        for b in &rhs {
            let (a, b) = coerce_pair(a.clone(), b.clone())?;
            if compare_atomics(op, &a, &b)? {
                return Ok(Sequence::from_bool(true));
            }
        }
    }
    Ok(Sequence::from_bool(false))
}

fn coerce_pair(
    a: AtomicValue,
    b: AtomicValue,
) -> Result<(AtomicValue, AtomicValue), MetapathError> {
    match (&a, &b) {
        (A::Untyped(_), A::Untyped(_)) => Ok((a, b)),
        (A::Untyped(s), other) => {
            let coerced = coerce_untyped_to(s, other)?;
            Ok((coerced, b))
        }
        (other, A::Untyped(s)) => {
            let coerced = coerce_untyped_to(s, other)?;
            Ok((a, coerced))
        }
        _ => Ok((a, b)),
    }
}

fn coerce_untyped_to(text: &str, other: &AtomicValue) -> Result<AtomicValue, MetapathError> {
    let target = if other.is_numeric() {
        DataType::Decimal
    } else {
        other.data_type()
    };
    AtomicValue::from_lexical(target, text).map_err(MetapathError::from)
}

fn compare_atomics(
    op: ComparisonOp,
    a: &AtomicValue,
    b: &AtomicValue,
) -> Result<bool, MetapathError> {
    match op {
        ComparisonOp::Eq | ComparisonOp::Ne => {
            if !equality_comparable(a, b) {
                return Err(incomparable(a, b));
            }
            let eq = a == b;
            Ok(if op == ComparisonOp::Eq { eq } else { !eq })
        }
        _ => match a.partial_cmp(b) {
            Some(ordering) => Ok(match op {
                ComparisonOp::Lt => ordering == Ordering::Less,
                ComparisonOp::Le => ordering != Ordering::Greater,
                ComparisonOp::Gt => ordering == Ordering::Greater,
                ComparisonOp::Ge => ordering != Ordering::Less,
                ComparisonOp::Eq | ComparisonOp::Ne => unreachable!(),
            }),
            None => Err(incomparable(a, b)),
        },
    }
}

fn equality_comparable(a: &AtomicValue, b: &AtomicValue) -> bool {
    matches!(
        (a, b),
        (A::String(_) | A::Untyped(_), A::String(_) | A::Untyped(_))
            | (A::Boolean(_), A::Boolean(_))
            | (A::Integer(_) | A::Decimal(_), A::Integer(_) | A::Decimal(_))
            | (A::Date(_), A::Date(_))
            | (A::DateTime(_), A::DateTime(_))
            | (A::Time(_), A::Time(_))
            | (A::YearMonthDuration(_), A::YearMonthDuration(_))
            | (A::DayTimeDuration(_), A::DayTimeDuration(_))
            | (A::Base64(_), A::Base64(_))
            | (A::Uri(_), A::Uri(_))
            | (A::Uuid(_), A::Uuid(_))
            | (A::IpV4(_), A::IpV4(_))
            | (A::IpV6(_), A::IpV6(_))
    )
}

fn incomparable(a: &AtomicValue, b: &AtomicValue) -> MetapathError {
    MetapathError::type_error(format!(
        "cannot compare {} with {}",
        a.type_name(),
        b.type_name()
    ))
}

/// `cast as` over a single atomic value.
pub fn cast_atomic(value: &AtomicValue, target: DataType) -> Result<AtomicValue, MetapathError> {
    if value.data_type() == target {
        return Ok(value.clone());
    }
    let invalid = || MetapathError::InvalidCast {
        from_type: value.type_name().to_string(),
        to_type: target.name().to_string(),
        value: value.to_string_value(),
    };
    match (value, target) {
        // every value has a string form
        (_, DataType::String) => Ok(A::String(value.to_string_value())),
        // strings and untyped go through the lexical space of the target
        (A::String(s) | A::Untyped(s), _) => {
            AtomicValue::from_lexical(target, s).map_err(|_| invalid())
        }
        (A::Integer(i), DataType::Decimal) => Ok(A::Decimal(Decimal::from(*i))),
        (A::Decimal(d), DataType::Integer) => {
            d.trunc().to_i64().map(A::Integer).ok_or_else(invalid)
        }
        (A::Integer(i), DataType::NonNegativeInteger) if *i >= 0 => Ok(A::Integer(*i)),
        (A::Integer(i), DataType::PositiveInteger) if *i > 0 => Ok(A::Integer(*i)),
        (A::Boolean(b), DataType::Integer) => Ok(A::Integer(if *b { 1 } else { 0 })),
        (A::Boolean(b), DataType::Decimal) => {
            Ok(A::Decimal(Decimal::from(if *b { 1 } else { 0 })))
        }
        (A::Integer(i), DataType::Boolean) => Ok(A::Boolean(*i != 0)),
        (A::Decimal(d), DataType::Boolean) => Ok(A::Boolean(!d.is_zero())),
        (A::DateTime(dt), DataType::Date) => Ok(A::Date(dt.date())),
        (A::DateTime(dt), DataType::Time) => Ok(A::Time(dt.time())),
        (A::Uri(u), DataType::UriReference) => Ok(A::Uri(u.clone())),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metapath_model::{Date, TreeNode};

    type Seq = Sequence<TreeNode<'static>>;

    fn int(i: i64) -> Seq {
        Sequence::from_integer(i)
    }

    fn atomic(v: AtomicValue) -> Seq {
        Sequence::from_atomic(v)
    }

    fn date(s: &str) -> AtomicValue {
        A::Date(Date::parse(s).unwrap())
    }

    fn ymd(s: &str) -> AtomicValue {
        A::YearMonthDuration(YearMonthDuration::parse(s).unwrap())
    }

    fn dtd(s: &str) -> AtomicValue {
        A::DayTimeDuration(DayTimeDuration::parse(s).unwrap())
    }

    #[test]
    fn test_integer_arithmetic() {
        let r = arithmetic(ArithmeticOp::Add, &int(2), &int(3)).unwrap();
        assert_eq!(r, int(5));
        let r = arithmetic(ArithmeticOp::Multiply, &int(4), &int(-3)).unwrap();
        assert_eq!(r, int(-12));
        let r = arithmetic(ArithmeticOp::IntegerDivide, &int(7), &int(2)).unwrap();
        assert_eq!(r, int(3));
        let r = arithmetic(ArithmeticOp::IntegerDivide, &int(-7), &int(2)).unwrap();
        assert_eq!(r, int(-3));
        let r = arithmetic(ArithmeticOp::Modulo, &int(7), &int(-2)).unwrap();
        assert_eq!(r, int(1));
    }

    #[test]
    fn test_division_yields_decimal() {
        let r = arithmetic(ArithmeticOp::Divide, &int(7), &int(2)).unwrap();
        assert_eq!(r, atomic(A::Decimal(Decimal::new(35, 1))));
        assert!(matches!(
            arithmetic::<TreeNode>(ArithmeticOp::Divide, &int(1), &int(0)),
            Err(MetapathError::DivisionByZero)
        ));
    }

    #[test]
    fn test_integer_overflow_promotes() {
        let r = arithmetic(ArithmeticOp::Add, &int(i64::MAX), &int(1)).unwrap();
        let A::Decimal(d) = r.atomized_singleton().unwrap().unwrap() else {
            panic!("expected decimal promotion");
        };
        assert_eq!(d, Decimal::from(i64::MAX) + Decimal::from(1));
    }

    #[test]
    fn test_empty_operand_is_empty() {
        let r = arithmetic(ArithmeticOp::Add, &int(1), &Seq::empty()).unwrap();
        assert!(r.is_empty());
        let r = value_compare(ComparisonOp::Eq, &Seq::empty(), &int(1)).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn test_date_minus_date() {
        let r = arithmetic(
            ArithmeticOp::Subtract,
            &atomic(date("2025-01-03")),
            &atomic(date("2025-01-01")),
        )
        .unwrap();
        assert_eq!(r, atomic(dtd("P2D")));
    }

    #[test]
    fn test_date_plus_year_month_duration() {
        let r = arithmetic(
            ArithmeticOp::Add,
            &atomic(date("2024-01-31")),
            &atomic(ymd("P1M")),
        )
        .unwrap();
        // day clamps to the shorter month
        assert_eq!(r, atomic(date("2024-02-29")));
    }

    #[test]
    fn test_mismatched_durations_rejected() {
        let err = arithmetic::<TreeNode>(
            ArithmeticOp::Add,
            &atomic(ymd("P1Y")),
            &atomic(dtd("P1D")),
        )
        .unwrap_err();
        assert_eq!(err.code(), "FORG0006");
    }

    #[test]
    fn test_duration_scaling() {
        let r = arithmetic(ArithmeticOp::Multiply, &atomic(dtd("PT1H")), &int(3)).unwrap();
        assert_eq!(r, atomic(dtd("PT3H")));
        let r = arithmetic(ArithmeticOp::Divide, &atomic(ymd("P2Y")), &atomic(ymd("P6M")))
            .unwrap();
        assert_eq!(r, atomic(A::Decimal(Decimal::from(4))));
    }

    #[test]
    fn test_value_comparison() {
        let r = value_compare(ComparisonOp::Lt, &int(1), &int(2)).unwrap();
        assert_eq!(r, Seq::from_bool(true));
        let r = value_compare(
            ComparisonOp::Eq,
            &Seq::from_string("a"),
            &Seq::from_string("a"),
        )
        .unwrap();
        assert_eq!(r, Seq::from_bool(true));
        assert!(value_compare(ComparisonOp::Eq, &int(1), &Seq::from_string("1")).is_err());
    }

    #[test]
    fn test_general_comparison_is_existential() {
        let many: Seq = Sequence::from_items(vec![
            crate::types::Item::Atomic(A::Integer(1)),
            crate::types::Item::Atomic(A::Integer(5)),
        ]);
        let r = general_compare(ComparisonOp::Eq, &many, &int(5)).unwrap();
        assert_eq!(r, Seq::from_bool(true));
        let r = general_compare(ComparisonOp::Gt, &many, &int(9)).unwrap();
        assert_eq!(r, Seq::from_bool(false));
    }

    #[test]
    fn test_general_comparison_coerces_untyped() {
        let untyped = atomic(A::Untyped("10".to_string()));
        let r = general_compare(ComparisonOp::Eq, &untyped, &int(10)).unwrap();
        assert_eq!(r, Seq::from_bool(true));
    }

    #[test]
    fn test_casts() {
        let r = cast_atomic(&A::String("1234567".into()), DataType::Integer).unwrap();
        assert_eq!(r, A::Integer(1234567));
        let r = cast_atomic(&A::Integer(42), DataType::String).unwrap();
        assert_eq!(r, A::String("42".into()));
        let r = cast_atomic(&A::String("true".into()), DataType::Boolean).unwrap();
        assert_eq!(r, A::Boolean(true));
        let err = cast_atomic(&A::String("not a date".into()), DataType::Date).unwrap_err();
        assert_eq!(err.code(), "FOCA0002");
    }
}
