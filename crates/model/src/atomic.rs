//! The runtime atomic value model.
//!
//! Each variant wraps a native representation; the declared data type of a
//! value is recovered through [`AtomicValue::data_type`]. Values for derived
//! types (`token`, `non-negative-integer`, ...) are validated on construction
//! and carried in their base representation.

use crate::datatype::DataType;
use crate::error::ModelError;
use crate::temporal::{Date, DateTime, DayTimeDuration, Time, YearMonthDuration};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::LazyLock;

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("BUG: invalid UUID_RE regex literal")
});

static BASE64_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+/\s]*={0,2}$").expect("BUG: invalid BASE64_RE regex literal")
});

#[derive(Debug, Clone)]
pub enum AtomicValue {
    String(String),
    Untyped(String),
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    Date(Date),
    DateTime(DateTime),
    Time(Time),
    YearMonthDuration(YearMonthDuration),
    DayTimeDuration(DayTimeDuration),
    Base64(String),
    Uri(String),
    Uuid(String),
    IpV4(Ipv4Addr),
    IpV6(Ipv6Addr),
}

impl AtomicValue {
    pub fn data_type(&self) -> DataType {
        match self {
            AtomicValue::String(_) => DataType::String,
            AtomicValue::Untyped(_) => DataType::Untyped,
            AtomicValue::Boolean(_) => DataType::Boolean,
            AtomicValue::Integer(_) => DataType::Integer,
            AtomicValue::Decimal(_) => DataType::Decimal,
            AtomicValue::Date(_) => DataType::Date,
            AtomicValue::DateTime(_) => DataType::DateTime,
            AtomicValue::Time(_) => DataType::Time,
            AtomicValue::YearMonthDuration(_) => DataType::YearMonthDuration,
            AtomicValue::DayTimeDuration(_) => DataType::DayTimeDuration,
            AtomicValue::Base64(_) => DataType::Base64,
            AtomicValue::Uri(_) => DataType::Uri,
            AtomicValue::Uuid(_) => DataType::Uuid,
            AtomicValue::IpV4(_) => DataType::IpV4Address,
            AtomicValue::IpV6(_) => DataType::IpV6Address,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.data_type().name()
    }

    /// Parses the lexical form of `data_type` into a typed value.
    ///
    /// Boolean accepts `true`/`1` as true and treats every other string as
    /// false. Derived integer types validate their range and come back in
    /// the base `Integer` representation.
    pub fn from_lexical(data_type: DataType, value: &str) -> Result<AtomicValue, ModelError> {
        let invalid = || ModelError::InvalidLexicalValue {
            type_name: data_type.name().to_string(),
            value: value.to_string(),
        };
        let trimmed = value.trim();
        match data_type {
            DataType::String => Ok(AtomicValue::String(value.to_string())),
            DataType::Token => Ok(AtomicValue::String(
                trimmed.split_whitespace().collect::<Vec<_>>().join(" "),
            )),
            DataType::Untyped => Ok(AtomicValue::Untyped(value.to_string())),
            DataType::Boolean => Ok(AtomicValue::Boolean(trimmed == "true" || trimmed == "1")),
            DataType::Decimal => Decimal::from_str(trimmed)
                .map(AtomicValue::Decimal)
                .map_err(|_| invalid()),
            DataType::Integer => trimmed
                .parse::<i64>()
                .map(AtomicValue::Integer)
                .map_err(|_| invalid()),
            DataType::NonNegativeInteger => match trimmed.parse::<i64>() {
                Ok(i) if i >= 0 => Ok(AtomicValue::Integer(i)),
                _ => Err(invalid()),
            },
            DataType::PositiveInteger => match trimmed.parse::<i64>() {
                Ok(i) if i > 0 => Ok(AtomicValue::Integer(i)),
                _ => Err(invalid()),
            },
            DataType::Date => Date::parse(trimmed).map(AtomicValue::Date).ok_or_else(invalid),
            DataType::DateTime => DateTime::parse(trimmed)
                .map(AtomicValue::DateTime)
                .ok_or_else(invalid),
            DataType::Time => Time::parse(trimmed).map(AtomicValue::Time).ok_or_else(invalid),
            DataType::YearMonthDuration => YearMonthDuration::parse(trimmed)
                .map(AtomicValue::YearMonthDuration)
                .ok_or_else(invalid),
            DataType::DayTimeDuration => DayTimeDuration::parse(trimmed)
                .map(AtomicValue::DayTimeDuration)
                .ok_or_else(invalid),
            DataType::Base64 => {
                if BASE64_RE.is_match(trimmed) {
                    Ok(AtomicValue::Base64(trimmed.to_string()))
                } else {
                    Err(invalid())
                }
            }
            DataType::Uri | DataType::UriReference => {
                if trimmed.is_empty() && data_type == DataType::Uri {
                    Err(invalid())
                } else {
                    Ok(AtomicValue::Uri(trimmed.to_string()))
                }
            }
            DataType::Uuid => {
                if UUID_RE.is_match(trimmed) {
                    Ok(AtomicValue::Uuid(trimmed.to_lowercase()))
                } else {
                    Err(invalid())
                }
            }
            DataType::IpV4Address => trimmed
                .parse::<Ipv4Addr>()
                .map(AtomicValue::IpV4)
                .map_err(|_| invalid()),
            DataType::IpV6Address => trimmed
                .parse::<Ipv6Addr>()
                .map(AtomicValue::IpV6)
                .map_err(|_| invalid()),
        }
    }

    pub fn to_string_value(&self) -> String {
        match self {
            AtomicValue::String(s) | AtomicValue::Untyped(s) => s.clone(),
            AtomicValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            AtomicValue::Integer(i) => i.to_string(),
            AtomicValue::Decimal(d) => d.to_string(),
            AtomicValue::Date(d) => d.to_string(),
            AtomicValue::DateTime(dt) => dt.to_string(),
            AtomicValue::Time(t) => t.to_string(),
            AtomicValue::YearMonthDuration(d) => d.to_string(),
            AtomicValue::DayTimeDuration(d) => d.to_string(),
            AtomicValue::Base64(s) | AtomicValue::Uri(s) | AtomicValue::Uuid(s) => s.clone(),
            AtomicValue::IpV4(a) => a.to_string(),
            AtomicValue::IpV6(a) => a.to_string(),
        }
    }

    /// Effective boolean value of a single atomic item.
    pub fn to_boolean(&self) -> bool {
        match self {
            AtomicValue::Boolean(b) => *b,
            AtomicValue::String(s) | AtomicValue::Untyped(s) => !s.is_empty(),
            AtomicValue::Integer(i) => *i != 0,
            AtomicValue::Decimal(d) => !d.is_zero(),
            _ => true,
        }
    }

    pub fn to_double(&self) -> f64 {
        match self {
            AtomicValue::Integer(i) => *i as f64,
            AtomicValue::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            AtomicValue::String(s) | AtomicValue::Untyped(s) => {
                s.trim().parse().unwrap_or(f64::NAN)
            }
            AtomicValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => f64::NAN,
        }
    }

    pub fn to_integer(&self) -> Option<i64> {
        match self {
            AtomicValue::Integer(i) => Some(*i),
            AtomicValue::Decimal(d) => d.trunc().to_i64(),
            AtomicValue::String(s) | AtomicValue::Untyped(s) => s.trim().parse().ok(),
            AtomicValue::Boolean(b) => Some(if *b { 1 } else { 0 }),
            _ => None,
        }
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            AtomicValue::Decimal(d) => Some(*d),
            AtomicValue::Integer(i) => Some(Decimal::from(*i)),
            AtomicValue::String(s) | AtomicValue::Untyped(s) => {
                Decimal::from_str(s.trim()).ok()
            }
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, AtomicValue::Integer(_) | AtomicValue::Decimal(_))
    }
}

impl PartialEq for AtomicValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AtomicValue::String(a), AtomicValue::String(b)) => a == b,
            (AtomicValue::Untyped(a), AtomicValue::Untyped(b)) => a == b,
            (AtomicValue::Untyped(a), AtomicValue::String(b))
            | (AtomicValue::String(b), AtomicValue::Untyped(a)) => a == b,
            (AtomicValue::Boolean(a), AtomicValue::Boolean(b)) => a == b,
            (AtomicValue::Integer(a), AtomicValue::Integer(b)) => a == b,
            (AtomicValue::Decimal(a), AtomicValue::Decimal(b)) => a == b,
            (AtomicValue::Integer(a), AtomicValue::Decimal(b))
            | (AtomicValue::Decimal(b), AtomicValue::Integer(a)) => Decimal::from(*a) == *b,
            (AtomicValue::Date(a), AtomicValue::Date(b)) => a == b,
            (AtomicValue::DateTime(a), AtomicValue::DateTime(b)) => a == b,
            (AtomicValue::Time(a), AtomicValue::Time(b)) => a == b,
            (AtomicValue::YearMonthDuration(a), AtomicValue::YearMonthDuration(b)) => a == b,
            (AtomicValue::DayTimeDuration(a), AtomicValue::DayTimeDuration(b)) => a == b,
            (AtomicValue::Base64(a), AtomicValue::Base64(b)) => a == b,
            (AtomicValue::Uri(a), AtomicValue::Uri(b)) => a == b,
            (AtomicValue::Uuid(a), AtomicValue::Uuid(b)) => a == b,
            (AtomicValue::IpV4(a), AtomicValue::IpV4(b)) => a == b,
            (AtomicValue::IpV6(a), AtomicValue::IpV6(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AtomicValue {}

// Values that compare equal across variants (untyped vs string, integer vs
// decimal) must hash identically, so numerics hash a normalized decimal form
// and strings share a tag with untyped.
impl Hash for AtomicValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            AtomicValue::String(s) | AtomicValue::Untyped(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            AtomicValue::Integer(i) => {
                1u8.hash(state);
                Decimal::from(*i).normalize().to_string().hash(state);
            }
            AtomicValue::Decimal(d) => {
                1u8.hash(state);
                d.normalize().to_string().hash(state);
            }
            AtomicValue::Boolean(b) => {
                2u8.hash(state);
                b.hash(state);
            }
            AtomicValue::Date(d) => {
                3u8.hash(state);
                d.hash(state);
            }
            AtomicValue::DateTime(dt) => {
                4u8.hash(state);
                dt.hash(state);
            }
            AtomicValue::Time(t) => {
                5u8.hash(state);
                t.hash(state);
            }
            AtomicValue::YearMonthDuration(d) => {
                6u8.hash(state);
                d.hash(state);
            }
            AtomicValue::DayTimeDuration(d) => {
                7u8.hash(state);
                d.hash(state);
            }
            AtomicValue::Base64(s) => {
                8u8.hash(state);
                s.hash(state);
            }
            AtomicValue::Uri(s) => {
                9u8.hash(state);
                s.hash(state);
            }
            AtomicValue::Uuid(s) => {
                10u8.hash(state);
                s.hash(state);
            }
            AtomicValue::IpV4(a) => {
                11u8.hash(state);
                a.hash(state);
            }
            AtomicValue::IpV6(a) => {
                12u8.hash(state);
                a.hash(state);
            }
        }
    }
}

impl PartialOrd for AtomicValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (AtomicValue::String(a), AtomicValue::String(b))
            | (AtomicValue::Untyped(a), AtomicValue::Untyped(b))
            | (AtomicValue::Untyped(a), AtomicValue::String(b))
            | (AtomicValue::String(a), AtomicValue::Untyped(b)) => a.partial_cmp(b),
            (AtomicValue::Integer(a), AtomicValue::Integer(b)) => a.partial_cmp(b),
            (AtomicValue::Decimal(a), AtomicValue::Decimal(b)) => a.partial_cmp(b),
            (AtomicValue::Integer(a), AtomicValue::Decimal(b)) => Decimal::from(*a).partial_cmp(b),
            (AtomicValue::Decimal(a), AtomicValue::Integer(b)) => a.partial_cmp(&Decimal::from(*b)),
            (AtomicValue::Boolean(a), AtomicValue::Boolean(b)) => a.partial_cmp(b),
            (AtomicValue::Date(a), AtomicValue::Date(b)) => a.partial_cmp(b),
            (AtomicValue::DateTime(a), AtomicValue::DateTime(b)) => a.partial_cmp(b),
            (AtomicValue::Time(a), AtomicValue::Time(b)) => a.partial_cmp(b),
            (AtomicValue::YearMonthDuration(a), AtomicValue::YearMonthDuration(b)) => {
                a.partial_cmp(b)
            }
            (AtomicValue::DayTimeDuration(a), AtomicValue::DayTimeDuration(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for AtomicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_value())
    }
}

impl From<String> for AtomicValue {
    fn from(s: String) -> Self {
        AtomicValue::String(s)
    }
}

impl From<&str> for AtomicValue {
    fn from(s: &str) -> Self {
        AtomicValue::String(s.to_string())
    }
}

impl From<bool> for AtomicValue {
    fn from(b: bool) -> Self {
        AtomicValue::Boolean(b)
    }
}

impl From<i64> for AtomicValue {
    fn from(i: i64) -> Self {
        AtomicValue::Integer(i)
    }
}

impl From<i32> for AtomicValue {
    fn from(i: i32) -> Self {
        AtomicValue::Integer(i as i64)
    }
}

impl From<Decimal> for AtomicValue {
    fn from(d: Decimal) -> Self {
        AtomicValue::Decimal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_operations() {
        let s = AtomicValue::from("hello");
        assert_eq!(s.to_string_value(), "hello");
        assert!(s.to_boolean());
        assert!(!AtomicValue::from("").to_boolean());
    }

    #[test]
    fn test_boolean_lexical_space() {
        let t = AtomicValue::from_lexical(DataType::Boolean, "true").unwrap();
        let one = AtomicValue::from_lexical(DataType::Boolean, "1").unwrap();
        let junk = AtomicValue::from_lexical(DataType::Boolean, "ABCD0").unwrap();
        assert_eq!(t, AtomicValue::Boolean(true));
        assert_eq!(one, AtomicValue::Boolean(true));
        assert_eq!(junk, AtomicValue::Boolean(false));
    }

    #[test]
    fn test_integer_lexical_space() {
        let v = AtomicValue::from_lexical(DataType::Integer, "1234567").unwrap();
        assert_eq!(v.to_integer(), Some(1_234_567));
        assert!(AtomicValue::from_lexical(DataType::Integer, "12.5").is_err());
        assert!(AtomicValue::from_lexical(DataType::NonNegativeInteger, "-1").is_err());
        assert!(AtomicValue::from_lexical(DataType::PositiveInteger, "0").is_err());
    }

    #[test]
    fn test_numeric_cross_type_comparison() {
        assert_eq!(
            AtomicValue::Integer(5),
            AtomicValue::Decimal(Decimal::from(5))
        );
        assert!(AtomicValue::Integer(5) < AtomicValue::Decimal(Decimal::new(55, 1)));
    }

    #[test]
    fn test_temporal_lexical_space() {
        let d = AtomicValue::from_lexical(DataType::Date, "2024-06-01").unwrap();
        assert_eq!(d.to_string_value(), "2024-06-01");
        assert!(AtomicValue::from_lexical(DataType::Date, "not-a-date").is_err());
        let dur = AtomicValue::from_lexical(DataType::DayTimeDuration, "PT90S").unwrap();
        assert_eq!(dur.data_type(), DataType::DayTimeDuration);
    }

    #[test]
    fn test_network_lexical_space() {
        let ip = AtomicValue::from_lexical(DataType::IpV4Address, "192.168.0.1").unwrap();
        assert_eq!(ip.to_string_value(), "192.168.0.1");
        assert!(AtomicValue::from_lexical(DataType::IpV4Address, "192.168.0.999").is_err());
        let uuid = AtomicValue::from_lexical(
            DataType::Uuid,
            "4A1BE9E7-93A6-4EDE-BA1D-79A2D7A01F90",
        )
        .unwrap();
        assert_eq!(
            uuid.to_string_value(),
            "4a1be9e7-93a6-4ede-ba1d-79a2d7a01f90"
        );
    }

    #[test]
    fn test_untyped_compares_as_string() {
        assert_eq!(
            AtomicValue::Untyped("abc".to_string()),
            AtomicValue::from("abc")
        );
        assert!(AtomicValue::Untyped("abc".to_string()) < AtomicValue::from("abd"));
    }
}
