//! The closed set of built-in atomic data types.
//!
//! Types form a small derivation hierarchy (`token` derives from `string`,
//! `positive-integer` from `non-negative-integer` from `integer`). The
//! abstract groupings `numeric`, `temporal`, `duration`, and `ip-address`
//! are membership sets over the concrete types, not lattice nodes.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Token,
    Untyped,
    Boolean,
    Decimal,
    Integer,
    NonNegativeInteger,
    PositiveInteger,
    Date,
    DateTime,
    Time,
    YearMonthDuration,
    DayTimeDuration,
    Base64,
    Uri,
    UriReference,
    Uuid,
    IpV4Address,
    IpV6Address,
}

static REGISTRY: Lazy<HashMap<&'static str, DataType>> = Lazy::new(|| {
    DataType::ALL.iter().map(|dt| (dt.name(), *dt)).collect()
});

impl DataType {
    pub const ALL: [DataType; 19] = [
        DataType::String,
        DataType::Token,
        DataType::Untyped,
        DataType::Boolean,
        DataType::Decimal,
        DataType::Integer,
        DataType::NonNegativeInteger,
        DataType::PositiveInteger,
        DataType::Date,
        DataType::DateTime,
        DataType::Time,
        DataType::YearMonthDuration,
        DataType::DayTimeDuration,
        DataType::Base64,
        DataType::Uri,
        DataType::UriReference,
        DataType::Uuid,
        DataType::IpV4Address,
        DataType::IpV6Address,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Token => "token",
            DataType::Untyped => "untyped",
            DataType::Boolean => "boolean",
            DataType::Decimal => "decimal",
            DataType::Integer => "integer",
            DataType::NonNegativeInteger => "non-negative-integer",
            DataType::PositiveInteger => "positive-integer",
            DataType::Date => "date",
            DataType::DateTime => "date-time",
            DataType::Time => "time",
            DataType::YearMonthDuration => "year-month-duration",
            DataType::DayTimeDuration => "day-time-duration",
            DataType::Base64 => "base64",
            DataType::Uri => "uri",
            DataType::UriReference => "uri-reference",
            DataType::Uuid => "uuid",
            DataType::IpV4Address => "ip-v4-address",
            DataType::IpV6Address => "ip-v6-address",
        }
    }

    /// Looks up a data type by its canonical name.
    pub fn lookup(name: &str) -> Option<DataType> {
        REGISTRY.get(name).copied()
    }

    /// The type this one is derived from, if any.
    pub fn base(&self) -> Option<DataType> {
        match self {
            DataType::Token => Some(DataType::String),
            DataType::Integer => Some(DataType::Decimal),
            DataType::NonNegativeInteger => Some(DataType::Integer),
            DataType::PositiveInteger => Some(DataType::NonNegativeInteger),
            DataType::UriReference => Some(DataType::Uri),
            DataType::Uuid => Some(DataType::String),
            _ => None,
        }
    }

    /// True when `self` is `other` or transitively derived from it.
    pub fn derives_from(&self, other: DataType) -> bool {
        let mut current = Some(*self);
        while let Some(dt) = current {
            if dt == other {
                return true;
            }
            current = dt.base();
        }
        false
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Decimal
                | DataType::Integer
                | DataType::NonNegativeInteger
                | DataType::PositiveInteger
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::DateTime | DataType::Time)
    }

    pub fn is_duration(&self) -> bool {
        matches!(
            self,
            DataType::YearMonthDuration | DataType::DayTimeDuration
        )
    }

    pub fn is_ip_address(&self) -> bool {
        matches!(self, DataType::IpV4Address | DataType::IpV6Address)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_round_trips_names() {
        for dt in DataType::ALL {
            assert_eq!(DataType::lookup(dt.name()), Some(dt));
        }
        assert_eq!(DataType::lookup("complex"), None);
    }

    #[test]
    fn test_derivation_chain() {
        assert!(DataType::PositiveInteger.derives_from(DataType::Integer));
        assert!(DataType::PositiveInteger.derives_from(DataType::Decimal));
        assert!(DataType::Token.derives_from(DataType::String));
        assert!(!DataType::String.derives_from(DataType::Token));
        assert!(DataType::Date.derives_from(DataType::Date));
    }

    #[test]
    fn test_union_memberships() {
        assert!(DataType::PositiveInteger.is_numeric());
        assert!(!DataType::Date.is_numeric());
        assert!(DataType::DateTime.is_temporal());
        assert!(DataType::DayTimeDuration.is_duration());
        assert!(DataType::IpV6Address.is_ip_address());
    }
}
