//! Date, time, and duration values with ISO-8601 lexical forms.
//!
//! Calendar arithmetic works on days-since-epoch (proleptic Gregorian,
//! Howard Hinnant's civil-days algorithm) so that date ± duration and
//! date − date never touch the lexical form.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(-?\d{4,})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2}(?:\.\d+)?)(Z|[+-]\d{2}:\d{2})?$",
    )
    .expect("BUG: invalid DATETIME_RE regex literal")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$")
        .expect("BUG: invalid DATE_RE regex literal")
});

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2}(?:\.\d+)?)(Z|[+-]\d{2}:\d{2})?$")
        .expect("BUG: invalid TIME_RE regex literal")
});

static YEAR_MONTH_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?$").expect("BUG: invalid YEAR_MONTH_DURATION_RE")
});

static DAY_TIME_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-)?P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("BUG: invalid DAY_TIME_DURATION_RE")
});

/// A fixed offset from UTC, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timezone {
    pub offset_minutes: i32,
}

impl Timezone {
    pub const UTC: Timezone = Timezone { offset_minutes: 0 };

    pub fn parse(s: &str) -> Option<Self> {
        if s == "Z" {
            return Some(Self::UTC);
        }
        if s.len() != 6 {
            return None;
        }
        let sign = match s.chars().next()? {
            '+' => 1,
            '-' => -1,
            _ => return None,
        };
        let hours: i32 = s[1..3].parse().ok()?;
        let minutes: i32 = s[4..6].parse().ok()?;
        if hours > 14 || minutes > 59 {
            return None;
        }
        Some(Timezone {
            offset_minutes: sign * (hours * 60 + minutes),
        })
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offset_minutes == 0 {
            write!(f, "Z")
        } else {
            let sign = if self.offset_minutes >= 0 { '+' } else { '-' };
            let abs = self.offset_minutes.abs();
            write!(f, "{}{:02}:{:02}", sign, abs / 60, abs % 60)
        }
    }
}

fn fmt_tz(tz: &Option<Timezone>) -> String {
    tz.as_ref().map(|t| t.to_string()).unwrap_or_default()
}

/// Days since 1970-01-01 in the proleptic Gregorian calendar.
pub(crate) fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y / 400 } else { (y - 399) / 400 };
    let yoe = (y - era * 400) as u64;
    let mp = if month > 2 { month - 3 } else { month + 9 } as u64;
    let doy = (153 * mp + 2) / 5 + day as u64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe as i64 - 719_468
}

pub(crate) fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let days = days + 719_468;
    let era = if days >= 0 {
        days / 146097
    } else {
        (days - 146096) / 146097
    };
    let doe = (days - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

/// A calendar date with an optional timezone (`xs:date` analog).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Date {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub timezone: Option<Timezone>,
}

impl Date {
    pub fn parse(s: &str) -> Option<Self> {
        let caps = DATE_RE.captures(s.trim())?;
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u8 = caps.get(2)?.as_str().parse().ok()?;
        let day: u8 = caps.get(3)?.as_str().parse().ok()?;
        let timezone = caps.get(4).and_then(|m| Timezone::parse(m.as_str()));
        if !(1..=12).contains(&month) || day < 1 || day as u32 > days_in_month(year as i64, month as u32)
        {
            return None;
        }
        Some(Date {
            year,
            month,
            day,
            timezone,
        })
    }

    pub fn epoch_days(&self) -> i64 {
        days_from_civil(self.year as i64, self.month as u32, self.day as u32)
    }

    /// Seconds since the epoch of the date's start-of-day instant, normalized
    /// to UTC when a timezone is present.
    pub fn epoch_seconds(&self) -> f64 {
        let tz = self.timezone.map(|t| t.offset_minutes).unwrap_or(0) as f64;
        self.epoch_days() as f64 * 86_400.0 - tz * 60.0
    }

    fn from_epoch_days(days: i64, timezone: Option<Timezone>) -> Self {
        let (y, m, d) = civil_from_days(days);
        Date {
            year: y as i32,
            month: m as u8,
            day: d as u8,
            timezone,
        }
    }

    /// Adds a month count, clamping the day to the target month's length.
    pub fn add_months(&self, months: i64) -> Self {
        let total = self.year as i64 * 12 + (self.month as i64 - 1) + months;
        let year = total.div_euclid(12);
        let month = total.rem_euclid(12) as u32 + 1;
        let day = (self.day as u32).min(days_in_month(year, month));
        Date {
            year: year as i32,
            month: month as u8,
            day: day as u8,
            timezone: self.timezone,
        }
    }

    /// Adds a second count; the result is the date of the shifted instant.
    pub fn add_seconds(&self, seconds: f64) -> Self {
        let shifted = self.epoch_days() as f64 * 86_400.0 + seconds;
        Date::from_epoch_days((shifted / 86_400.0).floor() as i64, self.timezone)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}{}",
            self.year,
            self.month,
            self.day,
            fmt_tz(&self.timezone)
        )
    }
}

impl Eq for Date {}

impl Hash for Date {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch_seconds().to_bits().hash(state);
    }
}

impl PartialOrd for Date {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.epoch_seconds().partial_cmp(&other.epoch_seconds())
    }
}

/// A date and time of day with an optional timezone (`xs:dateTime` analog).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: f64,
    pub timezone: Option<Timezone>,
}

impl DateTime {
    pub fn parse(s: &str) -> Option<Self> {
        let caps = DATETIME_RE.captures(s.trim())?;
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u8 = caps.get(2)?.as_str().parse().ok()?;
        let day: u8 = caps.get(3)?.as_str().parse().ok()?;
        let hour: u8 = caps.get(4)?.as_str().parse().ok()?;
        let minute: u8 = caps.get(5)?.as_str().parse().ok()?;
        let second: f64 = caps.get(6)?.as_str().parse().ok()?;
        let timezone = caps.get(7).and_then(|m| Timezone::parse(m.as_str()));
        if !(1..=12).contains(&month)
            || day < 1
            || day as u32 > days_in_month(year as i64, month as u32)
            || hour > 24
            || minute > 59
            || second >= 60.0
        {
            return None;
        }
        Some(DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            timezone,
        })
    }

    pub fn date(&self) -> Date {
        Date {
            year: self.year,
            month: self.month,
            day: self.day,
            timezone: self.timezone,
        }
    }

    pub fn time(&self) -> Time {
        Time {
            hour: self.hour,
            minute: self.minute,
            second: self.second,
            timezone: self.timezone,
        }
    }

    pub fn epoch_seconds(&self) -> f64 {
        let tz = self.timezone.map(|t| t.offset_minutes).unwrap_or(0) as f64;
        days_from_civil(self.year as i64, self.month as u32, self.day as u32) as f64 * 86_400.0
            + self.hour as f64 * 3_600.0
            + self.minute as f64 * 60.0
            + self.second
            - tz * 60.0
    }

    /// Builds a UTC date-time from seconds since the Unix epoch.
    pub fn from_epoch_seconds(seconds: f64) -> Self {
        DateTime::from_local_seconds(seconds, Some(Timezone::UTC))
    }

    fn from_local_seconds(local: f64, timezone: Option<Timezone>) -> Self {
        let days = (local / 86_400.0).floor() as i64;
        let in_day = local - days as f64 * 86_400.0;
        let (y, m, d) = civil_from_days(days);
        DateTime {
            year: y as i32,
            month: m as u8,
            day: d as u8,
            hour: (in_day / 3_600.0) as u8,
            minute: ((in_day % 3_600.0) / 60.0) as u8,
            second: in_day % 60.0,
            timezone,
        }
    }

    fn local_seconds(&self) -> f64 {
        days_from_civil(self.year as i64, self.month as u32, self.day as u32) as f64 * 86_400.0
            + self.hour as f64 * 3_600.0
            + self.minute as f64 * 60.0
            + self.second
    }

    pub fn add_months(&self, months: i64) -> Self {
        let date = self.date().add_months(months);
        DateTime {
            year: date.year,
            month: date.month,
            day: date.day,
            ..*self
        }
    }

    pub fn add_seconds(&self, seconds: f64) -> Self {
        DateTime::from_local_seconds(self.local_seconds() + seconds, self.timezone)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tz = fmt_tz(&self.timezone);
        if self.second.fract() == 0.0 {
            write!(
                f,
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}",
                self.year, self.month, self.day, self.hour, self.minute, self.second as i32, tz
            )
        } else {
            write!(
                f,
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:09.6}{}",
                self.year, self.month, self.day, self.hour, self.minute, self.second, tz
            )
        }
    }
}

impl Eq for DateTime {}

impl Hash for DateTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch_seconds().to_bits().hash(state);
    }
}

impl PartialOrd for DateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.epoch_seconds().partial_cmp(&other.epoch_seconds())
    }
}

/// A time of day with an optional timezone (`xs:time` analog).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: f64,
    pub timezone: Option<Timezone>,
}

impl Time {
    pub fn parse(s: &str) -> Option<Self> {
        let caps = TIME_RE.captures(s.trim())?;
        let hour: u8 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u8 = caps.get(2)?.as_str().parse().ok()?;
        let second: f64 = caps.get(3)?.as_str().parse().ok()?;
        let timezone = caps.get(4).and_then(|m| Timezone::parse(m.as_str()));
        if hour > 24 || minute > 59 || second >= 60.0 {
            return None;
        }
        Some(Time {
            hour,
            minute,
            second,
            timezone,
        })
    }

    pub fn seconds_of_day(&self) -> f64 {
        let tz = self.timezone.map(|t| t.offset_minutes).unwrap_or(0) as f64;
        self.hour as f64 * 3_600.0 + self.minute as f64 * 60.0 + self.second - tz * 60.0
    }

    /// Adds a second count, wrapping around midnight.
    pub fn add_seconds(&self, seconds: f64) -> Self {
        let local = self.hour as f64 * 3_600.0 + self.minute as f64 * 60.0 + self.second;
        let wrapped = (local + seconds).rem_euclid(86_400.0);
        Time {
            hour: (wrapped / 3_600.0) as u8,
            minute: ((wrapped % 3_600.0) / 60.0) as u8,
            second: wrapped % 60.0,
            timezone: self.timezone,
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tz = fmt_tz(&self.timezone);
        if self.second.fract() == 0.0 {
            write!(
                f,
                "{:02}:{:02}:{:02}{}",
                self.hour, self.minute, self.second as i32, tz
            )
        } else {
            write!(f, "{:02}:{:02}:{:09.6}{}", self.hour, self.minute, self.second, tz)
        }
    }
}

impl Eq for Time {}

impl Hash for Time {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.seconds_of_day().to_bits().hash(state);
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.seconds_of_day().partial_cmp(&other.seconds_of_day())
    }
}

/// A duration counted in whole months (`xs:yearMonthDuration` analog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonthDuration {
    pub months: i64,
}

impl YearMonthDuration {
    pub fn new(months: i64) -> Self {
        YearMonthDuration { months }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let caps = YEAR_MONTH_DURATION_RE.captures(s)?;
        if caps.get(2).is_none() && caps.get(3).is_none() {
            return None;
        }
        let years: i64 = caps.get(2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let months: i64 = caps.get(3).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let total = years * 12 + months;
        Some(YearMonthDuration {
            months: if caps.get(1).is_some() { -total } else { total },
        })
    }
}

impl fmt::Display for YearMonthDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.months == 0 {
            return write!(f, "P0M");
        }
        if self.months < 0 {
            write!(f, "-")?;
        }
        let abs = self.months.abs();
        write!(f, "P")?;
        if abs / 12 != 0 {
            write!(f, "{}Y", abs / 12)?;
        }
        if abs % 12 != 0 {
            write!(f, "{}M", abs % 12)?;
        }
        Ok(())
    }
}

/// A duration counted in seconds (`xs:dayTimeDuration` analog).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayTimeDuration {
    pub seconds: f64,
}

impl DayTimeDuration {
    pub fn new(seconds: f64) -> Self {
        DayTimeDuration { seconds }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let caps = DAY_TIME_DURATION_RE.captures(s)?;
        if caps.get(2).is_none() && caps.get(3).is_none() && caps.get(4).is_none() && caps.get(5).is_none()
        {
            return None;
        }
        let days: f64 = caps.get(2).map_or(0.0, |m| m.as_str().parse().unwrap_or(0.0));
        let hours: f64 = caps.get(3).map_or(0.0, |m| m.as_str().parse().unwrap_or(0.0));
        let minutes: f64 = caps.get(4).map_or(0.0, |m| m.as_str().parse().unwrap_or(0.0));
        let seconds: f64 = caps.get(5).map_or(0.0, |m| m.as_str().parse().unwrap_or(0.0));
        let total = days * 86_400.0 + hours * 3_600.0 + minutes * 60.0 + seconds;
        Some(DayTimeDuration {
            seconds: if caps.get(1).is_some() { -total } else { total },
        })
    }
}

impl fmt::Display for DayTimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seconds == 0.0 {
            return write!(f, "PT0S");
        }
        if self.seconds < 0.0 {
            write!(f, "-")?;
        }
        let mut rest = self.seconds.abs();
        write!(f, "P")?;
        let days = (rest / 86_400.0).floor();
        rest -= days * 86_400.0;
        let hours = (rest / 3_600.0).floor();
        rest -= hours * 3_600.0;
        let minutes = (rest / 60.0).floor();
        rest -= minutes * 60.0;
        if days != 0.0 {
            write!(f, "{}D", days as i64)?;
        }
        if hours != 0.0 || minutes != 0.0 || rest != 0.0 {
            write!(f, "T")?;
            if hours != 0.0 {
                write!(f, "{}H", hours as i64)?;
            }
            if minutes != 0.0 {
                write!(f, "{}M", minutes as i64)?;
            }
            if rest != 0.0 {
                if rest.fract() == 0.0 {
                    write!(f, "{}S", rest as i64)?;
                } else {
                    write!(f, "{}S", rest)?;
                }
            }
        }
        Ok(())
    }
}

impl Eq for DayTimeDuration {}

impl Hash for DayTimeDuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.seconds.to_bits().hash(state);
    }
}

impl PartialOrd for DayTimeDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.seconds.partial_cmp(&other.seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_round_trip() {
        let d = Date::parse("2024-02-29").unwrap();
        assert_eq!(d.to_string(), "2024-02-29");
        assert!(Date::parse("2023-02-29").is_none());
        assert!(Date::parse("2024-13-01").is_none());
    }

    #[test]
    fn test_datetime_round_trip() {
        let dt = DateTime::parse("2024-06-01T12:30:45Z").unwrap();
        assert_eq!(dt.to_string(), "2024-06-01T12:30:45Z");
        assert_eq!(dt.timezone, Some(Timezone::UTC));
    }

    #[test]
    fn test_civil_days_round_trip() {
        for days in [-1_000_000, -1, 0, 1, 738_000, 1_000_000] {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days_from_civil(y, m, d), days);
        }
    }

    #[test]
    fn test_add_months_clamps_day() {
        let d = Date::parse("2024-01-31").unwrap();
        assert_eq!(d.add_months(1).to_string(), "2024-02-29");
        assert_eq!(d.add_months(13).to_string(), "2025-02-28");
    }

    #[test]
    fn test_date_difference_in_seconds() {
        let a = Date::parse("2024-01-10").unwrap();
        let b = Date::parse("2024-01-01").unwrap();
        assert_eq!(a.epoch_seconds() - b.epoch_seconds(), 9.0 * 86_400.0);
    }

    #[test]
    fn test_year_month_duration_lexical() {
        let ym = YearMonthDuration::parse("P1Y2M").unwrap();
        assert_eq!(ym.months, 14);
        assert_eq!(ym.to_string(), "P1Y2M");
        assert_eq!(YearMonthDuration::parse("-P3M").unwrap().months, -3);
        assert!(YearMonthDuration::parse("P").is_none());
    }

    #[test]
    fn test_day_time_duration_lexical() {
        let dt = DayTimeDuration::parse("P1DT2H3M4S").unwrap();
        assert_eq!(dt.seconds, 86_400.0 + 2.0 * 3_600.0 + 3.0 * 60.0 + 4.0);
        assert_eq!(dt.to_string(), "P1DT2H3M4S");
        assert_eq!(DayTimeDuration::parse("-PT90S").unwrap().seconds, -90.0);
    }

    #[test]
    fn test_time_wraps_midnight() {
        let t = Time::parse("23:30:00").unwrap();
        assert_eq!(t.add_seconds(3_600.0).to_string(), "00:30:00");
    }
}
