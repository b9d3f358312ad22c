//! Runtime value types for field comparison.
//!
//! The [`Value`] enum represents the runtime value of a lead field as seen by
//! the engine. Most values borrow from the lead; derived values (the display
//! name, for instance) are owned.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Runtime value of a field, borrowed from the source record where possible.
///
/// # Example
///
/// ```
/// use leadgrid_seeker::{Value, Number};
///
/// assert!(Value::Null.is_empty());
/// assert!(Value::Bool(false).is_empty());
/// assert!(!Value::Number(Number::I64(0)).is_empty());
/// assert_eq!(Value::Bool(true).to_text(), "true");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// Text value, borrowed or derived.
    Text(Cow<'a, str>),
    /// Numeric value.
    Number(Number),
    /// Parsed timestamp.
    Timestamp(Timestamp),
    /// Boolean value.
    Bool(bool),
    /// String array (tags).
    List(&'a [String]),
    /// Field absent, null, unparseable or unknown.
    Null,
}

impl<'a> Value<'a> {
    /// Wraps an optional borrowed string, mapping `None` to [`Value::Null`].
    pub fn text(s: Option<&'a str>) -> Self {
        match s {
            Some(s) => Value::Text(Cow::Borrowed(s)),
            None => Value::Null,
        }
    }

    /// Parses an optional timestamp string. Unparseable input becomes
    /// [`Value::Null`].
    pub fn timestamp(s: Option<&str>) -> Self {
        match s.and_then(Timestamp::parse) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::Null,
        }
    }

    /// Returns `true` if this is a `Null` value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness check used by the emptiness operators.
    ///
    /// Empty strings, null, `false` and empty lists are empty. Numbers and
    /// timestamps are never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(s) => s.is_empty(),
            Value::Bool(b) => !b,
            Value::List(items) => items.is_empty(),
            Value::Null => true,
            Value::Number(_) | Value::Timestamp(_) => false,
        }
    }

    /// Extracts the string value, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Extracts the number value, if present.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts the timestamp value, if present.
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Extracts the boolean value, if present.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extracts the list value, if present.
    pub fn as_list(&self) -> Option<&'a [String]> {
        match self {
            Value::List(items) => Some(*items),
            _ => None,
        }
    }

    /// Renders the value as text. Null renders as the empty string.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Text(s) => Cow::Borrowed(s.as_ref()),
            Value::Number(n) => Cow::Owned(n.to_string()),
            Value::Timestamp(t) => Cow::Owned(t.to_rfc3339()),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::List(items) => Cow::Owned(items.join(", ")),
            Value::Null => Cow::Borrowed(""),
        }
    }

    /// Select-style representation: booleans become the literals `"true"` and
    /// `"false"`, null has no representation.
    pub fn select_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            other => Some(other.to_text()),
        }
    }
}

/// Numeric value.
///
/// Integers and floats are kept apart to preserve precision; comparisons
/// between the two go through `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Signed 64-bit integer.
    I64(i64),
    /// 64-bit floating point.
    F64(f64),
}

impl Number {
    /// Converts the number to f64 for comparison.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::F64(n) => n,
        }
    }

    /// Compares two numbers, handling mixed types. `None` only for NaN.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::I64(a), Number::I64(b)) => Some(a.cmp(&b)),
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(*other)
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::I64(n) => write!(f, "{n}"),
            Number::F64(n) => write!(f, "{n}"),
        }
    }
}

impl From<i32> for Number {
    fn from(n: i32) -> Self {
        Number::I64(n as i64)
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::I64(n)
    }
}

impl From<f64> for Number {
    fn from(n: f64) -> Self {
        Number::F64(n)
    }
}

/// Timestamp value represented as milliseconds since Unix epoch.
///
/// Leads carry their timestamps as strings straight from the store;
/// [`Timestamp::parse`] accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.fff]`
/// (read as UTC), Postgres-style `YYYY-MM-DD HH:MM:SS[.fff]+HH` and bare
/// dates (UTC midnight).
///
/// ```
/// use leadgrid_seeker::Timestamp;
///
/// assert_eq!(Timestamp::parse("1970-01-02"), Some(Timestamp(86_400_000)));
/// assert_eq!(Timestamp::parse("last tuesday"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// The Unix epoch, used as the neutral value for missing timestamps.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a new timestamp from milliseconds since Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// Returns the timestamp as milliseconds since Unix epoch.
    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Parses a stored timestamp string, returning `None` when it is empty or
    /// in no recognised format.
    pub fn parse(raw: &str) -> Option<Timestamp> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Timestamp(dt.timestamp_millis()));
        }
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
            return Some(Timestamp(dt.timestamp_millis()));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(Timestamp(naive.and_utc().timestamp_millis()));
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Timestamp(naive.and_utc().timestamp_millis()))
    }

    /// Formats the timestamp as RFC 3339 in UTC with millisecond precision.
    pub fn to_rfc3339(self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.0)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default()
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Timestamp(millis)
    }
}

impl<Tz: chrono::TimeZone> From<DateTime<Tz>> for Timestamp {
    fn from(dt: DateTime<Tz>) -> Self {
        Timestamp(dt.timestamp_millis())
    }
}
