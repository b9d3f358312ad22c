//! Sort rules and the comparator built from them.
//!
//! Provides [`Dir`] for sort direction, [`SortRule`] for one field-based key
//! and [`SortRules`] for the priority-ordered list the table is sorted by.
//!
//! Comparison never fails. Missing or unparseable values compare as the
//! neutral value of their kind: the epoch for dates, zero for numbers and the
//! empty string for text.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeekerError};
use crate::field::{FieldKey, FieldRef, FieldType};
use crate::traits::Seekable;
use crate::value::{Number, Timestamp};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Returns `true` if this is ascending order.
    pub fn is_asc(self) -> bool {
        matches!(self, Dir::Asc)
    }

    /// Returns `true` if this is descending order.
    pub fn is_desc(self) -> bool {
        matches!(self, Dir::Desc)
    }

    /// The other direction.
    pub fn flip(self) -> Dir {
        match self {
            Dir::Asc => Dir::Desc,
            Dir::Desc => Dir::Asc,
        }
    }

    /// Applies this direction to an ordering.
    ///
    /// For `Asc`, returns the ordering unchanged.
    /// For `Desc`, reverses the ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }

    /// Returns the display name of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Dir::Asc => "asc",
            Dir::Desc => "desc",
        }
    }
}

impl fmt::Display for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Dir {
    type Err = SeekerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Dir::Asc),
            "desc" => Ok(Dir::Desc),
            _ => Err(SeekerError::UnknownDirection(s.to_string())),
        }
    }
}

/// Comparison semantics of a sort rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKind {
    /// Collated text comparison.
    Text,
    /// Numeric comparison.
    Number,
    /// Chronological comparison.
    Date,
}

impl SortKind {
    /// The kind used for a field type. Selects, booleans and tag lists sort
    /// by their text form.
    pub fn for_type(field_type: FieldType) -> SortKind {
        match field_type {
            FieldType::Number => SortKind::Number,
            FieldType::Date => SortKind::Date,
            FieldType::Text | FieldType::Select | FieldType::Boolean | FieldType::Tags => {
                SortKind::Text
            }
        }
    }

    /// The kind for a field reference. Unknown fields sort as text, where
    /// every record reads as the empty string.
    pub fn for_field(field: &FieldRef) -> SortKind {
        field
            .key()
            .map_or(SortKind::Text, |key| SortKind::for_type(key.field_type()))
    }
}

/// One sort key.
///
/// `kind` is derived from the field when the rule is built and is carried for
/// display only: deserializing a rule ignores any stored kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSortRule")]
pub struct SortRule {
    pub id: String,
    pub field: FieldRef,
    pub kind: SortKind,
    pub direction: Dir,
}

#[derive(Deserialize)]
struct RawSortRule {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "fieldKey", alias = "field_key")]
    field: FieldRef,
    #[serde(default)]
    direction: Dir,
}

impl From<RawSortRule> for SortRule {
    fn from(raw: RawSortRule) -> Self {
        let rule = SortRule::new(raw.field, raw.direction);
        match raw.id {
            Some(id) if !id.is_empty() => rule.with_id(id),
            _ => rule,
        }
    }
}

impl SortRule {
    /// Creates a rule whose id is the field name.
    pub fn new(field: impl Into<FieldRef>, direction: Dir) -> Self {
        let field = field.into();
        SortRule {
            id: field.name().to_string(),
            kind: SortKind::for_field(&field),
            field,
            direction,
        }
    }

    /// Creates an ascending rule.
    pub fn asc(field: impl Into<FieldRef>) -> Self {
        SortRule::new(field, Dir::Asc)
    }

    /// Creates a descending rule.
    pub fn desc(field: impl Into<FieldRef>) -> Self {
        SortRule::new(field, Dir::Desc)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Parses `field[:asc|desc]`. The field must be known; the direction
    /// defaults to ascending.
    pub fn parse(expr: &str) -> Result<Self> {
        let (field, direction) = match expr.split_once(':') {
            Some((field, dir)) => (field.trim(), dir.trim().parse()?),
            None => (expr.trim(), Dir::Asc),
        };
        if field.is_empty() {
            return Err(SeekerError::InvalidExpression {
                expr: expr.to_string(),
                reason: "missing field",
            });
        }
        let key: FieldKey = field.parse()?;
        Ok(SortRule::new(key, direction))
    }

    /// Compares two records by this rule, direction applied.
    pub fn compare<T: Seekable>(&self, a: &T, b: &T) -> Ordering {
        let va = self.field.value(a);
        let vb = self.field.value(b);
        let ordering = match self.kind {
            SortKind::Date => {
                let ta = va.as_timestamp().unwrap_or(Timestamp::EPOCH);
                let tb = vb.as_timestamp().unwrap_or(Timestamp::EPOCH);
                ta.cmp(&tb)
            }
            SortKind::Number => {
                let na = va.as_number().unwrap_or(Number::I64(0));
                let nb = vb.as_number().unwrap_or(Number::I64(0));
                na.compare(nb).unwrap_or(Ordering::Equal)
            }
            SortKind::Text => collate(&va.to_text(), &vb.to_text()),
        };
        self.direction.apply(ordering)
    }
}

/// Approximates locale-aware collation.
///
/// Strings are compared with accents folded and case ignored first; accented
/// forms sort after their base letters; on a remaining tie lowercase sorts
/// before uppercase.
///
/// ```
/// use std::cmp::Ordering;
/// use leadgrid_seeker::collate;
///
/// assert_eq!(collate("apple", "Banana"), Ordering::Less);
/// assert_eq!(collate("Émile", "Emily"), Ordering::Less);
/// assert_eq!(collate("acme", "Acme"), Ordering::Less);
/// ```
pub fn collate(a: &str, b: &str) -> Ordering {
    fold(a)
        .cmp(&fold(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

fn fold(s: &str) -> String {
    deunicode::deunicode(s).to_lowercase()
}

/// Recency order used when no rule is set: `updated_at` descending, records
/// without a parseable update time last.
pub fn default_order<T: Seekable>(a: &T, b: &T) -> Ordering {
    let updated = |item: &T| {
        item.field_value(FieldKey::UpdatedAt)
            .as_timestamp()
            .unwrap_or(Timestamp::EPOCH)
    };
    updated(b).cmp(&updated(a))
}

/// Priority-ordered sort rules. Index 0 is the primary key.
///
/// # Example
///
/// ```
/// use leadgrid_seeker::{Dir, FieldKey, SortRules};
///
/// let sorts = SortRules::new()
///     .by(FieldKey::Stage, Dir::Asc)
///     .by(FieldKey::Company, Dir::Asc)
///     .toggle_direction("company");
///
/// assert_eq!(sorts.rules()[1].direction, Dir::Desc);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortRules(Vec<SortRule>);

impl SortRules {
    pub fn new() -> Self {
        SortRules::default()
    }

    pub fn rules(&self) -> &[SortRule] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn rule(&self, id: &str) -> Option<&SortRule> {
        self.0.iter().find(|r| r.id == id)
    }

    /// Appends a rule at the lowest priority. A clashing id gets a numeric
    /// suffix.
    pub fn push(mut self, mut rule: SortRule) -> Self {
        if self.rule(&rule.id).is_some() {
            let base = rule.id.clone();
            rule.id = (2..)
                .map(|n| format!("{base}-{n}"))
                .find(|id| self.rule(id).is_none())
                .unwrap_or(base);
        }
        self.0.push(rule);
        self
    }

    /// Appends a rule for `field`.
    pub fn by(self, field: impl Into<FieldRef>, direction: Dir) -> Self {
        self.push(SortRule::new(field, direction))
    }

    /// Removes the rule `id`, if present.
    pub fn remove(mut self, id: &str) -> Self {
        self.0.retain(|r| r.id != id);
        self
    }

    /// Flips the direction of rule `id`.
    pub fn toggle_direction(mut self, id: &str) -> Self {
        if let Some(rule) = self.0.iter_mut().find(|r| r.id == id) {
            rule.direction = rule.direction.flip();
        }
        self
    }

    /// Moves rule `id` to `index` (clamped), shifting the rules in between.
    pub fn move_rule(mut self, id: &str, index: usize) -> Self {
        if let Some(from) = self.0.iter().position(|r| r.id == id) {
            let rule = self.0.remove(from);
            let to = index.min(self.0.len());
            self.0.insert(to, rule);
        }
        self
    }

    /// Compares two records: each rule in priority order, the next rule
    /// breaking ties. With no rules, falls back to [`default_order`].
    pub fn compare<T: Seekable>(&self, a: &T, b: &T) -> Ordering {
        if self.0.is_empty() {
            return default_order(a, b);
        }
        self.0
            .iter()
            .map(|rule| rule.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Sorts in place. The sort is stable: records that compare equal keep
    /// their relative order.
    pub fn sort<T: Seekable>(&self, items: &mut [&T]) {
        items.sort_by(|a, b| self.compare(*a, *b));
    }
}

impl From<Vec<SortRule>> for SortRules {
    fn from(rules: Vec<SortRule>) -> Self {
        rules.into_iter().fold(SortRules::new(), SortRules::push)
    }
}
