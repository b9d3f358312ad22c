//! Filter conditions and the predicate evaluator.
//!
//! A [`FilterCondition`] is one row of the filter editor: a field, an
//! operator, a textual value, the conjunction joining it to the previous row,
//! and optionally the group it belongs to.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::date::{Clock, DateBucket};
use crate::error::{Result, SeekerError};
use crate::field::{FieldKey, FieldRef, FieldType};
use crate::op::{Conjunction, Operator};
use crate::traits::Seekable;
use crate::value::{Number, Value};

/// Opaque identifier of a condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionId(pub String);

/// Opaque identifier of a condition group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(ConditionId);
string_id!(GroupId);

/// One filter predicate.
///
/// # Example
///
/// ```
/// use leadgrid_seeker::{Clock, FieldKey, FilterCondition, Lead, Operator};
///
/// let cond = FilterCondition::new("c1", FieldKey::Company, Operator::Contains, "ACME");
/// let mut lead = Lead::new("l1", "ada@acme.test");
/// lead.company = Some("Acme Corp".into());
///
/// assert!(cond.matches(&lead, &Clock::system()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    #[serde(default)]
    pub id: ConditionId,
    pub field: FieldRef,
    pub operator: Operator,
    /// Comparison value as typed by the user. Empty means "not filled in yet".
    #[serde(default)]
    pub value: String,
    /// Ignored for the first condition of a chain.
    #[serde(default)]
    pub conjunction: Conjunction,
    #[serde(
        default,
        alias = "groupId",
        alias = "group",
        skip_serializing_if = "Option::is_none"
    )]
    pub group_id: Option<GroupId>,
}

impl FilterCondition {
    /// Creates an ungrouped condition joined with `and`.
    pub fn new(
        id: impl Into<String>,
        field: impl Into<FieldRef>,
        operator: Operator,
        value: impl Into<String>,
    ) -> Self {
        FilterCondition {
            id: ConditionId(id.into()),
            field: field.into(),
            operator,
            value: value.into(),
            conjunction: Conjunction::And,
            group_id: None,
        }
    }

    /// Sets the conjunction joining this condition to the previous one.
    pub fn with_conjunction(mut self, conjunction: Conjunction) -> Self {
        self.conjunction = conjunction;
        self
    }

    /// Places this condition in a group.
    pub fn in_group(mut self, group: impl Into<GroupId>) -> Self {
        self.group_id = Some(group.into());
        self
    }

    /// Parses a `field:operator[:value]` expression.
    ///
    /// The value is everything after the second colon, so it may itself
    /// contain colons. The field must be known.
    pub fn parse(id: impl Into<String>, expr: &str) -> Result<Self> {
        let invalid = |reason| SeekerError::InvalidExpression {
            expr: expr.to_string(),
            reason,
        };
        let mut parts = expr.splitn(3, ':');
        let field = parts
            .next()
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .ok_or_else(|| invalid("missing field"))?;
        let operator = parts
            .next()
            .map(str::trim)
            .ok_or_else(|| invalid("expected field:operator[:value]"))?;
        let value = parts.next().unwrap_or_default();

        let key: FieldKey = field.parse()?;
        let operator: Operator = operator.parse()?;
        Ok(FilterCondition::new(id, key, operator, value))
    }

    /// Returns `true` if the condition is still being edited and therefore
    /// passes every record.
    pub fn is_vacuous(&self) -> bool {
        !self.operator.is_emptiness_check() && self.value.is_empty()
    }

    /// Evaluates this condition against a record.
    ///
    /// Never fails: an unknown field, an unparseable value or an unfilled
    /// value all make the condition pass; a missing record value makes it
    /// fail (except for the emptiness checks and negated select operators).
    pub fn matches<T: Seekable>(&self, item: &T, clock: &Clock) -> bool {
        let Some(key) = self.field.key() else {
            return true;
        };
        let value = item.field_value(key);

        match self.operator {
            Operator::IsEmpty => return value.is_empty(),
            Operator::IsNotEmpty => return !value.is_empty(),
            _ => {}
        }
        if self.value.is_empty() {
            return true;
        }

        match key.field_type() {
            FieldType::Text => self.match_text(&value),
            FieldType::Select | FieldType::Boolean | FieldType::Tags => self.match_select(&value),
            FieldType::Date => self.match_date(&value, clock),
            FieldType::Number => self.match_number(&value),
        }
    }

    fn match_text(&self, value: &Value<'_>) -> bool {
        let field = value.to_text().to_lowercase();
        let needle = self.value.to_lowercase();
        match self.operator {
            Operator::NotContains => !field.contains(&needle),
            Operator::Equals | Operator::Is => field == needle,
            Operator::NotEquals | Operator::IsNot => field != needle,
            Operator::StartsWith => field.starts_with(&needle),
            Operator::EndsWith => field.ends_with(&needle),
            // Contains, and anything not meaningful for text
            _ => field.contains(&needle),
        }
    }

    fn match_select(&self, value: &Value<'_>) -> bool {
        let hit = match value {
            Value::List(items) => items.iter().any(|item| *item == self.value),
            other => other.select_text() == Some(Cow::Borrowed(self.value.as_str())),
        };
        match self.operator {
            Operator::HasNoneOf | Operator::IsNot | Operator::NotEquals => !hit,
            _ => hit,
        }
    }

    fn match_date(&self, value: &Value<'_>, clock: &Clock) -> bool {
        let Ok(bucket) = self.value.parse::<DateBucket>() else {
            return true;
        };
        value
            .as_timestamp()
            .is_some_and(|ts| bucket.contains(ts, clock))
    }

    fn match_number(&self, value: &Value<'_>) -> bool {
        let Ok(target) = self.value.trim().parse::<f64>() else {
            return true;
        };
        value
            .as_number()
            .and_then(|n| n.compare(Number::F64(target)))
            .is_some_and(|ordering| self.operator.eval_ordering(ordering))
    }
}
