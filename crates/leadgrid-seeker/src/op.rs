//! Filter operators and conjunctions.
//!
//! The [`Operator`] enum is the closed vocabulary a filter row can choose
//! from. Which operators are offered depends on the field type, see
//! [`FieldType::operators`](crate::FieldType::operators).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SeekerError;

/// Comparison operator for a filter condition.
///
/// Operators are grouped by the field types that offer them:
/// - **Text**: `Contains`, `NotContains`, `Equals`/`Is`, `NotEquals`/`IsNot`,
///   `StartsWith`, `EndsWith`
/// - **Select, boolean, tags**: `HasAnyOf`/`Is`, `HasNoneOf`/`IsNot`
/// - **Date**: `Within` (the condition value names a [`DateBucket`](crate::DateBucket))
/// - **Number**: `Equals`, `NotEquals`, `GreaterThan`, `LessThan`, `AtLeast`, `AtMost`
/// - **Every type**: `IsEmpty`, `IsNotEmpty`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Substring match.
    Contains,
    /// Negated substring match.
    NotContains,
    /// Exact match.
    Equals,
    /// Negated exact match.
    NotEquals,
    /// Exact match (select wording).
    Is,
    /// Negated exact match (select wording).
    IsNot,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
    /// Field value is falsy: null, blank text, `false` or an empty tag list.
    ///
    /// A number that is present is never empty, so `lead_score = 0` does
    /// not match.
    IsEmpty,
    /// Negation of [`Operator::IsEmpty`].
    IsNotEmpty,
    /// Select value equals the condition value.
    HasAnyOf,
    /// Select value differs from the condition value.
    HasNoneOf,
    /// Timestamp falls inside a date bucket.
    Within,
    /// Number strictly greater.
    GreaterThan,
    /// Number strictly smaller.
    LessThan,
    /// Number greater or equal.
    AtLeast,
    /// Number smaller or equal.
    AtMost,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Operator; 17] = [
        Operator::Contains,
        Operator::NotContains,
        Operator::Equals,
        Operator::NotEquals,
        Operator::Is,
        Operator::IsNot,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::IsEmpty,
        Operator::IsNotEmpty,
        Operator::HasAnyOf,
        Operator::HasNoneOf,
        Operator::Within,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::AtLeast,
        Operator::AtMost,
    ];

    /// Returns `true` for the two operators that ignore the condition value.
    pub fn is_emptiness_check(self) -> bool {
        matches!(self, Operator::IsEmpty | Operator::IsNotEmpty)
    }

    /// Returns `true` for operators that assert a mismatch.
    pub fn is_negated(self) -> bool {
        matches!(
            self,
            Operator::NotContains | Operator::NotEquals | Operator::IsNot | Operator::HasNoneOf
        )
    }

    /// Evaluates a numeric comparison given the ordering of field vs value.
    ///
    /// Non-numeric operators are read as equality checks.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            Operator::NotEquals | Operator::IsNot => ordering != Ordering::Equal,
            Operator::GreaterThan => ordering == Ordering::Greater,
            Operator::LessThan => ordering == Ordering::Less,
            Operator::AtLeast => ordering != Ordering::Less,
            Operator::AtMost => ordering != Ordering::Greater,
            _ => ordering == Ordering::Equal,
        }
    }

    /// Returns the wire name of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Is => "is",
            Operator::IsNot => "is_not",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
            Operator::HasAnyOf => "has_any_of",
            Operator::HasNoneOf => "has_none_of",
            Operator::Within => "within",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::AtLeast => "at_least",
            Operator::AtMost => "at_most",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = SeekerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| SeekerError::UnknownOperator(s.to_string()))
    }
}

/// How a condition joins the running result of the conditions before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    #[default]
    #[serde(alias = "AND")]
    And,
    #[serde(alias = "OR")]
    Or,
}

impl Conjunction {
    /// Folds `next` into `acc`.
    pub fn combine(self, acc: bool, next: bool) -> bool {
        match self {
            Conjunction::And => acc && next,
            Conjunction::Or => acc || next,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Conjunction::And => "and",
            Conjunction::Or => "or",
        }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
        assert!("regex".parse::<Operator>().is_err());
    }

    #[test]
    fn serde_names_match_display_names() {
        for op in Operator::ALL {
            let json = serde_json::to_string(&op).unwrap();
            assert_eq!(json, format!("\"{}\"", op.as_str()));
        }
    }

    #[test]
    fn op_eval_ordering() {
        assert!(Operator::Equals.eval_ordering(Ordering::Equal));
        assert!(!Operator::Equals.eval_ordering(Ordering::Less));
        assert!(Operator::NotEquals.eval_ordering(Ordering::Greater));
        assert!(!Operator::NotEquals.eval_ordering(Ordering::Equal));

        assert!(Operator::GreaterThan.eval_ordering(Ordering::Greater));
        assert!(!Operator::GreaterThan.eval_ordering(Ordering::Equal));
        assert!(Operator::AtLeast.eval_ordering(Ordering::Equal));
        assert!(!Operator::AtLeast.eval_ordering(Ordering::Less));

        assert!(Operator::LessThan.eval_ordering(Ordering::Less));
        assert!(Operator::AtMost.eval_ordering(Ordering::Equal));
        assert!(!Operator::AtMost.eval_ordering(Ordering::Greater));
    }

    #[test]
    fn conjunction_combine() {
        assert!(Conjunction::Or.combine(false, true));
        assert!(!Conjunction::And.combine(false, true));
        assert!(Conjunction::And.combine(true, true));
        assert_eq!(Conjunction::default(), Conjunction::And);
    }
}
