//! Field keys and the accessor table vocabulary.
//!
//! [`FieldKey`] is the closed set of lead fields the engine can filter, sort
//! and search on. Adding a field means adding a variant, and the compiler then
//! points at every accessor and type table that has to learn about it.
//!
//! [`FieldRef`] wraps a key as it appears in saved filter and sort rules. A
//! rule may outlive the field it names; such references resolve to
//! [`FieldRef::Unknown`] and evaluate to [`Value::Null`](crate::Value::Null).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SeekerError;
use crate::op::Operator;
use crate::pipeline::Milestone;
use crate::traits::Seekable;
use crate::value::Value;

/// A known lead field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Id,
    Email,
    /// Derived display name.
    Name,
    FirstName,
    LastName,
    FullName,
    Title,
    Company,
    Industry,
    CompanySize,
    Location,
    Website,
    LinkedinUrl,
    Phone,
    Notes,
    Stage,
    Source,
    Tags,
    EmailVerified,
    DoNotContact,
    LeadScore,
    DealValue,
    /// Completion flag of a milestone.
    Milestone(Milestone),
    /// Completion timestamp of a milestone.
    MilestoneAt(Milestone),
    /// Derived deepest completed milestone.
    PipelineStage,
    /// Derived: `last_activity_at`, falling back to `updated_at`.
    LastActivity,
    CreatedAt,
    UpdatedAt,
}

/// How a field is compared and which operators it offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Free text, case-insensitive matching.
    Text,
    /// Enumerated value, exact matching.
    Select,
    /// Boolean, matched as the literals `"true"` / `"false"`.
    Boolean,
    /// Numeric value.
    Number,
    /// Timestamp, matched against relative date buckets.
    Date,
    /// String array, matched element-wise.
    Tags,
}

const SIMPLE_KEYS: [FieldKey; 24] = [
    FieldKey::Id,
    FieldKey::Email,
    FieldKey::Name,
    FieldKey::FirstName,
    FieldKey::LastName,
    FieldKey::FullName,
    FieldKey::Title,
    FieldKey::Company,
    FieldKey::Industry,
    FieldKey::CompanySize,
    FieldKey::Location,
    FieldKey::Website,
    FieldKey::LinkedinUrl,
    FieldKey::Phone,
    FieldKey::Notes,
    FieldKey::Stage,
    FieldKey::Source,
    FieldKey::Tags,
    FieldKey::EmailVerified,
    FieldKey::DoNotContact,
    FieldKey::LeadScore,
    FieldKey::DealValue,
    FieldKey::PipelineStage,
    FieldKey::LastActivity,
];

impl FieldKey {
    /// Every field key: plain fields, then milestone flags and timestamps in
    /// funnel order, then record timestamps.
    pub fn all() -> Vec<FieldKey> {
        let mut keys = SIMPLE_KEYS.to_vec();
        keys.extend(Milestone::ALL.into_iter().map(FieldKey::Milestone));
        keys.extend(Milestone::ALL.into_iter().map(FieldKey::MilestoneAt));
        keys.extend([FieldKey::CreatedAt, FieldKey::UpdatedAt]);
        keys
    }

    /// Canonical snake_case name, identical to the record's column name for
    /// stored fields.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Id => "id",
            FieldKey::Email => "email",
            FieldKey::Name => "name",
            FieldKey::FirstName => "first_name",
            FieldKey::LastName => "last_name",
            FieldKey::FullName => "full_name",
            FieldKey::Title => "title",
            FieldKey::Company => "company",
            FieldKey::Industry => "industry",
            FieldKey::CompanySize => "company_size",
            FieldKey::Location => "location",
            FieldKey::Website => "website",
            FieldKey::LinkedinUrl => "linkedin_url",
            FieldKey::Phone => "phone",
            FieldKey::Notes => "notes",
            FieldKey::Stage => "stage",
            FieldKey::Source => "source",
            FieldKey::Tags => "tags",
            FieldKey::EmailVerified => "email_verified",
            FieldKey::DoNotContact => "do_not_contact",
            FieldKey::LeadScore => "lead_score",
            FieldKey::DealValue => "deal_value",
            FieldKey::Milestone(m) => m.as_str(),
            FieldKey::MilestoneAt(m) => m.at_field(),
            FieldKey::PipelineStage => "pipeline_stage",
            FieldKey::LastActivity => "last_activity",
            FieldKey::CreatedAt => "created_at",
            FieldKey::UpdatedAt => "updated_at",
        }
    }

    pub fn field_type(self) -> FieldType {
        match self {
            FieldKey::Id
            | FieldKey::Email
            | FieldKey::Name
            | FieldKey::FirstName
            | FieldKey::LastName
            | FieldKey::FullName
            | FieldKey::Title
            | FieldKey::Company
            | FieldKey::Industry
            | FieldKey::Location
            | FieldKey::Website
            | FieldKey::LinkedinUrl
            | FieldKey::Phone
            | FieldKey::Notes => FieldType::Text,
            FieldKey::CompanySize
            | FieldKey::Stage
            | FieldKey::Source
            | FieldKey::PipelineStage => FieldType::Select,
            FieldKey::Tags => FieldType::Tags,
            FieldKey::EmailVerified | FieldKey::DoNotContact | FieldKey::Milestone(_) => {
                FieldType::Boolean
            }
            FieldKey::LeadScore | FieldKey::DealValue => FieldType::Number,
            FieldKey::MilestoneAt(_)
            | FieldKey::LastActivity
            | FieldKey::CreatedAt
            | FieldKey::UpdatedAt => FieldType::Date,
        }
    }

    /// Returns `true` for fields computed from other fields.
    pub fn is_derived(self) -> bool {
        matches!(
            self,
            FieldKey::Name | FieldKey::PipelineStage | FieldKey::LastActivity
        )
    }

    /// Reads this field from a record.
    pub fn value<T: Seekable>(self, item: &T) -> Value<'_> {
        item.field_value(self)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = SeekerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(key) = SIMPLE_KEYS.into_iter().find(|key| key.as_str() == s) {
            return Ok(key);
        }
        match s {
            "created_at" => return Ok(FieldKey::CreatedAt),
            "updated_at" => return Ok(FieldKey::UpdatedAt),
            // Stored column name of the derived field.
            "last_activity_at" => return Ok(FieldKey::LastActivity),
            _ => {}
        }
        for milestone in Milestone::ALL {
            if milestone.as_str() == s {
                return Ok(FieldKey::Milestone(milestone));
            }
            if milestone.at_field() == s {
                return Ok(FieldKey::MilestoneAt(milestone));
            }
        }
        Err(SeekerError::UnknownField(s.to_string()))
    }
}

impl FieldType {
    /// The exact operator choices offered for this field type.
    pub fn operators(self) -> &'static [Operator] {
        use Operator::*;
        match self {
            FieldType::Text => &[
                Contains,
                NotContains,
                Equals,
                NotEquals,
                Is,
                IsNot,
                StartsWith,
                EndsWith,
                IsEmpty,
                IsNotEmpty,
            ],
            FieldType::Select | FieldType::Boolean | FieldType::Tags => {
                &[HasAnyOf, HasNoneOf, Is, IsNot, IsEmpty, IsNotEmpty]
            }
            FieldType::Date => &[Within, IsEmpty, IsNotEmpty],
            FieldType::Number => &[
                Equals,
                NotEquals,
                GreaterThan,
                LessThan,
                AtLeast,
                AtMost,
                IsEmpty,
                IsNotEmpty,
            ],
        }
    }

    /// Operator a new filter row starts with.
    pub fn default_operator(self) -> Operator {
        match self {
            FieldType::Text => Operator::Contains,
            FieldType::Select | FieldType::Boolean | FieldType::Tags => Operator::Is,
            FieldType::Date => Operator::Within,
            FieldType::Number => Operator::Equals,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Select => "select",
            FieldType::Boolean => "boolean",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Tags => "tags",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field as named by a saved rule: either a known key or a stale name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldRef {
    Known(FieldKey),
    /// A name that no longer maps to a field.
    Unknown(String),
}

impl FieldRef {
    /// Resolves a field name, keeping unknown names instead of failing.
    pub fn resolve(name: &str) -> Self {
        match name.parse::<FieldKey>() {
            Ok(key) => FieldRef::Known(key),
            Err(_) => FieldRef::Unknown(name.to_string()),
        }
    }

    pub fn key(&self) -> Option<FieldKey> {
        match self {
            FieldRef::Known(key) => Some(*key),
            FieldRef::Unknown(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldRef::Known(key) => key.as_str(),
            FieldRef::Unknown(name) => name,
        }
    }

    /// Reads the field from a record. Unknown fields read as null.
    pub fn value<'a, T: Seekable>(&self, item: &'a T) -> Value<'a> {
        match self {
            FieldRef::Known(key) => item.field_value(*key),
            FieldRef::Unknown(_) => Value::Null,
        }
    }
}

impl From<FieldKey> for FieldRef {
    fn from(key: FieldKey) -> Self {
        FieldRef::Known(key)
    }
}

impl From<String> for FieldRef {
    fn from(name: String) -> Self {
        FieldRef::resolve(&name)
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        FieldRef::resolve(name)
    }
}

impl From<FieldRef> for String {
    fn from(field: FieldRef) -> Self {
        match field {
            FieldRef::Known(key) => key.as_str().to_string(),
            FieldRef::Unknown(name) => name,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
