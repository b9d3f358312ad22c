//! The lead record and partial updates to it.
//!
//! [`Lead`] mirrors a row of the hosted `leads` table. Its [`Seekable`]
//! implementation is the field accessor table: one exhaustive match over
//! [`FieldKey`], with the derived fields (display name, pipeline stage, last
//! activity) computed on the fly.
//!
//! [`LeadPatch`] is the "partial fields" payload exchanged with the store for
//! updates and creates. It is a JSON object keyed by column name so it can be
//! sent over the wire unchanged.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SeekerError};
use crate::field::{FieldKey, FieldType};
use crate::pipeline::{deepest_stage, Milestone};
use crate::traits::Seekable;
use crate::value::{Number, Timestamp, Value};

/// Display name used when a lead has no name parts at all.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A lead (contact) row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lead {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    /// Coarse status, independent of the milestone flags.
    pub stage: Option<String>,
    pub source: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub email_verified: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub do_not_contact: bool,
    pub lead_score: Option<i64>,
    pub deal_value: Option<f64>,

    #[serde(deserialize_with = "null_as_default")]
    pub email_sent: bool,
    pub email_sent_at: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub replied: bool,
    pub replied_at: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_booked: bool,
    pub meeting_booked_at: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_held: bool,
    pub meeting_held_at: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub proposal_sent: bool,
    pub proposal_sent_at: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub negotiating: bool,
    pub negotiating_at: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub closed_won: bool,
    pub closed_won_at: Option<String>,

    pub last_activity_at: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    /// Soft-delete marker.
    pub deleted_at: Option<String>,

    /// Columns this build does not know about, preserved on round trips.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Lead {
    /// Creates an empty lead with the given id and email.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Lead {
            id: id.into(),
            email: email.into(),
            ..Lead::default()
        }
    }

    /// Display name: `full_name`, else first and last name joined by a single
    /// space (missing parts skipped), else [`UNKNOWN_NAME`].
    pub fn display_name(&self) -> Cow<'_, str> {
        if let Some(full) = self.full_name.as_deref().filter(|s| !s.is_empty()) {
            return Cow::Borrowed(full);
        }
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();
        match parts.as_slice() {
            [] => Cow::Borrowed(UNKNOWN_NAME),
            [single] => Cow::Borrowed(*single),
            _ => Cow::Owned(parts.join(" ")),
        }
    }

    /// Returns `true` once the lead has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn milestone(&self, milestone: Milestone) -> bool {
        match milestone {
            Milestone::EmailSent => self.email_sent,
            Milestone::Replied => self.replied,
            Milestone::MeetingBooked => self.meeting_booked,
            Milestone::MeetingHeld => self.meeting_held,
            Milestone::ProposalSent => self.proposal_sent,
            Milestone::Negotiating => self.negotiating,
            Milestone::ClosedWon => self.closed_won,
        }
    }

    pub fn milestone_at(&self, milestone: Milestone) -> Option<&str> {
        match milestone {
            Milestone::EmailSent => self.email_sent_at.as_deref(),
            Milestone::Replied => self.replied_at.as_deref(),
            Milestone::MeetingBooked => self.meeting_booked_at.as_deref(),
            Milestone::MeetingHeld => self.meeting_held_at.as_deref(),
            Milestone::ProposalSent => self.proposal_sent_at.as_deref(),
            Milestone::Negotiating => self.negotiating_at.as_deref(),
            Milestone::ClosedWon => self.closed_won_at.as_deref(),
        }
    }

    /// Returns a copy of this lead with `patch` applied.
    ///
    /// Fails if the patch assigns a value of the wrong shape to a known
    /// column (a string to `lead_score`, say).
    pub fn apply_patch(&self, patch: &LeadPatch) -> Result<Lead> {
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = &mut value {
            for (name, field_value) in patch.iter() {
                map.insert(name.clone(), field_value.clone());
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Builds a lead from a patch alone.
    pub fn from_patch(patch: &LeadPatch) -> Result<Lead> {
        Lead::default().apply_patch(patch)
    }

    fn last_activity(&self) -> Value<'_> {
        match Value::timestamp(self.last_activity_at.as_deref()) {
            Value::Null => Value::timestamp(self.updated_at.as_deref()),
            value => value,
        }
    }
}

impl Seekable for Lead {
    fn field_value(&self, key: FieldKey) -> Value<'_> {
        match key {
            FieldKey::Id => Value::text(Some(self.id.as_str())),
            FieldKey::Email => Value::text(Some(self.email.as_str())),
            FieldKey::Name => Value::Text(self.display_name()),
            FieldKey::FirstName => Value::text(self.first_name.as_deref()),
            FieldKey::LastName => Value::text(self.last_name.as_deref()),
            FieldKey::FullName => Value::text(self.full_name.as_deref()),
            FieldKey::Title => Value::text(self.title.as_deref()),
            FieldKey::Company => Value::text(self.company.as_deref()),
            FieldKey::Industry => Value::text(self.industry.as_deref()),
            FieldKey::CompanySize => Value::text(self.company_size.as_deref()),
            FieldKey::Location => Value::text(self.location.as_deref()),
            FieldKey::Website => Value::text(self.website.as_deref()),
            FieldKey::LinkedinUrl => Value::text(self.linkedin_url.as_deref()),
            FieldKey::Phone => Value::text(self.phone.as_deref()),
            FieldKey::Notes => Value::text(self.notes.as_deref()),
            FieldKey::Stage => Value::text(self.stage.as_deref()),
            FieldKey::Source => Value::text(self.source.as_deref()),
            FieldKey::Tags => Value::List(&self.tags),
            FieldKey::EmailVerified => Value::Bool(self.email_verified),
            FieldKey::DoNotContact => Value::Bool(self.do_not_contact),
            FieldKey::LeadScore => self
                .lead_score
                .map_or(Value::Null, |n| Value::Number(Number::I64(n))),
            FieldKey::DealValue => self
                .deal_value
                .map_or(Value::Null, |n| Value::Number(Number::F64(n))),
            FieldKey::Milestone(m) => Value::Bool(self.milestone(m)),
            FieldKey::MilestoneAt(m) => Value::timestamp(self.milestone_at(m)),
            FieldKey::PipelineStage => deepest_stage(self)
                .map_or(Value::Null, |m| Value::Text(Cow::Borrowed(m.as_str()))),
            FieldKey::LastActivity => self.last_activity(),
            FieldKey::CreatedAt => Value::timestamp(self.created_at.as_deref()),
            FieldKey::UpdatedAt => Value::timestamp(self.updated_at.as_deref()),
        }
    }
}

/// Partial field assignments, keyed by column name.
///
/// Keys absent from the patch are left unchanged; a key mapped to JSON
/// `null` clears the column.
///
/// ```
/// use leadgrid_seeker::{FieldKey, Lead, LeadPatch};
///
/// let patch = LeadPatch::new()
///     .assign(FieldKey::Company, "Acme")?
///     .assign(FieldKey::LeadScore, "80")?;
/// let lead = Lead::new("l1", "ada@acme.test").apply_patch(&patch)?;
/// assert_eq!(lead.company.as_deref(), Some("Acme"));
/// assert_eq!(lead.lead_score, Some(80));
/// # Ok::<(), leadgrid_seeker::SeekerError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadPatch(serde_json::Map<String, serde_json::Value>);

impl LeadPatch {
    pub fn new() -> Self {
        LeadPatch::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Sets a column without any checks. Used for bookkeeping columns such as
    /// `updated_at` and for milestone pairs.
    pub fn with_raw(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Sets a field to an already-typed JSON value. Derived fields are
    /// rejected.
    pub fn set(self, key: FieldKey, value: impl Into<serde_json::Value>) -> Result<Self> {
        let name = writable_name(key)?;
        Ok(self.with_raw(name, value.into()))
    }

    /// Sets a field from its textual form, converting according to the
    /// field's type. An empty string or `null` clears nullable fields.
    pub fn assign(self, key: FieldKey, raw: &str) -> Result<Self> {
        let name = writable_name(key)?;
        let value = parse_raw(key, raw)?;
        Ok(self.with_raw(name, value))
    }

    /// Parses and applies a `field=value` assignment.
    pub fn assign_expr(self, expr: &str) -> Result<Self> {
        let (field, raw) = expr
            .split_once('=')
            .ok_or_else(|| SeekerError::InvalidExpression {
                expr: expr.to_string(),
                reason: "expected field=value",
            })?;
        let key: FieldKey = field.trim().parse()?;
        self.assign(key, raw)
    }

    /// Overlays `other` onto this patch; `other` wins on conflicts.
    pub fn merge(mut self, other: LeadPatch) -> Self {
        self.0.extend(other.0);
        self
    }
}

fn writable_name(key: FieldKey) -> Result<&'static str> {
    if key.is_derived() {
        return Err(SeekerError::DerivedField(key.as_str()));
    }
    Ok(key.as_str())
}

fn parse_raw(key: FieldKey, raw: &str) -> Result<serde_json::Value> {
    let trimmed = raw.trim();
    let invalid = || SeekerError::InvalidValue {
        field: key.as_str(),
        field_type: key.field_type().as_str(),
        value: raw.to_string(),
    };

    // id and email are the only non-nullable text columns.
    if matches!(key, FieldKey::Id | FieldKey::Email) {
        return Ok(serde_json::Value::String(trimmed.to_string()));
    }

    let clears = trimmed.is_empty() || trimmed == "null";
    match key.field_type() {
        FieldType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(serde_json::Value::Bool(true)),
            "false" | "no" | "0" | "" => Ok(serde_json::Value::Bool(false)),
            _ => Err(invalid()),
        },
        FieldType::Tags => Ok(serde_json::Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(|tag| serde_json::Value::String(tag.to_string()))
                .collect(),
        )),
        _ if clears => Ok(serde_json::Value::Null),
        FieldType::Text | FieldType::Select => {
            Ok(serde_json::Value::String(trimmed.to_string()))
        }
        FieldType::Number if key == FieldKey::LeadScore => trimmed
            .parse::<i64>()
            .map(serde_json::Value::from)
            .map_err(|_| invalid()),
        FieldType::Number => trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .ok_or_else(invalid),
        FieldType::Date => Timestamp::parse(trimmed)
            .map(|_| serde_json::Value::String(trimmed.to_string()))
            .ok_or_else(invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(full: Option<&str>, first: Option<&str>, last: Option<&str>) -> Lead {
        Lead {
            full_name: full.map(String::from),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            ..Lead::new("l1", "x@example.test")
        }
    }

    #[test]
    fn display_name_prefers_full_name() {
        let lead = named(Some("Ada Lovelace"), Some("Augusta"), Some("King"));
        assert_eq!(lead.display_name(), "Ada Lovelace");
    }

    #[test]
    fn display_name_joins_parts() {
        assert_eq!(named(None, Some("Ada"), Some("Lovelace")).display_name(), "Ada Lovelace");
        assert_eq!(named(None, None, Some("Lovelace")).display_name(), "Lovelace");
        assert_eq!(named(Some(""), Some("Ada"), Some("")).display_name(), "Ada");
    }

    #[test]
    fn display_name_falls_back_to_unknown() {
        assert_eq!(named(None, None, None).display_name(), UNKNOWN_NAME);
    }

    #[test]
    fn accessor_reads_derived_fields() {
        let mut lead = named(None, Some("Ada"), None);
        lead.replied = true;
        lead.updated_at = Some("2024-02-01".into());

        assert_eq!(lead.field_value(FieldKey::Name).as_str(), Some("Ada"));
        assert_eq!(
            lead.field_value(FieldKey::PipelineStage).as_str(),
            Some("replied")
        );
        // last_activity falls back to updated_at
        assert_eq!(
            lead.field_value(FieldKey::LastActivity).as_timestamp(),
            Timestamp::parse("2024-02-01")
        );
    }

    #[test]
    fn accessor_degrades_to_null() {
        let mut lead = Lead::new("l1", "x@example.test");
        lead.created_at = Some("not a date".into());
        assert!(lead.field_value(FieldKey::Company).is_null());
        assert!(lead.field_value(FieldKey::CreatedAt).is_null());
        assert!(lead.field_value(FieldKey::LeadScore).is_null());
        assert!(lead.field_value(FieldKey::PipelineStage).is_null());
    }

    #[test]
    fn deserializes_sparse_rows_with_nulls() {
        let lead: Lead = serde_json::from_str(
            r#"{"id":"l9","email":"a@b.test","tags":null,"replied":null,"crm_owner":"sam"}"#,
        )
        .unwrap();
        assert!(lead.tags.is_empty());
        assert!(!lead.replied);
        assert_eq!(lead.extra.get("crm_owner"), Some(&serde_json::json!("sam")));

        let back = serde_json::to_value(&lead).unwrap();
        assert_eq!(back["crm_owner"], "sam");
    }

    #[test]
    fn patch_assign_converts_by_type() {
        let patch = LeadPatch::new()
            .assign(FieldKey::DoNotContact, "yes")
            .unwrap()
            .assign(FieldKey::Tags, "vip, beta ,")
            .unwrap()
            .assign(FieldKey::DealValue, "1200.5")
            .unwrap()
            .assign(FieldKey::Title, "")
            .unwrap();
        let lead = Lead::new("l1", "x@example.test")
            .apply_patch(&patch)
            .unwrap();

        assert!(lead.do_not_contact);
        assert_eq!(lead.tags, vec!["vip".to_string(), "beta".to_string()]);
        assert_eq!(lead.deal_value, Some(1200.5));
        assert_eq!(lead.title, None);
    }

    #[test]
    fn patch_rejects_derived_and_malformed_values() {
        assert!(matches!(
            LeadPatch::new().assign(FieldKey::Name, "x"),
            Err(SeekerError::DerivedField("name"))
        ));
        assert!(matches!(
            LeadPatch::new().assign(FieldKey::LeadScore, "high"),
            Err(SeekerError::InvalidValue { .. })
        ));
        assert!(matches!(
            LeadPatch::new().assign(FieldKey::CreatedAt, "someday"),
            Err(SeekerError::InvalidValue { .. })
        ));
        assert!(LeadPatch::new().assign_expr("company").is_err());
    }

    #[test]
    fn apply_patch_rejects_wrong_shapes() {
        let patch = LeadPatch::new().with_raw("lead_score", serde_json::json!("lots"));
        assert!(Lead::default().apply_patch(&patch).is_err());
    }

    #[test]
    fn assign_expr_splits_on_first_equals() {
        let patch = LeadPatch::new().assign_expr("notes=a=b").unwrap();
        assert_eq!(patch.get("notes"), Some(&serde_json::json!("a=b")));
    }
}
