//! Free-text search across a fixed set of fields.

use crate::field::FieldKey;
use crate::traits::Seekable;

/// Fields a search query is matched against.
pub const SEARCH_FIELDS: [FieldKey; 8] = [
    FieldKey::Name,
    FieldKey::FirstName,
    FieldKey::LastName,
    FieldKey::Email,
    FieldKey::Company,
    FieldKey::Title,
    FieldKey::Industry,
    FieldKey::Stage,
];

/// A normalized search query.
///
/// The raw input is trimmed and lowercased once; a blank query matches every
/// record.
///
/// ```
/// use leadgrid_seeker::{Lead, SearchQuery};
///
/// let mut lead = Lead::new("l1", "ada@example.test");
/// lead.full_name = Some("Ada Lovelace".into());
///
/// assert!(SearchQuery::new("  LOVE ").matches(&lead));
/// assert!(SearchQuery::new("   ").matches(&lead));
/// assert!(!SearchQuery::new("babbage").matches(&lead));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    needle: String,
}

impl SearchQuery {
    pub fn new(raw: &str) -> Self {
        SearchQuery {
            needle: raw.trim().to_lowercase(),
        }
    }

    /// Returns `true` if the query matches everything.
    pub fn is_blank(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }

    /// Case-insensitive substring match against any of [`SEARCH_FIELDS`].
    pub fn matches<T: Seekable>(&self, item: &T) -> bool {
        if self.is_blank() {
            return true;
        }
        SEARCH_FIELDS.iter().any(|key| {
            item.field_value(*key)
                .as_str()
                .is_some_and(|text| text.to_lowercase().contains(&self.needle))
        })
    }
}

/// Shorthand for `SearchQuery::new(query).matches(item)`.
pub fn matches_search<T: Seekable>(query: &str, item: &T) -> bool {
    SearchQuery::new(query).matches(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Lead;

    fn lead() -> Lead {
        Lead {
            first_name: Some("Grace".into()),
            last_name: Some("Hopper".into()),
            company: Some("Remington Rand".into()),
            stage: Some("qualified".into()),
            notes: Some("met at the cobol summit".into()),
            ..Lead::new("l1", "grace@navy.test")
        }
    }

    #[test]
    fn matches_derived_name() {
        assert!(matches_search("grace hopper", &lead()));
        assert!(matches_search("HOPPER", &lead()));
    }

    #[test]
    fn matches_other_fields() {
        assert!(matches_search("navy", &lead()));
        assert!(matches_search("rand", &lead()));
        assert!(matches_search("qualif", &lead()));
    }

    #[test]
    fn ignores_fields_outside_the_set() {
        assert!(!matches_search("cobol", &lead()));
    }

    #[test]
    fn blank_query_matches() {
        assert!(matches_search("", &lead()));
        assert!(matches_search(" \t ", &Lead::default()));
    }

    #[test]
    fn unknown_name_sentinel_is_searchable() {
        assert!(matches_search("unknown", &Lead::default()));
    }
}
