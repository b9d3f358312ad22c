//! The full view pipeline: search, then filter, then sort.
//!
//! [`ViewState`] bundles everything a user can configure about the table. It
//! is a plain value: each `with_*` method returns an edited copy, and
//! [`ViewState::apply`] is a pure function of the state, the records and the
//! clock, so callers can cache results keyed on the state.

use serde::{Deserialize, Serialize};

use crate::date::Clock;
use crate::filter::FilterSet;
use crate::pipeline::{deepest_stage, Milestone};
use crate::search::SearchQuery;
use crate::sort::SortRules;
use crate::traits::Seekable;

/// Search text, filters and sort rules of one table view.
///
/// # Example
///
/// ```
/// use leadgrid_seeker::{Clock, Dir, FieldKey, Lead, Operator, ViewState};
///
/// let mut alice = Lead::new("1", "alice@acme.test");
/// alice.full_name = Some("Alice".into());
/// alice.company = Some("Acme".into());
/// let mut bob = Lead::new("2", "bob@acme.test");
/// bob.full_name = Some("Bob".into());
/// bob.company = Some("Acme".into());
///
/// let view = ViewState::new()
///     .with_filters(|f| f.and(FieldKey::Company, Operator::Contains, "acme"))
///     .with_sorts(|s| s.by(FieldKey::Name, Dir::Desc));
///
/// let leads = [alice, bob];
/// let names: Vec<_> = view
///     .apply(&leads, &Clock::system())
///     .iter()
///     .map(|l| l.display_name())
///     .collect();
/// assert_eq!(names, ["Bob", "Alice"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub filters: FilterSet,
    #[serde(default)]
    pub sorts: SortRules,
}

impl ViewState {
    pub fn new() -> Self {
        ViewState::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Replaces the filters with the result of `edit`.
    pub fn with_filters<F>(mut self, edit: F) -> Self
    where
        F: FnOnce(FilterSet) -> FilterSet,
    {
        self.filters = edit(self.filters);
        self
    }

    /// Replaces the sort rules with the result of `edit`.
    pub fn with_sorts<F>(mut self, edit: F) -> Self
    where
        F: FnOnce(SortRules) -> SortRules,
    {
        self.sorts = edit(self.sorts);
        self
    }

    /// Returns `true` when neither search nor filters narrow the records.
    pub fn is_unfiltered(&self) -> bool {
        SearchQuery::new(&self.search).is_blank() && self.filters.is_empty()
    }

    /// Records that pass search and filters, in display order.
    pub fn apply<'a, T: Seekable>(&self, items: &'a [T], clock: &Clock) -> Vec<&'a T> {
        let query = SearchQuery::new(&self.search);
        let mut visible: Vec<&T> = items.iter().filter(|item| query.matches(*item)).collect();
        self.filters.retain(&mut visible, clock);
        self.sorts.sort(&mut visible);
        visible
    }

    /// Like [`apply`](Self::apply), with each record's deepest stage attached.
    pub fn rows<'a, T: Seekable>(&self, items: &'a [T], clock: &Clock) -> Vec<ViewRow<'a, T>> {
        self.apply(items, clock)
            .into_iter()
            .map(ViewRow::new)
            .collect()
    }
}

/// One displayed row.
#[derive(Debug, Serialize)]
pub struct ViewRow<'a, T> {
    #[serde(flatten)]
    pub record: &'a T,
    pub deepest_stage: Option<Milestone>,
}

impl<'a, T: Seekable> ViewRow<'a, T> {
    pub fn new(record: &'a T) -> Self {
        ViewRow {
            record,
            deepest_stage: deepest_stage(record),
        }
    }
}

impl<T> Clone for ViewRow<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ViewRow<'_, T> {}
