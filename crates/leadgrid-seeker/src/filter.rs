//! Filter composition: the ungrouped chain plus OR-groups.
//!
//! A [`FilterSet`] combines its conditions with fixed logic:
//!
//! ```text
//! match = fold(ungrouped, left to right, per-step conjunction)
//!       ∧ (∀ group: at least one of its conditions matches)
//! ```
//!
//! - **Ungrouped chain**: conditions without a group, folded strictly left to
//!   right. There is no precedence: `A and B or C` is `(A ∧ B) ∨ C`, and
//!   `A or B and C` is `(A ∨ B) ∧ C`. The first conjunction is ignored.
//! - **Groups**: each group is OR'd internally and AND'd against the chain and
//!   every other group. Empty groups are ignored.
//!
//! There is deliberately no way to OR two groups together.
//!
//! Every edit consumes the set and returns the edited copy, so a view state
//! can be held as a plain value and compared or cached by equality.

use serde::{Deserialize, Serialize};

use crate::condition::{ConditionId, FilterCondition, GroupId};
use crate::date::Clock;
use crate::field::FieldRef;
use crate::op::{Conjunction, Operator};
use crate::traits::Seekable;

/// A named set of conditions OR'd together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub id: GroupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FilterGroup {
    pub fn new(id: impl Into<GroupId>) -> Self {
        FilterGroup {
            id: id.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Ordered filter conditions and the groups they may belong to.
///
/// # Example
///
/// ```
/// use leadgrid_seeker::{Clock, FieldKey, FilterSet, Lead, Operator};
///
/// let filters = FilterSet::new()
///     .and(FieldKey::Company, Operator::Contains, "acme")
///     .or(FieldKey::Stage, Operator::Is, "won");
///
/// let mut lead = Lead::new("l1", "bo@initech.test");
/// lead.stage = Some("won".into());
/// assert!(filters.matches(&lead, &Clock::system()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFilterSet")]
pub struct FilterSet {
    conditions: Vec<FilterCondition>,
    groups: Vec<FilterGroup>,
}

#[derive(Deserialize)]
struct RawFilterSet {
    #[serde(default)]
    conditions: Vec<FilterCondition>,
    #[serde(default)]
    groups: Vec<FilterGroup>,
}

impl From<RawFilterSet> for FilterSet {
    fn from(raw: RawFilterSet) -> Self {
        FilterSet::from_parts(raw.conditions, raw.groups)
    }
}

impl FilterSet {
    /// Creates an empty filter set. An empty set matches every record.
    pub fn new() -> Self {
        FilterSet::default()
    }

    /// Builds a set from stored parts, assigning ids to conditions that
    /// arrived without one.
    pub fn from_parts(conditions: Vec<FilterCondition>, groups: Vec<FilterGroup>) -> Self {
        conditions
            .into_iter()
            .fold(FilterSet::new().with_groups(groups), FilterSet::with_condition)
    }

    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    pub fn groups(&self) -> &[FilterGroup] {
        &self.groups
    }

    /// Returns `true` when there are no conditions at all.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Conditions without a group, in chain order.
    pub fn ungrouped(&self) -> impl Iterator<Item = &FilterCondition> {
        self.conditions.iter().filter(|c| c.group_id.is_none())
    }

    /// Conditions belonging to `group`, in insertion order.
    pub fn members<'a>(&'a self, group: &'a GroupId) -> impl Iterator<Item = &'a FilterCondition> {
        self.conditions
            .iter()
            .filter(move |c| c.group_id.as_ref() == Some(group))
    }

    pub fn condition(&self, id: &ConditionId) -> Option<&FilterCondition> {
        self.conditions.iter().find(|c| &c.id == id)
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Appends a condition. A missing or duplicate id is replaced with a
    /// fresh one.
    pub fn with_condition(mut self, mut condition: FilterCondition) -> Self {
        if condition.id.is_empty() || self.condition(&condition.id).is_some() {
            condition.id = self.next_condition_id();
        }
        self.conditions.push(condition);
        self
    }

    /// Appends an ungrouped condition joined with `and`.
    pub fn and(self, field: impl Into<FieldRef>, op: Operator, value: impl Into<String>) -> Self {
        self.push_chained(Conjunction::And, field.into(), op, value.into())
    }

    /// Appends an ungrouped condition joined with `or`.
    pub fn or(self, field: impl Into<FieldRef>, op: Operator, value: impl Into<String>) -> Self {
        self.push_chained(Conjunction::Or, field.into(), op, value.into())
    }

    /// Appends a group. A group with an id already present is ignored.
    pub fn with_group(mut self, group: FilterGroup) -> Self {
        if !self.groups.iter().any(|g| g.id == group.id) {
            self.groups.push(group);
        }
        self
    }

    fn with_groups(self, groups: Vec<FilterGroup>) -> Self {
        groups.into_iter().fold(self, FilterSet::with_group)
    }

    /// Appends a condition to `group`, creating the group if needed.
    pub fn add_to_group(
        self,
        group: impl Into<GroupId>,
        field: impl Into<FieldRef>,
        op: Operator,
        value: impl Into<String>,
    ) -> Self {
        let group = group.into();
        let condition = FilterCondition::new("", field, op, value)
            .with_conjunction(Conjunction::Or)
            .in_group(group.clone());
        self.with_group(FilterGroup::new(group))
            .with_condition(condition)
    }

    /// Replaces the condition `id` with the result of `edit`. Unknown ids
    /// leave the set unchanged. The id itself cannot be changed.
    pub fn update_condition<F>(mut self, id: &ConditionId, edit: F) -> Self
    where
        F: FnOnce(FilterCondition) -> FilterCondition,
    {
        if let Some(slot) = self.conditions.iter_mut().find(|c| &c.id == id) {
            let mut edited = edit(slot.clone());
            edited.id = id.clone();
            *slot = edited;
        }
        self
    }

    /// Removes the condition `id`. If it was the last member of its group,
    /// the group goes too.
    pub fn remove_condition(mut self, id: &ConditionId) -> Self {
        let Some(index) = self.conditions.iter().position(|c| &c.id == id) else {
            return self;
        };
        let removed = self.conditions.remove(index);
        if let Some(group) = removed.group_id {
            if self.members(&group).next().is_none() {
                self.groups.retain(|g| g.id != group);
            }
        }
        self
    }

    /// Removes a group together with its conditions.
    pub fn remove_group(mut self, id: &GroupId) -> Self {
        self.groups.retain(|g| &g.id != id);
        self.conditions.retain(|c| c.group_id.as_ref() != Some(id));
        self
    }

    /// Drops groups that have no conditions left.
    pub fn collect_empty_groups(mut self) -> Self {
        let conditions = &self.conditions;
        self.groups
            .retain(|g| conditions.iter().any(|c| c.group_id.as_ref() == Some(&g.id)));
        self
    }

    fn push_chained(
        self,
        conjunction: Conjunction,
        field: FieldRef,
        op: Operator,
        value: String,
    ) -> Self {
        let condition = FilterCondition::new("", field, op, value).with_conjunction(conjunction);
        self.with_condition(condition)
    }

    fn next_condition_id(&self) -> ConditionId {
        (self.conditions.len() + 1..)
            .map(|n| ConditionId(format!("c{n}")))
            .find(|id| self.condition(id).is_none())
            .unwrap_or_default()
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Returns `true` if `item` passes the chain and every non-empty group.
    pub fn matches<T: Seekable>(&self, item: &T, clock: &Clock) -> bool {
        let chain = self.ungrouped().fold(None, |acc, condition| {
            let hit = condition.matches(item, clock);
            Some(match acc {
                None => hit,
                Some(acc) => condition.conjunction.combine(acc, hit),
            })
        });
        if chain == Some(false) {
            return false;
        }

        self.groups.iter().all(|group| {
            let mut members = self.members(&group.id).peekable();
            members.peek().is_none() || members.any(|c| c.matches(item, clock))
        })
    }

    /// Keeps the records that match, preserving their order.
    pub fn apply<'a, T: Seekable>(&self, items: &'a [T], clock: &Clock) -> Vec<&'a T> {
        items
            .iter()
            .filter(|item| self.matches(*item, clock))
            .collect()
    }

    /// Filters an already-narrowed list of references in place.
    pub fn retain<T: Seekable>(&self, items: &mut Vec<&T>, clock: &Clock) {
        items.retain(|item| self.matches(*item, clock));
    }
}
