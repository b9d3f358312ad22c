//! Saved views, loaded from a YAML file.
//!
//! ```yaml
//! views:
//!   hot:
//!     search: ""
//!     filters:
//!       - field: stage
//!         operator: is
//!         value: qualified
//!     groups:
//!       - id: inbound
//!         label: Inbound
//!         conditions:
//!           - { field: source, operator: is, value: referral }
//!           - { field: source, operator: is, value: website }
//!     sorts:
//!       - { field: lead_score, direction: desc }
//! ```
//!
//! Group members are listed under their group, so they need neither a
//! `group_id` nor a conjunction.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use leadgrid_seeker::{
    Conjunction, FilterCondition, FilterGroup, FilterSet, GroupId, SortRule, SortRules, ViewState,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading saved views.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid views file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no saved view named '{0}'")]
    UnknownView(String),
}

/// A group as written in the views file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGroup {
    pub id: GroupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
}

/// One named view definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedView {
    pub search: String,
    pub filters: Vec<FilterCondition>,
    pub groups: Vec<SavedGroup>,
    pub sorts: Vec<SortRule>,
}

impl SavedView {
    /// Builds the view state this definition describes.
    pub fn to_view_state(&self) -> ViewState {
        let mut conditions: Vec<FilterCondition> = self
            .filters
            .iter()
            .cloned()
            .map(|mut condition| {
                condition.group_id = None;
                condition
            })
            .collect();
        let mut groups = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            conditions.extend(group.conditions.iter().cloned().map(|condition| {
                condition
                    .with_conjunction(Conjunction::Or)
                    .in_group(group.id.clone())
            }));
            let mut filter_group = FilterGroup::new(group.id.clone());
            filter_group.label = group.label.clone();
            groups.push(filter_group);
        }

        ViewState {
            search: self.search.clone(),
            filters: FilterSet::from_parts(conditions, groups).collect_empty_groups(),
            sorts: SortRules::from(self.sorts.clone()),
        }
    }
}

/// The contents of a views file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedViews {
    #[serde(default)]
    pub views: BTreeMap<String, SavedView>,
}

impl SavedViews {
    /// Parses a views document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(SavedViews::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads a views file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// View names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    /// The view state for `name`.
    pub fn view(&self, name: &str) -> Result<ViewState, ConfigError> {
        self.views
            .get(name)
            .map(SavedView::to_view_state)
            .ok_or_else(|| ConfigError::UnknownView(name.to_string()))
    }
}
