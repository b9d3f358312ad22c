//! Leadgrid Seeker - Filter, sort, search and pipeline engine for lead tables.
//!
//! Seeker takes a snapshot of lead records and a user-configured view and
//! deterministically produces the rows to display. It supports:
//!
//! - A closed field vocabulary with typed accessors, including derived fields
//!   (display name, deepest pipeline stage, last activity)
//! - Per-type operators: text, select, boolean, tags, relative dates, numbers
//! - An ungrouped condition chain plus OR-groups, with fixed combination logic
//! - Multi-key, stable sorting with a recency default
//! - Free-text search over a fixed set of fields
//! - A seven-stage pipeline with deepest-stage derivation and toggle patches
//!
//! Nothing here performs I/O or fails at evaluation time. Missing, null and
//! unparseable values degrade to neutral outcomes; only parsing user-supplied
//! vocabulary returns [`SeekerError`].
//!
//! # Quick Start
//!
//! ```rust
//! use leadgrid_seeker::{Clock, Dir, FieldKey, Lead, Operator, ViewState};
//!
//! let leads: Vec<Lead> = serde_json::from_str(r#"[
//!     {"id": "1", "email": "alice@acme.test", "full_name": "Alice",
//!      "company": "Acme", "stage": "new", "updated_at": "2024-01-01"},
//!     {"id": "2", "email": "bob@acme.test", "full_name": "Bob",
//!      "company": "Acme", "stage": "qualified", "updated_at": "2024-02-01"}
//! ]"#).unwrap();
//!
//! let view = ViewState::new()
//!     .with_filters(|f| f.and(FieldKey::Company, Operator::Contains, "acme"))
//!     .with_sorts(|s| s.by(FieldKey::UpdatedAt, Dir::Desc));
//!
//! let rows = view.apply(&leads, &Clock::system());
//! assert_eq!(rows[0].display_name(), "Bob");
//! assert_eq!(rows[1].display_name(), "Alice");
//! ```
//!
//! # Filter Semantics
//!
//! ```text
//! match = fold(ungrouped, left to right, per-step conjunction)
//!       ∧ (∀ group: at least one of its conditions matches)
//! ```
//!
//! - **Chain**: no precedence; `A or B and C` is `(A ∨ B) ∧ C`
//! - **Groups**: OR'd internally, AND'd with the chain and each other
//! - **Unfinished rows**: a condition with an empty value passes everything
//!
//! # Field Types and Operators
//!
//! | Type | Operators |
//! |------|-----------|
//! | Text | `contains`, `not_contains`, `equals`, `not_equals`, `is`, `is_not`, `starts_with`, `ends_with`, `is_empty`, `is_not_empty` |
//! | Select, Boolean, Tags | `has_any_of`, `has_none_of`, `is`, `is_not`, `is_empty`, `is_not_empty` |
//! | Date | `within` (`today`, `7d`, `30d`, `90d`), `is_empty`, `is_not_empty` |
//! | Number | `equals`, `not_equals`, `greater_than`, `less_than`, `at_least`, `at_most`, `is_empty`, `is_not_empty` |

mod condition;
mod date;
mod error;
mod field;
mod filter;
mod op;
mod pipeline;
mod record;
mod search;
mod sort;
mod traits;
mod value;
mod view;

// Re-export public API
pub use condition::{ConditionId, FilterCondition, GroupId};
pub use date::{Clock, DateBucket};
pub use error::{Result, SeekerError};
pub use field::{FieldKey, FieldRef, FieldType};
pub use filter::{FilterGroup, FilterSet};
pub use op::{Conjunction, Operator};
pub use pipeline::{deepest_stage, pipeline_progress, Milestone, StageProgress};
pub use record::{Lead, LeadPatch, UNKNOWN_NAME};
pub use search::{matches_search, SearchQuery, SEARCH_FIELDS};
pub use sort::{collate, default_order, Dir, SortKind, SortRule, SortRules};
pub use traits::Seekable;
pub use value::{Number, Timestamp, Value};
pub use view::{ViewRow, ViewState};
