//! Pipeline milestones and the deepest-stage derivation.
//!
//! A lead moves through a fixed sequence of milestones. Each milestone is a
//! boolean completion flag with a companion timestamp column (`replied` /
//! `replied_at`). Sales processes are not linear, so nothing here enforces
//! that earlier milestones are complete when a later one is: the deepest stage
//! is simply the rightmost completed flag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date::Clock;
use crate::error::SeekerError;
use crate::field::FieldKey;
use crate::record::LeadPatch;
use crate::traits::Seekable;
use crate::value::Timestamp;

/// One funnel milestone. Declaration order is funnel depth.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    EmailSent,
    Replied,
    MeetingBooked,
    MeetingHeld,
    ProposalSent,
    Negotiating,
    ClosedWon,
}

impl Milestone {
    /// The fixed funnel order, shallowest first.
    pub const ALL: [Milestone; 7] = [
        Milestone::EmailSent,
        Milestone::Replied,
        Milestone::MeetingBooked,
        Milestone::MeetingHeld,
        Milestone::ProposalSent,
        Milestone::Negotiating,
        Milestone::ClosedWon,
    ];

    /// Position in the funnel, starting at 0.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name of the completion flag column.
    pub fn as_str(self) -> &'static str {
        match self {
            Milestone::EmailSent => "email_sent",
            Milestone::Replied => "replied",
            Milestone::MeetingBooked => "meeting_booked",
            Milestone::MeetingHeld => "meeting_held",
            Milestone::ProposalSent => "proposal_sent",
            Milestone::Negotiating => "negotiating",
            Milestone::ClosedWon => "closed_won",
        }
    }

    /// Name of the companion timestamp column.
    pub fn at_field(self) -> &'static str {
        match self {
            Milestone::EmailSent => "email_sent_at",
            Milestone::Replied => "replied_at",
            Milestone::MeetingBooked => "meeting_booked_at",
            Milestone::MeetingHeld => "meeting_held_at",
            Milestone::ProposalSent => "proposal_sent_at",
            Milestone::Negotiating => "negotiating_at",
            Milestone::ClosedWon => "closed_won_at",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Milestone::EmailSent => "Email sent",
            Milestone::Replied => "Replied",
            Milestone::MeetingBooked => "Meeting booked",
            Milestone::MeetingHeld => "Meeting held",
            Milestone::ProposalSent => "Proposal sent",
            Milestone::Negotiating => "Negotiating",
            Milestone::ClosedWon => "Closed won",
        }
    }

    /// Returns `true` if `item` has this milestone's flag set.
    pub fn is_complete<T: Seekable>(self, item: &T) -> bool {
        item.field_value(FieldKey::Milestone(self)).as_bool() == Some(true)
    }

    /// Patch that sets the flag and its timestamp together: `now` when
    /// completing, null when un-completing.
    pub fn set_patch(self, done: bool, clock: &Clock) -> LeadPatch {
        let at = if done {
            serde_json::Value::String(clock.now_rfc3339())
        } else {
            serde_json::Value::Null
        };
        LeadPatch::new()
            .with_raw(self.as_str(), serde_json::Value::Bool(done))
            .with_raw(self.at_field(), at)
    }

    /// Patch that flips the milestone on `item`.
    pub fn toggle_patch<T: Seekable>(self, item: &T, clock: &Clock) -> LeadPatch {
        self.set_patch(!self.is_complete(item), clock)
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Milestone {
    type Err = SeekerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Milestone::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| SeekerError::UnknownMilestone(s.to_string()))
    }
}

/// The last milestone in funnel order whose flag is set, if any.
///
/// Gaps are allowed: with flags `[true, true, false, true, false, false,
/// false]` the result is `MeetingHeld` (index 3).
pub fn deepest_stage<T: Seekable>(item: &T) -> Option<Milestone> {
    Milestone::ALL
        .into_iter()
        .rev()
        .find(|milestone| milestone.is_complete(item))
}

/// State of one milestone on one record, for rendering a progress tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageProgress {
    pub milestone: Milestone,
    pub completed: bool,
    pub completed_at: Option<Timestamp>,
}

/// Every milestone of `item` in funnel order.
pub fn pipeline_progress<T: Seekable>(item: &T) -> Vec<StageProgress> {
    Milestone::ALL
        .into_iter()
        .map(|milestone| StageProgress {
            milestone,
            completed: milestone.is_complete(item),
            completed_at: item
                .field_value(FieldKey::MilestoneAt(milestone))
                .as_timestamp(),
        })
        .collect()
}
