//! Property-based tests for seeker using proptest.

use proptest::prelude::*;
use leadgrid_seeker::{
    deepest_stage, Clock, Dir, FieldKey, FilterSet, Lead, Milestone, Operator, SortRules,
    ViewState,
};

// ============================================================================
// Test helpers
// ============================================================================

const STAGES: [&str; 4] = ["new", "contacted", "qualified", "won"];

fn lead_strategy() -> impl Strategy<Value = Lead> {
    (
        "[a-z]{1,8}",
        prop::option::of("[A-Za-z]{0,10}"),
        prop::sample::select(STAGES.to_vec()),
        prop::option::of(0i64..100),
        prop::option::of(0i64..1_000),
        prop::array::uniform7(any::<bool>()),
    )
        .prop_map(|(id, company, stage, score, day, flags)| {
            let mut lead = Lead::new(id.clone(), format!("{id}@example.test"));
            lead.company = company;
            lead.stage = Some(stage.to_string());
            lead.lead_score = score;
            lead.updated_at = day.map(|d| {
                // days after 2022-01-01
                let ts = 1_640_995_200_000 + d * 86_400_000;
                leadgrid_seeker::Timestamp(ts).to_rfc3339()
            });
            for (milestone, done) in Milestone::ALL.into_iter().zip(flags) {
                lead = set_flag(lead, milestone, done);
            }
            lead
        })
}

fn set_flag(mut lead: Lead, milestone: Milestone, done: bool) -> Lead {
    match milestone {
        Milestone::EmailSent => lead.email_sent = done,
        Milestone::Replied => lead.replied = done,
        Milestone::MeetingBooked => lead.meeting_booked = done,
        Milestone::MeetingHeld => lead.meeting_held = done,
        Milestone::ProposalSent => lead.proposal_sent = done,
        Milestone::Negotiating => lead.negotiating = done,
        Milestone::ClosedWon => lead.closed_won = done,
    }
    lead
}

fn id_multiset(items: &[&Lead]) -> Vec<String> {
    let mut ids: Vec<String> = items.iter().map(|l| l.id.clone()).collect();
    ids.sort();
    ids
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Filtering never returns more records than it was given.
    #[test]
    fn filter_never_grows_collection(
        leads in prop::collection::vec(lead_strategy(), 0..60),
        threshold in 0i64..100,
    ) {
        let filters = FilterSet::new()
            .and(FieldKey::LeadScore, Operator::GreaterThan, threshold.to_string());
        let results = filters.apply(&leads, &Clock::system());
        prop_assert!(results.len() <= leads.len());
    }

    /// Filters and search only remove records; they never reorder survivors
    /// relative to each other before sorting.
    #[test]
    fn filter_preserves_relative_order(
        leads in prop::collection::vec(lead_strategy(), 0..60),
        stage in prop::sample::select(STAGES.to_vec()),
    ) {
        let filters = FilterSet::new().and(FieldKey::Stage, Operator::IsNot, stage);
        let results = filters.apply(&leads, &Clock::system());
        let expected: Vec<&Lead> = leads
            .iter()
            .filter(|l| l.stage.as_deref() != Some(stage))
            .collect();
        prop_assert_eq!(results, expected);
    }

    /// A configuration with nothing filled in excludes nothing.
    #[test]
    fn empty_configuration_keeps_everything(
        leads in prop::collection::vec(lead_strategy(), 0..60),
    ) {
        let view = ViewState::new()
            .with_search("   ")
            .with_filters(|f| f.and(FieldKey::Company, Operator::Contains, ""));
        let results = view.apply(&leads, &Clock::system());
        prop_assert_eq!(results.len(), leads.len());
    }

    /// Sorting is a permutation of its input.
    #[test]
    fn sort_is_permutation(
        leads in prop::collection::vec(lead_strategy(), 0..60),
        desc in any::<bool>(),
    ) {
        let dir = if desc { Dir::Desc } else { Dir::Asc };
        let sorts = SortRules::new()
            .by(FieldKey::Stage, dir)
            .by(FieldKey::LeadScore, Dir::Asc);
        let mut refs: Vec<&Lead> = leads.iter().collect();
        sorts.sort(&mut refs);

        let original: Vec<&Lead> = leads.iter().collect();
        prop_assert_eq!(id_multiset(&refs), id_multiset(&original));
    }

    /// Sorted output is ordered by the primary key.
    #[test]
    fn sort_orders_by_primary_key(
        leads in prop::collection::vec(lead_strategy(), 0..60),
    ) {
        let mut refs: Vec<&Lead> = leads.iter().collect();
        SortRules::new().by(FieldKey::LeadScore, Dir::Desc).sort(&mut refs);
        for pair in refs.windows(2) {
            let a = pair[0].lead_score.unwrap_or(0);
            let b = pair[1].lead_score.unwrap_or(0);
            prop_assert!(a >= b);
        }
    }

    /// Default order is non-increasing in update time, missing times last.
    #[test]
    fn default_order_is_recency(
        leads in prop::collection::vec(lead_strategy(), 0..60),
    ) {
        let results = ViewState::new().apply(&leads, &Clock::system());
        let millis = |l: &Lead| {
            l.updated_at
                .as_deref()
                .and_then(leadgrid_seeker::Timestamp::parse)
                .map_or(0, |t| t.as_millis())
        };
        for pair in results.windows(2) {
            prop_assert!(millis(pair[0]) >= millis(pair[1]));
        }
    }

    /// The deepest stage is set, and nothing deeper is.
    #[test]
    fn deepest_stage_is_rightmost(lead in lead_strategy()) {
        match deepest_stage(&lead) {
            Some(deepest) => {
                prop_assert!(lead.milestone(deepest));
                for later in Milestone::ALL.into_iter().filter(|m| *m > deepest) {
                    prop_assert!(!lead.milestone(later));
                }
            }
            None => {
                for m in Milestone::ALL {
                    prop_assert!(!lead.milestone(m));
                }
            }
        }
    }

    /// Toggling a milestone twice restores the flag.
    #[test]
    fn toggle_twice_restores_flag(
        lead in lead_strategy(),
        index in 0usize..7,
    ) {
        let clock = Clock::system();
        let milestone = Milestone::ALL[index];
        let once = lead.apply_patch(&milestone.toggle_patch(&lead, &clock)).unwrap();
        let twice = once.apply_patch(&milestone.toggle_patch(&once, &clock)).unwrap();
        prop_assert_eq!(once.milestone(milestone), !lead.milestone(milestone));
        prop_assert_eq!(twice.milestone(milestone), lead.milestone(milestone));
        prop_assert_eq!(twice.milestone_at(milestone).is_some(), twice.milestone(milestone));
    }

    /// An OR-group keeps exactly the records matching one of its members.
    #[test]
    fn group_is_disjunction(
        leads in prop::collection::vec(lead_strategy(), 0..60),
        a in prop::sample::select(STAGES.to_vec()),
        b in prop::sample::select(STAGES.to_vec()),
    ) {
        let filters = FilterSet::new()
            .add_to_group("g", FieldKey::Stage, Operator::Is, a)
            .add_to_group("g", FieldKey::Stage, Operator::Is, b);
        let clock = Clock::system();
        for lead in &leads {
            let stage = lead.stage.as_deref();
            let expected = stage == Some(a) || stage == Some(b);
            prop_assert_eq!(filters.matches(lead, &clock), expected);
        }
    }
}
