//! Optimistic board mutations against a store that refuses writes.

use std::sync::atomic::{AtomicBool, Ordering};

use leadgrid::store::Result as StoreResult;
use leadgrid::{Board, BoardError, FetchCriteria, LeadStore, MemoryStore, StoreError};
use leadgrid_seeker::{FieldKey, Lead, LeadPatch, Milestone, ViewState};

/// Wraps a [`MemoryStore`] and fails every write while `offline` is set.
struct FlakyStore {
    inner: MemoryStore,
    offline: AtomicBool,
}

impl FlakyStore {
    fn new(leads: Vec<Lead>) -> Self {
        FlakyStore {
            inner: MemoryStore::with_leads(leads),
            offline: AtomicBool::new(false),
        }
    }

    fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Invalid("backend unreachable".into()))
        } else {
            Ok(())
        }
    }
}

impl LeadStore for FlakyStore {
    fn fetch(&self, criteria: &FetchCriteria) -> StoreResult<Vec<Lead>> {
        self.inner.fetch(criteria)
    }

    fn get(&self, id: &str) -> StoreResult<Option<Lead>> {
        self.inner.get(id)
    }

    fn update(&self, id: &str, patch: &LeadPatch) -> StoreResult<Lead> {
        self.check()?;
        self.inner.update(id, patch)
    }

    fn create(&self, patch: &LeadPatch) -> StoreResult<Lead> {
        self.check()?;
        self.inner.create(patch)
    }

    fn soft_delete(&self, id: &str) -> StoreResult<()> {
        self.check()?;
        self.inner.soft_delete(id)
    }
}

fn offline_board() -> Board<FlakyStore> {
    let leads = vec![
        Lead {
            company: Some("Acme".into()),
            ..Lead::new("a", "a@acme.test")
        },
        Lead::new("b", "b@example.test"),
        Lead::new("c", "c@example.test"),
    ];
    let board = Board::load(FlakyStore::new(leads), FetchCriteria::new()).unwrap();
    board.store().go_offline();
    board
}

#[test]
fn failed_update_restores_previous_copy() {
    let mut board = offline_board();
    let before = board.leads().to_vec();

    let patch = LeadPatch::new().assign(FieldKey::Company, "Initech").unwrap();
    let err = board.update("a", &patch).unwrap_err();

    assert!(matches!(err, BoardError::Store(_)));
    assert!(err.to_string().ends_with("(change reverted)"));
    assert_eq!(board.leads(), before.as_slice());
}

#[test]
fn failed_milestone_toggle_is_reverted() {
    let mut board = offline_board();
    assert!(board.toggle_milestone("b", Milestone::MeetingBooked).is_err());

    let lead = board.get("b").unwrap();
    assert!(!lead.meeting_booked);
    assert_eq!(lead.meeting_booked_at, None);
    let rows = board.rows(&ViewState::new());
    assert!(rows.iter().all(|row| row.deepest_stage.is_none()));
}

#[test]
fn failed_delete_puts_lead_back_in_place() {
    let mut board = offline_board();
    assert!(board.soft_delete("b").is_err());

    let ids: Vec<&str> = board.leads().iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[test]
fn failed_create_adds_nothing() {
    let mut board = offline_board();
    let patch = LeadPatch::new()
        .assign(FieldKey::Email, "new@example.test")
        .unwrap();
    assert!(board.create(&patch).is_err());
    assert_eq!(board.leads().len(), 3);
}

#[test]
fn store_keeps_its_state_after_failure() {
    let mut board = offline_board();
    let patch = LeadPatch::new().assign(FieldKey::Stage, "won").unwrap();
    let _ = board.update("a", &patch);

    board.refresh().unwrap();
    assert_eq!(board.get("a").unwrap().stage, None);
}
