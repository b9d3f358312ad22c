//! The lead board: a fetched snapshot plus optimistic mutations.
//!
//! A [`Board`] holds the leads currently on screen. Mutations are applied to
//! the snapshot first and then pushed to the store; if the store rejects
//! them, the snapshot is restored to exactly what it was before, so the user
//! keeps seeing the last known-good state.

use leadgrid_seeker::{Clock, Lead, LeadPatch, Milestone, SeekerError, ViewRow, ViewState};
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::{FetchCriteria, LeadStore, StoreError};

/// Errors from board mutations.
#[derive(Debug, Error)]
pub enum BoardError {
    /// The lead is not on the board.
    #[error("lead '{0}' is not on the board")]
    NotOnBoard(String),

    /// The patch could not be applied locally; nothing was sent.
    #[error(transparent)]
    Patch(#[from] SeekerError),

    /// The store rejected the change; the board was reverted.
    #[error("{0} (change reverted)")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, BoardError>;

/// Snapshot of leads backed by a store.
pub struct Board<S> {
    store: S,
    criteria: FetchCriteria,
    leads: Vec<Lead>,
    clock: Option<Clock>,
}

impl<S: LeadStore> Board<S> {
    /// Fetches the leads matching `criteria` from `store`.
    pub fn load(store: S, criteria: FetchCriteria) -> std::result::Result<Self, StoreError> {
        let leads = store.fetch(&criteria)?;
        debug!(count = leads.len(), "board loaded");
        Ok(Board {
            store,
            criteria,
            leads,
            clock: None,
        })
    }

    /// Uses a fixed clock for milestone timestamps and view evaluation.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn clock(&self) -> Clock {
        self.clock.unwrap_or_else(Clock::system)
    }

    /// Re-fetches the snapshot, discarding local state.
    pub fn refresh(&mut self) -> std::result::Result<(), StoreError> {
        self.leads = self.store.fetch(&self.criteria)?;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The snapshot, in store order.
    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn get(&self, id: &str) -> Option<&Lead> {
        self.leads.iter().find(|lead| lead.id == id)
    }

    /// The snapshot as displayed through `view`.
    pub fn rows(&self, view: &ViewState) -> Vec<ViewRow<'_, Lead>> {
        view.rows(&self.leads, &self.clock())
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.leads
            .iter()
            .position(|lead| lead.id == id)
            .ok_or_else(|| BoardError::NotOnBoard(id.to_string()))
    }

    /// Applies `patch` to lead `id` locally, then in the store.
    ///
    /// On success the local copy is replaced with what the store returned.
    /// On store failure the local copy is restored and the error returned.
    pub fn update(&mut self, id: &str, patch: &LeadPatch) -> Result<&Lead> {
        let index = self.position(id)?;
        let optimistic = self.leads[index].apply_patch(patch)?;
        let previous = std::mem::replace(&mut self.leads[index], optimistic);

        match self.store.update(id, patch) {
            Ok(stored) => {
                self.leads[index] = stored;
                Ok(&self.leads[index])
            }
            Err(err) => {
                warn!(id, error = %err, "update failed, reverting");
                self.leads[index] = previous;
                Err(err.into())
            }
        }
    }

    /// Sets or clears a milestone together with its timestamp.
    pub fn set_milestone(&mut self, id: &str, milestone: Milestone, done: bool) -> Result<&Lead> {
        let patch = milestone.set_patch(done, &self.clock());
        self.update(id, &patch)
    }

    /// Flips a milestone.
    pub fn toggle_milestone(&mut self, id: &str, milestone: Milestone) -> Result<&Lead> {
        let index = self.position(id)?;
        let patch = milestone.toggle_patch(&self.leads[index], &self.clock());
        self.update(id, &patch)
    }

    /// Creates a lead in the store and adds it to the snapshot.
    ///
    /// The store assigns the id, so there is nothing to show before it
    /// answers.
    pub fn create(&mut self, patch: &LeadPatch) -> Result<&Lead> {
        let lead = self.store.create(patch)?;
        self.leads.push(lead);
        let last = self.leads.len() - 1;
        Ok(&self.leads[last])
    }

    /// Removes lead `id` from the board and soft-deletes it in the store.
    /// On failure the lead is put back where it was.
    pub fn soft_delete(&mut self, id: &str) -> Result<()> {
        let index = self.position(id)?;
        let removed = self.leads.remove(index);

        if let Err(err) = self.store.soft_delete(id) {
            warn!(id, error = %err, "delete failed, reverting");
            self.leads.insert(index, removed);
            return Err(err.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use leadgrid_seeker::FieldKey;

    fn board() -> Board<MemoryStore> {
        let leads = vec![
            Lead::new("a", "a@example.test"),
            Lead::new("b", "b@example.test"),
        ];
        Board::load(MemoryStore::with_leads(leads), FetchCriteria::new()).unwrap()
    }

    #[test]
    fn update_replaces_with_stored_copy() {
        let mut board = board();
        let patch = LeadPatch::new().assign(FieldKey::Company, "Acme").unwrap();
        let lead = board.update("a", &patch).unwrap();
        assert_eq!(lead.company.as_deref(), Some("Acme"));
        // the store stamped it
        assert!(lead.updated_at.is_some());
    }

    #[test]
    fn unknown_lead_is_rejected_before_the_store() {
        let mut board = board();
        let err = board.update("zzz", &LeadPatch::new()).unwrap_err();
        assert!(matches!(err, BoardError::NotOnBoard(_)));
    }

    #[test]
    fn bad_patch_leaves_board_untouched() {
        let mut board = board();
        let patch = LeadPatch::new().with_raw("lead_score", serde_json::json!("lots"));
        assert!(matches!(
            board.update("a", &patch),
            Err(BoardError::Patch(_))
        ));
        assert_eq!(board.get("a"), Some(&Lead::new("a", "a@example.test")));
    }

    #[test]
    fn toggle_milestone_round_trip() {
        let mut board = board();
        let lead = board.toggle_milestone("b", Milestone::Replied).unwrap();
        assert!(lead.replied);
        assert!(lead.replied_at.is_some());

        let lead = board.toggle_milestone("b", Milestone::Replied).unwrap();
        assert!(!lead.replied);
        assert_eq!(lead.replied_at, None);
    }

    #[test]
    fn soft_delete_removes_from_board() {
        let mut board = board();
        board.soft_delete("a").unwrap();
        assert!(board.get("a").is_none());
        board.refresh().unwrap();
        assert_eq!(board.leads().len(), 1);
    }
}
