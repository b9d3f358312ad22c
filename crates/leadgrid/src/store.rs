//! Lead store trait and its file and in-memory backends.
//!
//! The engine never talks to storage. Everything that reads or writes leads
//! goes through [`LeadStore`], a narrow contract: fetch by criteria, get one,
//! patch by id, create, soft-delete.
//!
//! # Example
//!
//! ```rust
//! use leadgrid::store::{FetchCriteria, LeadStore, MemoryStore};
//! use leadgrid_seeker::{FieldKey, LeadPatch};
//!
//! let store = MemoryStore::new();
//! let patch = LeadPatch::new().assign(FieldKey::Email, "ada@acme.test")?;
//! let lead = store.create(&patch)?;
//!
//! store.soft_delete(&lead.id)?;
//! assert!(store.fetch(&FetchCriteria::new())?.is_empty());
//! assert_eq!(store.fetch(&FetchCriteria::new().include_deleted())?.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use leadgrid_seeker::{Clock, Lead, LeadPatch, SeekerError};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur in a lead store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lead '{0}' not found")]
    NotFound(String),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed lead data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid lead: {0}")]
    Invalid(String),

    #[error(transparent)]
    Patch(#[from] SeekerError),

    /// The store's lock was poisoned by a panicking writer.
    #[error("lead store is unavailable")]
    Unavailable,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Constraints for [`LeadStore::fetch`].
///
/// Soft-deleted leads are excluded unless asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchCriteria {
    /// Include soft-deleted leads.
    pub include_deleted: bool,
    /// Only leads whose coarse `stage` equals this value.
    pub stage: Option<String>,
    /// Maximum number of leads to return.
    pub limit: Option<usize>,
}

impl FetchCriteria {
    /// Creates criteria that fetch every live lead.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    pub fn stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns `true` if `lead` satisfies the criteria, limit aside.
    pub fn admits(&self, lead: &Lead) -> bool {
        (self.include_deleted || !lead.is_deleted())
            && self
                .stage
                .as_deref()
                .map_or(true, |stage| lead.stage.as_deref() == Some(stage))
    }

    fn select(&self, leads: &[Lead]) -> Vec<Lead> {
        leads
            .iter()
            .filter(|lead| self.admits(lead))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Storage backend for leads.
///
/// # Design Notes
///
/// - **Sync-only**: callers that need async wrap the store themselves.
/// - **Bookkeeping**: backends stamp `updated_at` on every write, `id` and
///   `created_at` on create and `deleted_at` on soft delete. Callers never
///   need to set them.
/// - **Soft delete**: deleted leads stay in storage. They are invisible to
///   [`get`](Self::get) and [`update`](Self::update) and hidden from
///   [`fetch`](Self::fetch) by default.
pub trait LeadStore: Send + Sync {
    /// Returns the leads matching `criteria`, in storage order.
    fn fetch(&self, criteria: &FetchCriteria) -> Result<Vec<Lead>>;

    /// Retrieves a live lead by id, returning `None` if there is none.
    fn get(&self, id: &str) -> Result<Option<Lead>>;

    /// Retrieves a live lead by id, returning an error if there is none.
    fn resolve(&self, id: &str) -> Result<Lead> {
        self.get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Applies `patch` to the lead `id` and returns the stored result.
    fn update(&self, id: &str, patch: &LeadPatch) -> Result<Lead>;

    /// Creates a lead from `patch`. `email` is required.
    fn create(&self, patch: &LeadPatch) -> Result<Lead>;

    /// Marks the lead `id` as deleted.
    fn soft_delete(&self, id: &str) -> Result<()>;
}

// ============================================================================
// Shared row operations
// ============================================================================

fn live_mut<'a>(leads: &'a mut [Lead], id: &str) -> Result<&'a mut Lead> {
    leads
        .iter_mut()
        .find(|lead| lead.id == id && !lead.is_deleted())
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

/// `patch` with `updated_at` set to now. The stamp wins over any value the
/// caller supplied.
fn stamp(patch: &LeadPatch, clock: &Clock) -> LeadPatch {
    let now = serde_json::Value::String(clock.now_rfc3339());
    patch
        .clone()
        .merge(LeadPatch::new().with_raw("updated_at", now))
}

fn update_row(leads: &mut [Lead], id: &str, patch: &LeadPatch, clock: &Clock) -> Result<Lead> {
    let lead = live_mut(leads, id)?;
    let mut updated = lead.apply_patch(&stamp(patch, clock))?;
    // ids are immutable once assigned
    updated.id = id.to_string();
    *lead = updated.clone();
    Ok(updated)
}

fn create_row(leads: &mut Vec<Lead>, patch: &LeadPatch, clock: &Clock) -> Result<Lead> {
    let now = serde_json::Value::String(clock.now_rfc3339());
    let mut lead =
        Lead::from_patch(&stamp(patch, clock).merge(LeadPatch::new().with_raw("created_at", now)))?;
    if lead.email.trim().is_empty() {
        return Err(StoreError::Invalid("email is required".into()));
    }
    if lead.id.is_empty() {
        lead.id = uuid::Uuid::new_v4().to_string();
    } else if leads.iter().any(|existing| existing.id == lead.id) {
        return Err(StoreError::Invalid(format!("id '{}' already exists", lead.id)));
    }
    lead.deleted_at = None;
    leads.push(lead.clone());
    Ok(lead)
}

fn soft_delete_row(leads: &mut [Lead], id: &str, clock: &Clock) -> Result<()> {
    let lead = live_mut(leads, id)?;
    let now = clock.now_rfc3339();
    lead.deleted_at = Some(now.clone());
    lead.updated_at = Some(now);
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

/// A store that keeps leads in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    leads: RwLock<Vec<Lead>>,
    clock: Option<Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `leads`, stored as given.
    pub fn with_leads(leads: Vec<Lead>) -> Self {
        MemoryStore {
            leads: RwLock::new(leads),
            clock: None,
        }
    }

    /// Stamps writes with a fixed clock instead of the system time.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    fn now(&self) -> Clock {
        self.clock.unwrap_or_else(Clock::system)
    }
}

impl LeadStore for MemoryStore {
    fn fetch(&self, criteria: &FetchCriteria) -> Result<Vec<Lead>> {
        let leads = self.leads.read().map_err(|_| StoreError::Unavailable)?;
        Ok(criteria.select(&leads))
    }

    fn get(&self, id: &str) -> Result<Option<Lead>> {
        let leads = self.leads.read().map_err(|_| StoreError::Unavailable)?;
        Ok(leads
            .iter()
            .find(|lead| lead.id == id && !lead.is_deleted())
            .cloned())
    }

    fn update(&self, id: &str, patch: &LeadPatch) -> Result<Lead> {
        let mut leads = self.leads.write().map_err(|_| StoreError::Unavailable)?;
        update_row(&mut leads, id, patch, &self.now())
    }

    fn create(&self, patch: &LeadPatch) -> Result<Lead> {
        let mut leads = self.leads.write().map_err(|_| StoreError::Unavailable)?;
        create_row(&mut leads, patch, &self.now())
    }

    fn soft_delete(&self, id: &str) -> Result<()> {
        let mut leads = self.leads.write().map_err(|_| StoreError::Unavailable)?;
        soft_delete_row(&mut leads, id, &self.now())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// A store backed by a JSON file holding an array of leads.
///
/// The file is read on every call and rewritten on every write, so several
/// processes see each other's changes. A missing file reads as an empty
/// store and is created on the first write.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    clock: Option<Clock>,
    // Serializes read-modify-write cycles within this process.
    write_lock: RwLock<()>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        JsonFileStore {
            path: path.into(),
            clock: None,
            write_lock: RwLock::new(()),
        }
    }

    /// Stamps writes with a fixed clock instead of the system time.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn now(&self) -> Clock {
        self.clock.unwrap_or_else(Clock::system)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Reads every stored lead, deleted ones included.
    pub fn load(&self) -> Result<Vec<Lead>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "lead file missing, starting empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(self.io_error(err)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let leads: Vec<Lead> = serde_json::from_str(&raw)?;
        debug!(path = %self.path.display(), count = leads.len(), "loaded leads");
        Ok(leads)
    }

    fn save(&self, leads: &[Lead]) -> Result<()> {
        let json = serde_json::to_string_pretty(leads)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json + "\n").map_err(|err| self.io_error(err))?;
        fs::rename(&tmp, &self.path).map_err(|err| self.io_error(err))?;
        debug!(path = %self.path.display(), count = leads.len(), "saved leads");
        Ok(())
    }

    fn modify<T>(&self, op: impl FnOnce(&mut Vec<Lead>, &Clock) -> Result<T>) -> Result<T> {
        let _guard = self.write_lock.write().map_err(|_| StoreError::Unavailable)?;
        let mut leads = self.load()?;
        let out = op(&mut leads, &self.now())?;
        self.save(&leads)?;
        Ok(out)
    }
}

impl LeadStore for JsonFileStore {
    fn fetch(&self, criteria: &FetchCriteria) -> Result<Vec<Lead>> {
        Ok(criteria.select(&self.load()?))
    }

    fn get(&self, id: &str) -> Result<Option<Lead>> {
        Ok(self
            .load()?
            .into_iter()
            .find(|lead| lead.id == id && !lead.is_deleted()))
    }

    fn update(&self, id: &str, patch: &LeadPatch) -> Result<Lead> {
        let lead = self.modify(|leads, clock| update_row(leads, id, patch, clock))?;
        info!(id, fields = patch.len(), "updated lead");
        Ok(lead)
    }

    fn create(&self, patch: &LeadPatch) -> Result<Lead> {
        let lead = self.modify(|leads, clock| create_row(leads, patch, clock))?;
        info!(id = %lead.id, "created lead");
        Ok(lead)
    }

    fn soft_delete(&self, id: &str) -> Result<()> {
        self.modify(|leads, clock| soft_delete_row(leads, id, clock))?;
        info!(id, "soft-deleted lead");
        Ok(())
    }
}
