//! Caption Timeline Store
//!
//! Owns the committed caption entries for one editing session.
//!
//! Entries are kept sorted by start time inside an `Arc<Vec<_>>`. Every
//! mutation goes through `Arc::make_mut`, so a snapshot handed out earlier
//! keeps seeing the state it was taken from while the store moves on.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{CaptionDraft, CaptionEntry};
use crate::core::{CaptionId, CoreError, CoreResult};

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable, start-ordered view of the timeline at one instant
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimelineSnapshot {
    entries: Arc<Vec<CaptionEntry>>,
}

impl TimelineSnapshot {
    /// Entries in ascending start order
    pub fn entries(&self) -> &[CaptionEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CaptionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::ops::Deref for TimelineSnapshot {
    type Target = [CaptionEntry];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a TimelineSnapshot {
    type Item = &'a CaptionEntry;
    type IntoIter = std::slice::Iter<'a, CaptionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// =============================================================================
// Timeline Store
// =============================================================================

/// Ordered, non-overlapping set of caption entries
#[derive(Clone, Debug, Default)]
pub struct TimelineStore {
    entries: Arc<Vec<CaptionEntry>>,
    /// Entry currently open in the edit form, if any
    editing: Option<CaptionId>,
}

impl TimelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store by inserting each draft in order.
    ///
    /// Stops at the first draft that fails validation.
    pub fn from_drafts<I>(drafts: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = CaptionDraft>,
    {
        let mut store = Self::new();
        for draft in drafts {
            store.insert(draft)?;
        }
        Ok(store)
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Checks a draft against the store without changing anything.
    ///
    /// `excluding` names the entry being replaced, which is left out of the
    /// overlap check so an entry can be edited in place.
    pub fn validate(&self, draft: &CaptionDraft, excluding: Option<&str>) -> CoreResult<()> {
        draft.check_shape()?;

        let conflict = self
            .entries
            .iter()
            .filter(|e| excluding != Some(e.id.as_str()))
            .find(|e| e.overlaps_range(draft.start_sec, draft.end_sec));

        match conflict {
            Some(existing) => Err(CoreError::Overlap {
                existing_id: existing.id.clone(),
                start: draft.start_sec,
                end: draft.end_sec,
            }),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Validates and adds a new caption, returning it with its assigned id
    pub fn insert(&mut self, draft: CaptionDraft) -> CoreResult<CaptionEntry> {
        self.validate(&draft, None)?;

        let entry = CaptionEntry::from_draft(ulid::Ulid::new().to_string(), draft);
        self.place(entry.clone());

        debug!(
            "Inserted caption {} ({:.3}~{:.3}s)",
            entry.id, entry.start_sec, entry.end_sec
        );
        Ok(entry)
    }

    /// Replaces an existing caption with the full draft, keeping its id
    pub fn update(&mut self, id: &str, draft: CaptionDraft) -> CoreResult<CaptionEntry> {
        let pos = self
            .position(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        self.validate(&draft, Some(id))?;

        let entries = Arc::make_mut(&mut self.entries);
        let previous = entries.remove(pos);
        let entry = CaptionEntry::from_draft(previous.id, draft);
        self.place(entry.clone());

        debug!(
            "Updated caption {} ({:.3}~{:.3}s)",
            entry.id, entry.start_sec, entry.end_sec
        );
        Ok(entry)
    }

    /// Removes a caption.
    ///
    /// A missing id is not an error: the host's view of the list may lag behind
    /// the store, and deleting something already gone changes nothing.
    pub fn delete(&mut self, id: &str) -> Option<CaptionEntry> {
        let Some(pos) = self.position(id) else {
            debug!("Delete ignored, caption {} not found", id);
            return None;
        };

        let removed = Arc::make_mut(&mut self.entries).remove(pos);
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }

        debug!("Deleted caption {}", removed.id);
        Some(removed)
    }

    /// Removes every caption and closes any open edit
    pub fn clear(&mut self) {
        self.entries = Arc::default();
        self.editing = None;
    }

    fn place(&mut self, entry: CaptionEntry) {
        let entries = Arc::make_mut(&mut self.entries);
        let at = entries.partition_point(|e| e.start_sec <= entry.start_sec);
        entries.insert(at, entry);
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Returns all captions in ascending start order
    pub fn list(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            entries: Arc::clone(&self.entries),
        }
    }

    /// Gets a caption by ID
    pub fn get(&self, id: &str) -> Option<&CaptionEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    // -------------------------------------------------------------------------
    // Edit Session
    // -------------------------------------------------------------------------

    /// Opens an entry for editing and returns a draft prefilled from it
    pub fn begin_edit(&mut self, id: &str) -> CoreResult<CaptionDraft> {
        let draft = self
            .get(id)
            .map(CaptionEntry::to_draft)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        self.editing = Some(id.to_string());
        Ok(draft)
    }

    /// Id of the entry currently open for editing
    pub fn editing(&self) -> Option<&CaptionId> {
        self.editing.as_ref()
    }

    /// Closes the edit form without touching the committed entries
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Saves the form: updates the entry under edit, or inserts a new one.
    ///
    /// The edit stays open when the draft is rejected so the user can fix it.
    pub fn commit(&mut self, draft: CaptionDraft) -> CoreResult<CaptionEntry> {
        let entry = match self.editing.clone() {
            Some(id) => self.update(&id, draft)?,
            None => self.insert(draft)?,
        };
        self.editing = None;
        Ok(entry)
    }
}

// =============================================================================
// Shared Timeline
// =============================================================================

/// A timeline store shared between the editing host and a playback poller
#[derive(Clone, Debug, Default)]
pub struct SharedTimeline {
    inner: Arc<Mutex<TimelineStore>>,
}

impl SharedTimeline {
    pub fn new(store: TimelineStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Takes a consistent snapshot; the lock is held only for an `Arc` clone
    pub fn snapshot(&self) -> TimelineSnapshot {
        self.lock().list()
    }

    /// Runs a mutation (or any read) with exclusive access to the store
    pub fn with<T>(&self, op: impl FnOnce(&mut TimelineStore) -> T) -> T {
        op(&mut self.lock())
    }

    pub fn insert(&self, draft: CaptionDraft) -> CoreResult<CaptionEntry> {
        self.with(|store| store.insert(draft))
    }

    pub fn update(&self, id: &str, draft: CaptionDraft) -> CoreResult<CaptionEntry> {
        self.with(|store| store.update(id, draft))
    }

    pub fn delete(&self, id: &str) -> Option<CaptionEntry> {
        self.with(|store| store.delete(id))
    }

    fn lock(&self) -> MutexGuard<'_, TimelineStore> {
        // Mutations swap whole Arcs, so a panicked holder cannot leave a
        // half-written store behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<TimelineStore> for SharedTimeline {
    fn from(store: TimelineStore) -> Self {
        Self::new(store)
    }
}

// =============================================================================
// Tests
// =============================================================================
