//! Pending-edit tracking against the last-persisted baseline.
//!
//! The tracker holds, per row id, the action and notes last known to match
//! the remote store (the baseline) and any unsaved edits that differ from it.
//!
//! Invariant: a pending field is stored only while it differs from the
//! baseline. Setting a field back to its baseline value drops the field, and
//! an id with no pending fields is not present at all.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ReviewError;
use crate::model::{Action, PartialRowUpdate, RowId, TagMapping};

/// Editable values as last persisted remotely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Baseline {
    pub action: Action,
    /// Absent notes are normalized to `""`.
    pub notes: String,
}

impl Baseline {
    #[must_use]
    pub fn of(row: &TagMapping) -> Self {
        Self {
            action: row.action,
            notes: row.notes_text().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditTracker {
    baseline: BTreeMap<RowId, Baseline>,
    pending_actions: BTreeMap<RowId, Action>,
    pending_notes: BTreeMap<RowId, String>,
}

impl EditTracker {
    /// Establish the baseline from freshly loaded rows. No edits are pending.
    #[must_use]
    pub fn from_rows(rows: &[TagMapping]) -> Self {
        Self {
            baseline: rows.iter().map(|row| (row.id, Baseline::of(row))).collect(),
            pending_actions: BTreeMap::new(),
            pending_notes: BTreeMap::new(),
        }
    }

    /// Record the operator's action choice for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::RowNotFound`] if `id` has no baseline.
    pub fn set_action(&mut self, id: RowId, value: Action) -> Result<(), ReviewError> {
        let baseline = self.baseline.get(&id).ok_or(ReviewError::RowNotFound(id))?;
        if value == baseline.action {
            self.pending_actions.remove(&id);
        } else {
            self.pending_actions.insert(id, value);
        }
        Ok(())
    }

    /// Record the operator's notes for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::RowNotFound`] if `id` has no baseline.
    pub fn set_notes(&mut self, id: RowId, value: impl Into<String>) -> Result<(), ReviewError> {
        let value = value.into();
        let baseline = self.baseline.get(&id).ok_or(ReviewError::RowNotFound(id))?;
        if value == baseline.notes {
            self.pending_notes.remove(&id);
        } else {
            self.pending_notes.insert(id, value);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_dirty(&self, id: RowId) -> bool {
        self.pending_actions.contains_key(&id) || self.pending_notes.contains_key(&id)
    }

    /// Ids with at least one pending field.
    #[must_use]
    pub fn pending_ids(&self) -> BTreeSet<RowId> {
        self.pending_actions
            .keys()
            .chain(self.pending_notes.keys())
            .copied()
            .collect()
    }

    /// Number of dirty rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending_ids().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending_actions.is_empty() && self.pending_notes.is_empty()
    }

    #[must_use]
    pub fn baseline(&self, id: RowId) -> Option<&Baseline> {
        self.baseline.get(&id)
    }

    #[must_use]
    pub fn pending_action(&self, id: RowId) -> Option<Action> {
        self.pending_actions.get(&id).copied()
    }

    #[must_use]
    pub fn pending_notes(&self, id: RowId) -> Option<&str> {
        self.pending_notes.get(&id).map(String::as_str)
    }

    /// Update body for `id` containing only its pending fields.
    #[must_use]
    pub fn pending_update(&self, id: RowId) -> PartialRowUpdate {
        PartialRowUpdate {
            action: self.pending_action(id),
            notes: self.pending_notes.get(&id).cloned(),
        }
    }

    /// Move the pending values of `id` into its baseline.
    pub fn promote(&mut self, id: RowId) {
        let action = self.pending_actions.remove(&id);
        let notes = self.pending_notes.remove(&id);
        let Some(baseline) = self.baseline.get_mut(&id) else {
            return;
        };
        if let Some(action) = action {
            baseline.action = action;
        }
        if let Some(notes) = notes {
            baseline.notes = notes;
        }
    }

    /// Promote every pending value; the tracker is empty afterwards.
    pub fn promote_all(&mut self) {
        for id in self.pending_ids() {
            self.promote(id);
        }
    }
}
