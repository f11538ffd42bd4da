//! Review session state container.
//!
//! All review state (loaded rows, the edit tracker, load phase, and the
//! last toast) lives in [`ReviewSession`] and changes only through
//! [`ReviewSession::apply`], one [`ReviewEvent`] at a time.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::ReviewError;
use crate::model::{Action, RowId, RowOrder, TagMapping};
use crate::reconcile::{Reconciler, SaveOutcome};
use crate::store::RemoteStore;
use crate::tracker::EditTracker;

/// Whether rows are available for review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    LoadFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

/// Transient notification raised by a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub raised_at: Instant,
}

impl Toast {
    fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            raised_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.raised_at.elapsed() >= ttl
    }
}

/// Operator or lifecycle event fed into [`ReviewSession::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewEvent {
    Reload,
    SetAction { id: RowId, action: Action },
    SetNotes { id: RowId, notes: String },
    Save,
    DismissToast,
}

/// Aggregate counts shown above the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReviewStats {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub unset: usize,
    pub pending: usize,
}

/// A row together with its derived dirty flag.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    pub row: &'a TagMapping,
    pub has_changes: bool,
}

#[derive(Debug)]
pub struct ReviewSession {
    rows: Vec<TagMapping>,
    tracker: EditTracker,
    phase: Phase,
    toast: Option<Toast>,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            tracker: EditTracker::default(),
            phase: Phase::Loading,
            toast: None,
        }
    }

    /// Handle one event.
    ///
    /// `Reload` and `Save` reach the store; every other event is local.
    ///
    /// # Errors
    ///
    /// - [`ReviewError::Load`] when a reload fails (the session moves to
    ///   [`Phase::LoadFailed`]).
    /// - [`ReviewError::Save`] when any update failed (a toast is raised and
    ///   pending edits are kept).
    /// - [`ReviewError::RowNotFound`] for edits to rows that are not loaded.
    pub fn apply<S: RemoteStore + ?Sized>(
        &mut self,
        event: ReviewEvent,
        store: &S,
        reconciler: &Reconciler,
    ) -> Result<(), ReviewError> {
        match event {
            ReviewEvent::Reload => self.reload(store),
            ReviewEvent::SetAction { id, action } => self.set_action(id, action),
            ReviewEvent::SetNotes { id, notes } => self.set_notes(id, notes),
            ReviewEvent::Save => self.save(store, reconciler).into_result().map(|_| ()),
            ReviewEvent::DismissToast => {
                self.toast = None;
                Ok(())
            }
        }
    }

    fn reload<S: RemoteStore + ?Sized>(&mut self, store: &S) -> Result<(), ReviewError> {
        self.phase = Phase::Loading;
        match store.list_rows(RowOrder::FREQUENCY_DESC) {
            Ok(rows) => {
                tracing::info!(rows = rows.len(), "loaded rows");
                self.tracker = EditTracker::from_rows(&rows);
                self.rows = rows;
                self.toast = None;
                self.phase = Phase::Ready;
                Ok(())
            }
            Err(err) => {
                let err = ReviewError::Load(err);
                tracing::error!("{err}");
                self.rows.clear();
                self.tracker = EditTracker::default();
                self.phase = Phase::LoadFailed(err.to_string());
                Err(err)
            }
        }
    }

    fn row_mut(&mut self, id: RowId) -> Result<&mut TagMapping, ReviewError> {
        self.rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(ReviewError::RowNotFound(id))
    }

    fn set_action(&mut self, id: RowId, action: Action) -> Result<(), ReviewError> {
        self.tracker.set_action(id, action)?;
        self.row_mut(id)?.action = action;
        Ok(())
    }

    fn set_notes(&mut self, id: RowId, notes: String) -> Result<(), ReviewError> {
        self.tracker.set_notes(id, notes.clone())?;
        self.row_mut(id)?.notes = if notes.is_empty() { None } else { Some(notes) };
        Ok(())
    }

    /// Run a save and raise the matching toast.
    pub fn save<S: RemoteStore + ?Sized>(&mut self, store: &S, reconciler: &Reconciler) -> SaveOutcome {
        let outcome = reconciler.save(&mut self.tracker, store);
        match &outcome {
            SaveOutcome::NothingToSave => {}
            SaveOutcome::Saved { count } => {
                self.toast = Some(Toast::new(
                    ToastKind::Success,
                    format!("{count} change(s) saved successfully!"),
                ));
            }
            SaveOutcome::Failed { failures, .. } => {
                self.toast = Some(Toast::new(
                    ToastKind::Error,
                    format!("Error saving {} record(s)", failures.len()),
                ));
            }
        }
        outcome
    }

    #[must_use]
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    #[must_use]
    pub fn rows(&self) -> &[TagMapping] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, id: RowId) -> Option<&TagMapping> {
        self.rows.iter().find(|row| row.id == id)
    }

    #[must_use]
    pub const fn tracker(&self) -> &EditTracker {
        &self.tracker
    }

    #[must_use]
    pub const fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    #[must_use]
    pub fn has_changes(&self, id: RowId) -> bool {
        self.tracker.is_dirty(id)
    }

    pub fn row_views(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(|row| RowView {
            row,
            has_changes: self.tracker.is_dirty(row.id),
        })
    }

    #[must_use]
    pub fn stats(&self) -> ReviewStats {
        let mut stats = ReviewStats {
            total: self.rows.len(),
            pending: self.tracker.len(),
            ..ReviewStats::default()
        };
        for row in &self.rows {
            match row.action {
                Action::Approved => stats.approved += 1,
                Action::Reject => stats.rejected += 1,
                Action::Unset => stats.unset += 1,
            }
        }
        stats
    }
}
